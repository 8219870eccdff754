//! xport CLI
//!
//! Command-line tool for inspecting name directives, resolving export roots
//! and planning scene exports from a host scene snapshot.

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use xport_core::{
    cleanup_orphans, find_orphans, parse_name, plan_export, resolve_export_roots,
    resolve_export_roots_with, track_file_path, validate, CollectionId, ExportFormat, ExportMode,
    ExportScope, ExportSettings, Scene, SkipBehavior, TrackFile,
};
use xport_core::visibility::{collection_passes, exportable_objects, should_export_collection};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xport")]
#[command(about = "Directive-driven scene export planner", long_about = None)]
#[command(version)]
struct Cli {
    /// Log traversal and planning decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the clean name and directives of one or more names
    Parse {
        /// Names to parse
        #[arg(required = true)]
        names: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve export roots of a scene snapshot
    Resolve {
        /// Scene snapshot (JSON)
        #[arg(short, long)]
        scene: PathBuf,

        /// Visibility mode
        #[arg(short, long, value_enum, default_value = "visible")]
        mode: ModeArg,

        /// Start from these collections instead of the scene roots
        #[arg(short, long)]
        root: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check a scene snapshot for conflicting directives
    Validate {
        /// Scene snapshot (JSON)
        #[arg(short, long)]
        scene: PathBuf,

        /// Also check -sk usage
        #[arg(long)]
        strict: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Plan the export jobs for a scene snapshot
    Plan {
        #[command(flatten)]
        target: Target,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        report: ReportArg,
    },

    /// Plan an export and record its files in the track file
    Record {
        #[command(flatten)]
        target: Target,
    },

    /// List exported files that no tracked export wrote
    Orphans {
        /// Track file
        #[arg(short, long)]
        track: PathBuf,
    },

    /// Delete orphaned files and update the track file
    Cleanup {
        /// Track file
        #[arg(short, long)]
        track: PathBuf,

        /// Also remove empty folders inside export directories
        #[arg(long)]
        empty_dirs: bool,
    },

    /// Create a settings file template
    CreateSettings {
        /// Output path for the settings file
        #[arg(short, long)]
        output: PathBuf,

        /// Export directory to put in the template
        #[arg(long)]
        export_path: Option<PathBuf>,
    },
}

/// Scene plus settings, with command-line overrides
#[derive(clap::Args)]
struct Target {
    /// Scene snapshot (JSON)
    #[arg(short, long)]
    scene: PathBuf,

    /// Settings file (JSON); defaults are used when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Export directory (overrides settings)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export scope (overrides settings)
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Export format (overrides settings)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Visibility mode (overrides settings)
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,
}

impl Target {
    fn load(&self) -> xport_core::Result<(Scene, ExportSettings)> {
        let scene = Scene::load(&self.scene)?;
        let mut settings = match &self.settings {
            Some(path) => ExportSettings::load(path)?,
            None => ExportSettings::default(),
        };

        if let Some(output) = &self.output {
            settings.export_path = output.clone();
        }
        if let Some(scope) = self.scope {
            settings.scope = scope.into();
        }
        if let Some(format) = self.format {
            settings.format = format.into();
        }
        if let Some(mode) = self.mode {
            settings.mode = mode.into();
        }
        Ok((scene, settings))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    All,
    Visible,
    Renderable,
}

impl From<ModeArg> for ExportMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::All => ExportMode::All,
            ModeArg::Visible => ExportMode::Visible,
            ModeArg::Renderable => ExportMode::Renderable,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Scene,
    Collection,
    Object,
}

impl From<ScopeArg> for ExportScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Scene => ExportScope::Scene,
            ScopeArg::Collection => ExportScope::Collection,
            ScopeArg::Object => ExportScope::Object,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Glb,
    Gltf,
    Obj,
    Fbx,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Glb => ExportFormat::Glb,
            FormatArg::Gltf => ExportFormat::Gltf,
            FormatArg::Obj => ExportFormat::Obj,
            FormatArg::Fbx => ExportFormat::Fbx,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportArg {
    Text,
    Json,
    Csv,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> xport_core::Result<()> {
    match command {
        Commands::Parse { names, json } => cmd_parse(&names, json),
        Commands::Resolve {
            scene,
            mode,
            root,
            json,
        } => cmd_resolve(&scene, mode.into(), &root, json),
        Commands::Validate { scene, strict, json } => cmd_validate(&scene, strict, json),
        Commands::Plan { target, report } => cmd_plan(&target, report),
        Commands::Record { target } => cmd_record(&target),
        Commands::Orphans { track } => cmd_orphans(&track),
        Commands::Cleanup { track, empty_dirs } => cmd_cleanup(&track, empty_dirs),
        Commands::CreateSettings { output, export_path } => {
            cmd_create_settings(&output, export_path)
        }
    }
}

fn cmd_parse(names: &[String], json: bool) -> xport_core::Result<()> {
    let parsed: Vec<_> = names.iter().map(|n| parse_name(n)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    for (name, p) in names.iter().zip(&parsed) {
        println!("{}", name);
        println!("  clean:      {}", p.clean_name);
        println!(
            "  directory:  {}",
            p.directives.directory.as_deref().unwrap_or("-")
        );
        println!("  separate:   {}", p.directives.separate);
        println!("  exclude:    {}", p.directives.exclude);
        println!("  skip:       {}", p.directives.skip);
        println!("  animation:  {}", p.directives.include_animation);
    }

    Ok(())
}

fn cmd_resolve(
    scene_path: &Path,
    mode: ExportMode,
    roots: &[String],
    json: bool,
) -> xport_core::Result<()> {
    let scene = Scene::load(scene_path)?;

    let groups = if roots.is_empty() {
        resolve_export_roots(&scene, mode)
    } else {
        let ids = roots
            .iter()
            .map(|name| scene.lookup_collection(name))
            .collect::<xport_core::Result<Vec<CollectionId>>>()?;
        resolve_export_roots_with(&scene, &ids, |col| {
            collection_passes(&scene, col, mode)
        })
    };

    let summary = groups.describe(&scene);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Export roots ({}):", summary.len());
    for (group, names) in groups.iter().zip(&summary) {
        let content = if should_export_collection(&scene, group.root, mode) {
            let count = exportable_objects(&scene, group.root, mode).len();
            format!("{} exportable object(s) below", count)
        } else {
            "nothing to export".to_string()
        };
        println!("  {} <- {} ({})", names.root, names.members.join(", "), content);
    }

    Ok(())
}

fn cmd_validate(scene_path: &Path, strict: bool, json: bool) -> xport_core::Result<()> {
    let scene = Scene::load(scene_path)?;
    let behavior = if strict { SkipBehavior::Strict } else { SkipBehavior::Basic };
    let report = validate(&scene, behavior);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_clean() {
        println!("All directives are valid");
    } else {
        for issue in &report.issues {
            println!("{}", issue);
        }
        println!();
        println!(
            "Found {} errors, {} warnings",
            report.errors().count(),
            report.warnings().count()
        );
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_plan(target: &Target, report: ReportArg) -> xport_core::Result<()> {
    let (scene, settings) = target.load()?;
    let plan = plan_export(&scene, &settings)?;

    match report {
        ReportArg::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        ReportArg::Csv => plan.write_csv(io::stdout().lock())?,
        ReportArg::Text => {
            println!(
                "{} export(s) to {} as {}",
                plan.jobs.len(),
                settings.export_path.display(),
                settings.format
            );
            for job in &plan.jobs {
                let anim = if job.include_animation { " [anim]" } else { "" };
                println!("  {}{}", job.output_path.display(), anim);
                println!("    {} object(s): {}", job.objects.len(), job.objects.join(", "));
            }
            if !plan.skipped.is_empty() {
                println!();
                println!("Skipped:");
                for skipped in &plan.skipped {
                    println!("  '{}': {}", skipped.name, skipped.reason);
                }
            }
        }
    }

    Ok(())
}

fn cmd_record(target: &Target) -> xport_core::Result<()> {
    let (scene, settings) = target.load()?;

    if !settings.tracking_enabled {
        println!("Tracking is disabled in settings, nothing recorded");
        return Ok(());
    }

    let plan = plan_export(&scene, &settings)?;
    let files: Vec<PathBuf> = plan.output_files().into_iter().map(Path::to_path_buf).collect();
    let count = files.len();

    let track_path = track_file_path(&settings, scene.blend_file.as_deref());
    let mut track = TrackFile::load(&track_path)?;
    track.record(&settings, scene.blend_file.as_deref(), files);
    track.save(&track_path)?;

    println!("Recorded {} file(s) in {}", count, track_path.display());
    Ok(())
}

fn cmd_orphans(track_path: &Path) -> xport_core::Result<()> {
    let track = TrackFile::load(track_path)?;
    println!(
        "Track file holds {} export record(s) for {} configuration(s)",
        track.total_entries(),
        track.entries.len()
    );
    let orphans = find_orphans(&track);

    if orphans.is_empty() {
        println!("No orphaned files");
        return Ok(());
    }

    println!("Orphaned files ({}):", orphans.len());
    for orphan in &orphans {
        println!("  {}", orphan.display());
    }
    Ok(())
}

fn cmd_cleanup(track_path: &Path, empty_dirs: bool) -> xport_core::Result<()> {
    let mut track = TrackFile::load(track_path)?;
    let report = cleanup_orphans(&mut track, empty_dirs);
    track.save(track_path)?;

    println!("Deleted {} file(s)", report.deleted_files.len());
    for path in &report.deleted_files {
        println!("  - {}", path.display());
    }
    if !report.deleted_dirs.is_empty() {
        println!("Deleted {} folder(s)", report.deleted_dirs.len());
        for path in &report.deleted_dirs {
            println!("  - {}", path.display());
        }
    }
    if !report.errors.is_empty() {
        println!("\nErrors:");
        for (path, err) in &report.errors {
            println!("  {}: {}", path.display(), err);
        }
    }

    Ok(())
}

fn cmd_create_settings(output: &Path, export_path: Option<PathBuf>) -> xport_core::Result<()> {
    let settings = ExportSettings {
        export_path: export_path.unwrap_or_else(|| PathBuf::from("exports")),
        ..ExportSettings::default()
    };

    settings.save(output)?;
    println!("Created settings file: {}", output.display());
    println!();
    println!("Edit the file to configure your export, then run:");
    println!(
        "  xport plan --scene <scene.json> --settings {}",
        output.display()
    );

    Ok(())
}
