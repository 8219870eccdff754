//! Export planning
//!
//! Turns a scene snapshot and export settings into a list of jobs: one
//! output file each, with the objects to select and the exporter options.
//! The host performs the actual writes.

use crate::directive::{parse_name, ParsedName};
use crate::error::{Error, Result};
use crate::resolver::{resolve_export_roots, ExportGroup};
use crate::scene::{CollectionId, ObjectId, Scene};
use crate::settings::ExportSettings;
use crate::validate::{validate, SkipBehavior};
use crate::visibility::{collection_passes, should_export_object, ExportMode};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Binary glTF
    #[default]
    Glb,
    /// glTF with separate `.bin` and textures
    Gltf,
    Obj,
    Fbx,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Gltf => "gltf",
            ExportFormat::Obj => "obj",
            ExportFormat::Fbx => "fbx",
        }
    }

    /// Whether the format can carry animation data
    pub fn supports_animation(self) -> bool {
        !matches!(self, ExportFormat::Obj)
    }

    pub fn as_key(self) -> &'static str {
        match self {
            ExportFormat::Glb => "GLB",
            ExportFormat::Gltf => "GLTF",
            ExportFormat::Obj => "OBJ",
            ExportFormat::Fbx => "FBX",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// How the scene is split into files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    /// One file for the whole scene
    #[default]
    Scene,
    /// One file per export root
    Collection,
    /// One file per object
    Object,
}

impl ExportScope {
    pub fn as_key(self) -> &'static str {
        match self {
            ExportScope::Scene => "SCENE",
            ExportScope::Collection => "COLLECTION",
            ExportScope::Object => "OBJECT",
        }
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    #[default]
    Y,
    Z,
}

/// One output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    /// Clean name the file is named after
    pub name: String,
    pub output_path: PathBuf,
    pub format: ExportFormat,
    /// Raw names of the collections merged into this file (collection scope)
    pub collections: Vec<String>,
    /// Raw names of the objects to select
    pub objects: Vec<String>,
    pub include_animation: bool,
    pub apply_modifiers: bool,
    pub up_axis: UpAxis,
}

/// A job that was dropped while planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedJob {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The group holds nothing exportable
    NoExportableObjects,
    /// Only directives in the name, nothing to name the file after
    EmptyName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoExportableObjects => write!(f, "no exportable objects"),
            SkipReason::EmptyName => write!(f, "name is empty after removing directives"),
        }
    }
}

/// Every job of one export run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportPlan {
    pub jobs: Vec<ExportJob>,
    pub skipped: Vec<SkippedJob>,
}

impl ExportPlan {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Output paths in job order
    pub fn output_files(&self) -> Vec<&Path> {
        self.jobs.iter().map(|j| j.output_path.as_path()).collect()
    }

    /// Distinct directories the jobs write into
    pub fn directories(&self) -> BTreeSet<PathBuf> {
        self.jobs
            .iter()
            .filter_map(|j| j.output_path.parent().map(Path::to_path_buf))
            .collect()
    }

    /// Write one CSV row per job
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["name", "output_path", "objects", "include_animation"])?;
        for job in &self.jobs {
            let row = [
                job.name.clone(),
                job.output_path.display().to_string(),
                job.objects.join(";"),
                job.include_animation.to_string(),
            ];
            csv_writer.write_record(&row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Plan an export run
pub fn plan_export(scene: &Scene, settings: &ExportSettings) -> Result<ExportPlan> {
    if settings.export_path.as_os_str().is_empty() {
        return Err(Error::MissingExportPath);
    }

    let report = validate(scene, settings.skip_behavior);
    if settings.skip_behavior == SkipBehavior::Strict && report.has_errors() {
        return Err(Error::ValidationFailed(report.errors().count()));
    }
    for issue in &report.issues {
        warn!("{}", issue);
    }

    let mut planner = Planner {
        scene,
        settings,
        plan: ExportPlan::default(),
        outputs: HashSet::new(),
    };

    match settings.scope {
        ExportScope::Scene => planner.plan_scene()?,
        ExportScope::Collection => planner.plan_collections()?,
        ExportScope::Object => planner.plan_objects()?,
    }

    info!(
        "planned {} {} export(s), skipped {}",
        planner.plan.jobs.len(),
        settings.scope,
        planner.plan.skipped.len()
    );
    Ok(planner.plan)
}

struct Planner<'a> {
    scene: &'a Scene,
    settings: &'a ExportSettings,
    plan: ExportPlan,
    outputs: HashSet<PathBuf>,
}

impl Planner<'_> {
    fn plan_scene(&mut self) -> Result<()> {
        let parsed = parse_name(&self.settings.scene_export_filename);
        let objects = self.reachable_objects();
        self.push_job(&parsed, parsed.directives.directory.as_deref(), Vec::new(), objects)
    }

    fn plan_collections(&mut self) -> Result<()> {
        let groups = resolve_export_roots(self.scene, self.settings.mode);

        for group in &groups {
            let parsed = parse_name(&self.scene.collection(group.root).name);
            let collections = group
                .members
                .iter()
                .map(|c| self.scene.collection(*c).name.clone())
                .collect();
            let objects = self.direct_objects(group);
            self.push_job(&parsed, parsed.directives.directory.as_deref(), collections, objects)?;
        }
        Ok(())
    }

    fn plan_objects(&mut self) -> Result<()> {
        let scene = self.scene;
        for obj in self.reachable_objects() {
            if !should_export_object(scene, obj, self.settings.mode) {
                continue;
            }

            let parsed = parse_name(&scene.object(obj).name);
            let collection_dir = scene
                .collection_for_object(obj)
                .and_then(|c| parse_name(&scene.collection(c).name).directives.directory);
            let directory = collection_dir.or_else(|| parsed.directives.directory.clone());

            self.push_job(&parsed, directory.as_deref(), Vec::new(), vec![obj])?;
        }
        Ok(())
    }

    /// Objects under collections that survive pruning, then loose objects
    ///
    /// `-sk` does not hide objects here; only `-dk` and the mode check do.
    fn reachable_objects(&self) -> Vec<ObjectId> {
        fn walk(scene: &Scene, col: CollectionId, mode: ExportMode, out: &mut Vec<ObjectId>) {
            let collection = scene.collection(col);
            if parse_name(&collection.name).directives.exclude
                || !collection_passes(scene, col, mode)
            {
                return;
            }
            for obj in &collection.objects {
                if !out.contains(obj) {
                    out.push(*obj);
                }
            }
            for child in &collection.children {
                walk(scene, *child, mode, out);
            }
        }

        let mut out = Vec::new();
        for root in &self.scene.roots {
            walk(self.scene, *root, self.settings.mode, &mut out);
        }
        for obj in &self.scene.loose_objects {
            if !out.contains(obj) {
                out.push(*obj);
            }
        }
        out
    }

    /// Exportable objects linked directly to the group's collections
    fn direct_objects(&self, group: &ExportGroup) -> Vec<ObjectId> {
        group
            .members
            .iter()
            .flat_map(|c| self.scene.collection(*c).objects.iter().copied())
            .collect()
    }

    fn push_job(
        &mut self,
        parsed: &ParsedName,
        directory: Option<&str>,
        collections: Vec<String>,
        objects: Vec<ObjectId>,
    ) -> Result<()> {
        let mode: ExportMode = self.settings.mode;
        let mut seen = HashSet::new();
        let objects: Vec<String> = objects
            .into_iter()
            .filter(|obj| seen.insert(*obj))
            .filter(|obj| should_export_object(self.scene, *obj, mode))
            .map(|obj| self.scene.object(obj).name.clone())
            .collect();

        if parsed.clean_name.is_empty() {
            self.skip(parsed, SkipReason::EmptyName);
            return Ok(());
        }
        if objects.is_empty() {
            self.skip(parsed, SkipReason::NoExportableObjects);
            return Ok(());
        }

        let format = self.settings.format;
        let output_path =
            final_export_path(&self.settings.export_path, directory, &parsed.clean_name, format);
        if !self.outputs.insert(output_path.clone()) {
            return Err(Error::DuplicateOutput(output_path));
        }

        let wants_animation = self.settings.apply_animations || parsed.directives.include_animation;
        self.plan.jobs.push(ExportJob {
            name: parsed.clean_name.clone(),
            output_path,
            format,
            collections,
            objects,
            include_animation: wants_animation && format.supports_animation(),
            apply_modifiers: self.settings.apply_modifiers,
            up_axis: self.settings.up_axis,
        });
        Ok(())
    }

    fn skip(&mut self, parsed: &ParsedName, reason: SkipReason) {
        warn!("skipping '{}': {}", parsed.clean_name, reason);
        self.plan.skipped.push(SkippedJob {
            name: parsed.clean_name.clone(),
            reason,
        });
    }
}

/// Output path for a file named `clean_name` under `base`, redirected into
/// `directory` when given
pub fn final_export_path(
    base: &Path,
    directory: Option<&str>,
    clean_name: &str,
    format: ExportFormat,
) -> PathBuf {
    let mut path = base.to_path_buf();
    if let Some(dir) = directory.and_then(sanitize_directory) {
        path.push(dir);
    }
    path.push(format!("{}.{}", clean_name, format.extension()));
    path
}

/// Reduce a `-dir:` value to a relative path that stays inside the export
/// directory
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_directory(dir: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    let mut dropped = false;

    for component in Path::new(dir).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => dropped = true,
        }
    }

    if dropped {
        warn!("directory '{}' reduced to '{}'", dir, clean.display());
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}
