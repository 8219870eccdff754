//! Export tracking
//!
//! Records which files each export configuration wrote, so files left over
//! from renamed or removed collections can be found and cleaned up.

use crate::error::{Error, Result};
use crate::plan::{ExportFormat, ExportScope};
use crate::settings::ExportSettings;
use crate::visibility::ExportMode;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// History entries kept per export configuration
pub const MAX_HISTORY: usize = 10;

const TRACK_SUFFIX: &str = ".export.track";
const UNSAVED: &str = "unsaved";
const EXPORTED_EXTENSIONS: &[&str] = &["glb", "gltf", "obj", "fbx", "bin"];

/// Where the track file lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackLocation {
    /// Next to the host document
    #[default]
    Blend,
    /// Inside the export directory
    Export,
}

/// The most recent export of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastExport {
    pub timestamp: DateTime<Utc>,
    pub files: Vec<PathBuf>,
    /// Host document path, or `"unsaved"`
    pub blend_file: String,
    pub format: ExportFormat,
    pub scope: ExportScope,
    pub mode: ExportMode,
    pub export_path: PathBuf,
}

/// A past export of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub files: Vec<PathBuf>,
    pub format: ExportFormat,
    pub scope: ExportScope,
    pub mode: ExportMode,
}

/// Tracking data for one export configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    #[serde(default)]
    pub last_export: Option<LastExport>,
    /// Oldest first, at most [`MAX_HISTORY`] entries
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Track file contents, keyed by [`ExportSettings::track_key`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackFile {
    pub entries: BTreeMap<String, TrackEntry>,
}

impl TrackFile {
    /// Create a new empty track file
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a track file, or start empty if it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the track file, creating its directory if needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Record the files written by one export run
    pub fn record(&mut self, settings: &ExportSettings, blend_file: Option<&Path>, files: Vec<PathBuf>) {
        let timestamp = Utc::now();
        let entry = self.entries.entry(settings.track_key()).or_default();

        entry.last_export = Some(LastExport {
            timestamp,
            files: files.clone(),
            blend_file: blend_file
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| UNSAVED.to_string()),
            format: settings.format,
            scope: settings.scope,
            mode: settings.mode,
            export_path: settings.export_path.clone(),
        });

        entry.history.push(HistoryEntry {
            timestamp,
            files,
            format: settings.format,
            scope: settings.scope,
            mode: settings.mode,
        });
        if entry.history.len() > MAX_HISTORY {
            let excess = entry.history.len() - MAX_HISTORY;
            entry.history.drain(..excess);
        }
    }

    /// Files written by the latest export of every configuration
    pub fn tracked_files(&self) -> HashSet<PathBuf> {
        self.entries
            .values()
            .filter_map(|e| e.last_export.as_ref())
            .flat_map(|last| last.files.iter().cloned())
            .collect()
    }

    /// Export directories that have been written to
    pub fn export_paths(&self) -> BTreeSet<PathBuf> {
        self.entries
            .iter()
            .filter_map(|(key, e)| {
                e.last_export.as_ref().map(|last| {
                    if last.export_path.as_os_str().is_empty() {
                        PathBuf::from(key.split('|').next().unwrap_or_default())
                    } else {
                        last.export_path.clone()
                    }
                })
            })
            .collect()
    }

    /// Drop deleted or vanished files from every entry
    pub fn prune(&mut self, deleted: &[PathBuf]) {
        let keep = |f: &PathBuf| !deleted.contains(f) && f.exists();
        for entry in self.entries.values_mut() {
            if let Some(last) = entry.last_export.as_mut() {
                last.files.retain(keep);
            }
            for past in &mut entry.history {
                past.files.retain(keep);
            }
        }
    }

    /// Total number of history entries
    pub fn total_entries(&self) -> usize {
        self.entries.values().map(|e| e.history.len()).sum()
    }
}

/// Location of the track file for these settings
pub fn track_file_path(settings: &ExportSettings, blend_file: Option<&Path>) -> PathBuf {
    let stem = blend_file
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or(UNSAVED);

    if settings.track_location == TrackLocation::Export && !settings.export_path.as_os_str().is_empty() {
        return settings.export_path.join(format!("{}{}", stem, TRACK_SUFFIX));
    }

    match blend_file {
        Some(blend) => blend
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(format!("{}{}", stem, TRACK_SUFFIX)),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("unsaved_export.track"),
    }
}

/// Exported files on disk that no tracked export wrote
pub fn find_orphans(track: &TrackFile) -> Vec<PathBuf> {
    let tracked = track.tracked_files();
    let mut orphans = Vec::new();

    for export_path in track.export_paths() {
        if !export_path.exists() {
            debug!("export path {} no longer exists", export_path.display());
            continue;
        }

        for entry in WalkDir::new(&export_path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !is_exported_file(path) || tracked.contains(path) {
                continue;
            }
            if is_bin(path) && tracked.contains(&path.with_extension("gltf")) {
                continue;
            }
            orphans.push(path.to_path_buf());
        }
    }

    orphans.sort();
    orphans
}

fn is_exported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn is_bin(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("bin"))
}

/// Outcome of an orphan cleanup
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub deleted_files: Vec<PathBuf>,
    pub deleted_dirs: Vec<PathBuf>,
    /// Paths that could not be removed, with the reason
    pub errors: Vec<(PathBuf, String)>,
}

/// Delete orphaned files and update the track data
///
/// A `.gltf` orphan takes its `.bin` and `<stem>_textures` directory with it.
/// With `remove_empty_dirs`, empty sub-directories of every export path are
/// removed too (the export path itself is kept). The caller saves `track`.
pub fn cleanup_orphans(track: &mut TrackFile, remove_empty_dirs: bool) -> CleanupReport {
    let mut report = CleanupReport::default();

    for orphan in find_orphans(track) {
        if !orphan.exists() {
            continue;
        }
        match fs::remove_file(&orphan) {
            Ok(()) => {
                info!("deleted orphaned file {}", orphan.display());
                report.deleted_files.push(orphan.clone());
            }
            Err(e) => {
                warn!("failed to delete {}: {}", orphan.display(), e);
                report.errors.push((orphan.clone(), e.to_string()));
                continue;
            }
        }

        if orphan.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gltf")) {
            remove_gltf_companions(&orphan, &mut report);
        }
    }

    if remove_empty_dirs {
        for export_path in track.export_paths() {
            remove_empty_subdirs(&export_path, &mut report);
        }
    }

    track.prune(&report.deleted_files);
    report
}

fn remove_gltf_companions(gltf: &Path, report: &mut CleanupReport) {
    let bin = gltf.with_extension("bin");
    if bin.exists() {
        match fs::remove_file(&bin) {
            Ok(()) => report.deleted_files.push(bin),
            Err(e) => report.errors.push((bin, e.to_string())),
        }
    }

    let Some(stem) = gltf.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    let textures = gltf.with_file_name(format!("{}_textures", stem));
    if textures.is_dir() {
        match fs::remove_dir_all(&textures) {
            Ok(()) => report.deleted_dirs.push(textures),
            Err(e) => report.errors.push((textures, e.to_string())),
        }
    }
}

fn remove_empty_subdirs(root: &Path, report: &mut CleanupReport) {
    if !root.is_dir() {
        return;
    }

    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let dir = entry.path();
        let is_empty = fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false);
        if !is_empty {
            continue;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                info!("deleted empty folder {}", dir.display());
                report.deleted_dirs.push(dir.to_path_buf());
            }
            Err(e) => report.errors.push((dir.to_path_buf(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_for(dir: &Path) -> ExportSettings {
        ExportSettings {
            export_path: dir.to_path_buf(),
            scope: ExportScope::Collection,
            ..ExportSettings::default()
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_record_and_history_cap() {
        let settings = settings_for(Path::new("/out"));
        let mut track = TrackFile::new();

        for i in 0..12 {
            track.record(&settings, None, vec![PathBuf::from(format!("/out/{}.glb", i))]);
        }

        let entry = &track.entries["/out|COLLECTION|VISIBLE"];
        assert_eq!(entry.history.len(), MAX_HISTORY);
        assert_eq!(entry.history[0].files, vec![PathBuf::from("/out/2.glb")]);

        let last = entry.last_export.as_ref().unwrap();
        assert_eq!(last.files, vec![PathBuf::from("/out/11.glb")]);
        assert_eq!(last.blend_file, "unsaved");
        assert_eq!(track.total_entries(), MAX_HISTORY);
    }

    #[test]
    fn test_separate_keys_per_configuration() {
        let mut a = settings_for(Path::new("/out"));
        let mut track = TrackFile::new();
        track.record(&a, None, vec![PathBuf::from("/out/a.glb")]);
        a.mode = ExportMode::All;
        track.record(&a, None, vec![PathBuf::from("/out/b.glb")]);

        assert_eq!(track.entries.len(), 2);
        assert_eq!(track.tracked_files().len(), 2);
        assert_eq!(track.export_paths().len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("level.export.track");

        let mut track = TrackFile::new();
        track.record(
            &settings_for(Path::new("/out")),
            Some(Path::new("/work/level.blend")),
            vec![PathBuf::from("/out/a.glb")],
        );
        track.save(&path).unwrap();

        let loaded = TrackFile::load(&path).unwrap();
        assert_eq!(loaded, track);
        assert!(TrackFile::load(dir.path().join("missing.track")).unwrap().entries.is_empty());
    }

    #[test]
    fn test_track_file_path() {
        let mut settings = settings_for(Path::new("/out"));
        let blend = Path::new("/work/level.blend");

        assert_eq!(
            track_file_path(&settings, Some(blend)),
            PathBuf::from("/work/level.export.track")
        );

        settings.track_location = TrackLocation::Export;
        assert_eq!(
            track_file_path(&settings, Some(blend)),
            PathBuf::from("/out/level.export.track")
        );
        assert_eq!(
            track_file_path(&settings, None),
            PathBuf::from("/out/unsaved.export.track")
        );

        settings.export_path = PathBuf::new();
        assert!(track_file_path(&settings, None).ends_with("unsaved_export.track"));
    }

    #[test]
    fn test_find_orphans() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let kept = root.join("props").join("Props.glb");
        let scene = root.join("Scene.gltf");
        let stale = root.join("Old.fbx");
        touch(&kept);
        touch(&scene);
        touch(&root.join("Scene.bin"));
        touch(&stale);
        touch(&root.join("notes.txt"));

        let mut track = TrackFile::new();
        track.record(&settings_for(root), None, vec![kept, scene]);

        assert_eq!(find_orphans(&track), vec![stale]);
    }

    #[test]
    fn test_cleanup_orphans() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let kept = root.join("Keep.glb");
        let old_gltf = root.join("old").join("Old.gltf");
        touch(&kept);
        touch(&old_gltf);
        touch(&root.join("old").join("Old.bin"));
        touch(&root.join("old").join("Old_textures").join("albedo.png"));

        let mut track = TrackFile::new();
        let settings = settings_for(root);
        track.record(&settings, None, vec![kept.clone()]);
        track.record(&settings, None, vec![kept.clone(), old_gltf.clone()]);
        // latest run no longer writes Old.gltf
        track.record(&settings, None, vec![kept.clone()]);

        let report = cleanup_orphans(&mut track, true);

        assert!(report.errors.is_empty());
        assert!(report.deleted_files.contains(&old_gltf));
        assert!(!root.join("old").exists());
        assert!(kept.exists());

        let history = &track.entries[&settings.track_key()].history;
        assert!(history.iter().all(|h| !h.files.contains(&old_gltf)));
        assert_eq!(history[1].files, vec![kept]);
    }

    #[test]
    fn test_cleanup_keeps_empty_dirs_by_default() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("empty")).unwrap();

        let mut track = TrackFile::new();
        track.record(&settings_for(root), None, Vec::new());

        let report = cleanup_orphans(&mut track, false);
        assert!(report.deleted_dirs.is_empty());
        assert!(root.join("empty").exists());

        let report = cleanup_orphans(&mut track, true);
        assert_eq!(report.deleted_dirs, vec![root.join("empty")]);
        assert!(root.exists());
    }
}
