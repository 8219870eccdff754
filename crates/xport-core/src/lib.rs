//! xport-core: Core library for directive-driven scene exports
//!
//! This library provides functionality to:
//! - Parse export directives (`-dir:`, `-sep`, `-dk`, `-sk`, `-anim`) out of names
//! - Partition a collection tree into export roots and their member collections
//! - Report conflicting directive combinations
//! - Plan export jobs (output paths, object selections) for scene, collection
//!   and object scopes
//! - Track exported files and clean up orphans left by earlier exports

pub mod directive;
pub mod error;
pub mod plan;
pub mod resolver;
pub mod scene;
pub mod settings;
pub mod tracking;
pub mod validate;
pub mod visibility;

pub use directive::{parse_name, tokenize, Directives, ParsedName, Token};
pub use error::{Error, Result};
pub use plan::{plan_export, ExportFormat, ExportJob, ExportPlan, ExportScope, SkipReason, UpAxis};
pub use resolver::{resolve_export_roots, resolve_export_roots_with, ExportGroup, ExportGroups, GroupSummary};
pub use scene::{Collection, CollectionId, ObjectId, ObjectKind, Scene, SceneBuilder, SceneObject};
pub use settings::ExportSettings;
pub use tracking::{cleanup_orphans, find_orphans, track_file_path, CleanupReport, TrackFile, TrackLocation};
pub use validate::{validate, Issue, Severity, SkipBehavior, Subject, ValidationReport};
pub use visibility::{should_export_collection, should_export_object, ExportMode};
