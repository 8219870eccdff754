//! Export modes and exportability checks

use crate::directive::parse_name;
use crate::scene::{CollectionId, ObjectId, Scene};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which objects an export considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Everything, regardless of visibility
    All,
    /// Only what is visible in the viewport
    #[default]
    Visible,
    /// Only what is enabled for rendering
    Renderable,
}

impl ExportMode {
    /// Upper-case key used in tracking files
    pub fn as_key(self) -> &'static str {
        match self {
            ExportMode::All => "ALL",
            ExportMode::Visible => "VISIBLE",
            ExportMode::Renderable => "RENDERABLE",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Whether an object is visible under the given mode
///
/// The object's own flags must pass, and at least one collection holding it
/// must pass too. Loose objects only need their own flags.
pub fn is_object_visible(scene: &Scene, obj: ObjectId, mode: ExportMode) -> bool {
    let object = scene.object(obj);
    let users = scene.users_collection(obj);

    match mode {
        ExportMode::All => true,
        ExportMode::Visible => {
            if object.hide_viewport || object.hide_render {
                return false;
            }
            users.is_empty() || users.iter().any(|c| !scene.collection(*c).hide_viewport)
        }
        ExportMode::Renderable => {
            if object.hide_render {
                return false;
            }
            users.is_empty() || users.iter().any(|c| !scene.collection(*c).hide_render)
        }
    }
}

/// Whether an object should go into an export
pub fn should_export_object(scene: &Scene, obj: ObjectId, mode: ExportMode) -> bool {
    let object = scene.object(obj);

    if parse_name(&object.name).directives.exclude {
        return false;
    }
    if !object.kind.is_exportable() {
        return false;
    }
    is_object_visible(scene, obj, mode)
}

/// Host-side check applied to each collection during root resolution
///
/// A collection failing this check is pruned together with its subtree.
pub fn collection_passes(scene: &Scene, col: CollectionId, mode: ExportMode) -> bool {
    let collection = scene.collection(col);
    match mode {
        ExportMode::All => true,
        ExportMode::Visible => !collection.hide_viewport,
        ExportMode::Renderable => !collection.hide_render,
    }
}

/// Whether a collection, or anything below it, has something to export
pub fn should_export_collection(scene: &Scene, col: CollectionId, mode: ExportMode) -> bool {
    if parse_name(&scene.collection(col).name).directives.exclude {
        return false;
    }
    if !collection_passes(scene, col, mode) {
        return false;
    }

    let collection = scene.collection(col);
    collection
        .objects
        .iter()
        .any(|obj| should_export_object(scene, *obj, mode))
        || collection
            .children
            .iter()
            .any(|child| should_export_collection(scene, *child, mode))
}

/// Exportable objects of a collection and its descendants
pub fn exportable_objects(scene: &Scene, col: CollectionId, mode: ExportMode) -> Vec<ObjectId> {
    scene
        .all_objects(col)
        .into_iter()
        .filter(|obj| should_export_object(scene, *obj, mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ObjectKind, SceneBuilder};

    #[test]
    fn test_all_mode_ignores_flags() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let o = b.object(a, "Cube");
        b.object_mut(o).hide_viewport = true;
        b.collection_mut(a).hide_render = true;
        let scene = b.build();

        assert!(is_object_visible(&scene, o, ExportMode::All));
        assert!(collection_passes(&scene, a, ExportMode::All));
    }

    #[test]
    fn test_visible_mode() {
        let mut b = SceneBuilder::new("s");
        let shown = b.root("Shown");
        let hidden = b.root("Hidden");
        let o1 = b.object(shown, "one");
        let o2 = b.object(hidden, "two");
        let o3 = b.object(shown, "three");
        b.link(hidden, o1);
        b.collection_mut(hidden).hide_viewport = true;
        b.object_mut(o3).hide_render = true;
        let scene = b.build();

        // one visible collection is enough
        assert!(is_object_visible(&scene, o1, ExportMode::Visible));
        assert!(!is_object_visible(&scene, o2, ExportMode::Visible));
        assert!(!is_object_visible(&scene, o3, ExportMode::Visible));
        assert!(!collection_passes(&scene, hidden, ExportMode::Visible));
    }

    #[test]
    fn test_renderable_mode() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let r = b.root("NoRender");
        let o1 = b.object(a, "one");
        let o2 = b.object(r, "two");
        b.object_mut(o1).hide_viewport = true;
        b.collection_mut(r).hide_render = true;
        let scene = b.build();

        assert!(is_object_visible(&scene, o1, ExportMode::Renderable));
        assert!(!is_object_visible(&scene, o2, ExportMode::Renderable));
        assert!(!collection_passes(&scene, r, ExportMode::Renderable));
        assert!(collection_passes(&scene, r, ExportMode::Visible));
    }

    #[test]
    fn test_loose_object_visible() {
        let mut b = SceneBuilder::new("s");
        let o = b.loose_object("Ground");
        let scene = b.build();
        assert!(is_object_visible(&scene, o, ExportMode::Visible));
    }

    #[test]
    fn test_should_export_object_rules() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let mesh = b.object(a, "Cube");
        let excluded = b.object(a, "Helper -dk");
        let camera = b.object_of_kind(a, "Cam", ObjectKind::Camera);
        let rig = b.object_of_kind(a, "Rig", ObjectKind::Armature);
        let scene = b.build();

        assert!(should_export_object(&scene, mesh, ExportMode::All));
        assert!(!should_export_object(&scene, excluded, ExportMode::All));
        assert!(!should_export_object(&scene, camera, ExportMode::All));
        assert!(should_export_object(&scene, rig, ExportMode::All));
    }

    #[test]
    fn test_should_export_collection_looks_at_descendants() {
        let mut b = SceneBuilder::new("s");
        let outer = b.root("Outer");
        let inner = b.child(outer, "Inner");
        let empty = b.root("Empty");
        let excluded = b.root("Gone -dk");
        b.object(inner, "Cube");
        b.object(excluded, "Cube2");
        b.object_of_kind(empty, "Lamp", ObjectKind::Light);
        let scene = b.build();

        assert!(should_export_collection(&scene, outer, ExportMode::Visible));
        assert!(!should_export_collection(&scene, empty, ExportMode::Visible));
        assert!(!should_export_collection(&scene, excluded, ExportMode::Visible));
    }

    #[test]
    fn test_exportable_objects_filters() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let c = b.child(a, "C");
        let o1 = b.object(a, "one");
        b.object(c, "two -dk");
        let o3 = b.object(c, "three");
        let scene = b.build();

        assert_eq!(exportable_objects(&scene, a, ExportMode::Visible), vec![o1, o3]);
    }
}
