//! Scene snapshot types
//!
//! A snapshot of the host's collection tree and objects. The host addon
//! writes it as JSON; tests and in-memory callers use [`SceneBuilder`].

use crate::directive::parse_name;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Index of a collection in [`Scene::collections`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub usize);

/// Index of an object in [`Scene::objects`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub usize);

/// Host object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    #[default]
    Mesh,
    Curve,
    Surface,
    Meta,
    Font,
    Armature,
    Empty,
    Camera,
    Light,
    #[serde(other)]
    Other,
}

impl ObjectKind {
    /// Whether exporters handle this kind of object
    pub fn is_exportable(self) -> bool {
        matches!(
            self,
            ObjectKind::Mesh
                | ObjectKind::Curve
                | ObjectKind::Surface
                | ObjectKind::Meta
                | ObjectKind::Font
                | ObjectKind::Armature
        )
    }
}

/// An object in the scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    /// Raw name, directives included
    pub name: String,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub hide_viewport: bool,
    #[serde(default)]
    pub hide_render: bool,
}

/// A collection node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Raw name, directives included
    pub name: String,
    #[serde(default)]
    pub hide_viewport: bool,
    #[serde(default)]
    pub hide_render: bool,
    /// Child collections in host order
    #[serde(default)]
    pub children: Vec<CollectionId>,
    /// Objects linked directly to this collection
    #[serde(default)]
    pub objects: Vec<ObjectId>,
}

/// A snapshot of one host scene
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name
    #[serde(default)]
    pub name: String,
    /// Host document the snapshot was taken from, `None` if unsaved
    #[serde(default)]
    pub blend_file: Option<PathBuf>,
    /// Children of the scene-level master collection, in host order
    #[serde(default)]
    pub roots: Vec<CollectionId>,
    /// Objects linked to the master collection itself
    #[serde(default)]
    pub loose_objects: Vec<ObjectId>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl Scene {
    /// Parse a snapshot from JSON and check its references
    pub fn from_json(content: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(content)?;
        scene.check()?;
        Ok(scene)
    }

    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Save the snapshot as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Verify every id resolves and no collection reachable from the roots
    /// contains itself
    pub fn check(&self) -> Result<()> {
        for id in &self.roots {
            self.check_collection_id(*id, "<scene>")?;
        }
        for id in &self.loose_objects {
            self.check_object_id(*id, "<scene>")?;
        }
        for col in &self.collections {
            for child in &col.children {
                self.check_collection_id(*child, &col.name)?;
            }
            for obj in &col.objects {
                self.check_object_id(*obj, &col.name)?;
            }
        }

        let mut marks = vec![Mark::Unvisited; self.collections.len()];
        for root in &self.roots {
            self.check_acyclic(*root, &mut marks)?;
        }
        Ok(())
    }

    fn check_collection_id(&self, id: CollectionId, owner: &str) -> Result<()> {
        if id.0 < self.collections.len() {
            Ok(())
        } else {
            Err(Error::DanglingId {
                kind: "collection",
                id: id.0,
                owner: owner.to_string(),
            })
        }
    }

    fn check_object_id(&self, id: ObjectId, owner: &str) -> Result<()> {
        if id.0 < self.objects.len() {
            Ok(())
        } else {
            Err(Error::DanglingId {
                kind: "object",
                id: id.0,
                owner: owner.to_string(),
            })
        }
    }

    /// Depth-first walk that expands each collection once
    fn check_acyclic(&self, id: CollectionId, marks: &mut [Mark]) -> Result<()> {
        match marks[id.0] {
            Mark::Done => return Ok(()),
            Mark::OnPath => {
                return Err(Error::CollectionCycle(self.collection(id).name.clone()));
            }
            Mark::Unvisited => {}
        }

        marks[id.0] = Mark::OnPath;
        for child in &self.collection(id).children {
            self.check_acyclic(*child, marks)?;
        }
        marks[id.0] = Mark::Done;
        Ok(())
    }

    /// Get a collection by id
    ///
    /// Panics on an id that did not come from this snapshot; [`Scene::check`]
    /// guarantees every stored id is valid.
    pub fn collection(&self, id: CollectionId) -> &Collection {
        &self.collections[id.0]
    }

    /// Get an object by id
    pub fn object(&self, id: ObjectId) -> &SceneObject {
        &self.objects[id.0]
    }

    /// Iterate over all collection ids in index order
    pub fn collection_ids(&self) -> impl Iterator<Item = CollectionId> {
        (0..self.collections.len()).map(CollectionId)
    }

    /// Iterate over all object ids in index order
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> {
        (0..self.objects.len()).map(ObjectId)
    }

    /// Find a collection by raw name
    pub fn find_collection(&self, name: &str) -> Option<CollectionId> {
        self.collections
            .iter()
            .position(|c| c.name == name)
            .map(CollectionId)
    }

    /// Find a collection by raw name, falling back to its clean name
    pub fn lookup_collection(&self, name: &str) -> Result<CollectionId> {
        self.find_collection(name)
            .or_else(|| {
                self.collection_ids()
                    .find(|id| parse_name(&self.collection(*id).name).clean_name == name)
            })
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Find an object by raw name
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    /// Collections that directly contain the object
    pub fn users_collection(&self, obj: ObjectId) -> Vec<CollectionId> {
        self.collection_ids()
            .filter(|id| self.collection(*id).objects.contains(&obj))
            .collect()
    }

    /// First collection (by index) that contains the object
    pub fn collection_for_object(&self, obj: ObjectId) -> Option<CollectionId> {
        self.collection_ids()
            .find(|id| self.collection(*id).objects.contains(&obj))
    }

    /// Objects of a collection and all of its descendants, pre-order,
    /// each object once
    pub fn all_objects(&self, id: CollectionId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_objects(id, &mut out);
        out
    }

    fn collect_objects(&self, id: CollectionId, out: &mut Vec<ObjectId>) {
        let col = self.collection(id);
        for obj in &col.objects {
            if !out.contains(obj) {
                out.push(*obj);
            }
        }
        for child in &col.children {
            self.collect_objects(*child, out);
        }
    }
}

/// Walk state of a collection during the cycle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Incremental builder for snapshots
#[derive(Debug, Default)]
pub struct SceneBuilder {
    scene: Scene,
}

impl SceneBuilder {
    /// Start an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scene: Scene {
                name: name.into(),
                ..Scene::default()
            },
        }
    }

    /// Set the host document path
    pub fn blend_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.scene.blend_file = Some(path.into());
        self
    }

    /// Add a collection to the master collection
    pub fn root(&mut self, name: impl Into<String>) -> CollectionId {
        let id = self.push_collection(name.into());
        self.scene.roots.push(id);
        id
    }

    /// Add a collection under `parent`
    pub fn child(&mut self, parent: CollectionId, name: impl Into<String>) -> CollectionId {
        let id = self.push_collection(name.into());
        self.scene.collections[parent.0].children.push(id);
        id
    }

    /// Add a mesh object to a collection
    pub fn object(&mut self, collection: CollectionId, name: impl Into<String>) -> ObjectId {
        self.object_of_kind(collection, name, ObjectKind::Mesh)
    }

    /// Add an object of the given kind to a collection
    pub fn object_of_kind(
        &mut self,
        collection: CollectionId,
        name: impl Into<String>,
        kind: ObjectKind,
    ) -> ObjectId {
        let id = self.push_object(name.into(), kind);
        self.scene.collections[collection.0].objects.push(id);
        id
    }

    /// Link an existing object into another collection as well
    pub fn link(&mut self, collection: CollectionId, obj: ObjectId) {
        self.scene.collections[collection.0].objects.push(obj);
    }

    /// Add a mesh object to the master collection
    pub fn loose_object(&mut self, name: impl Into<String>) -> ObjectId {
        let id = self.push_object(name.into(), ObjectKind::Mesh);
        self.scene.loose_objects.push(id);
        id
    }

    /// Mutable access to a collection's flags
    pub fn collection_mut(&mut self, id: CollectionId) -> &mut Collection {
        &mut self.scene.collections[id.0]
    }

    /// Mutable access to an object's flags
    pub fn object_mut(&mut self, id: ObjectId) -> &mut SceneObject {
        &mut self.scene.objects[id.0]
    }

    /// Finish the snapshot
    pub fn build(self) -> Scene {
        self.scene
    }

    fn push_collection(&mut self, name: String) -> CollectionId {
        self.scene.collections.push(Collection {
            name,
            hide_viewport: false,
            hide_render: false,
            children: Vec::new(),
            objects: Vec::new(),
        });
        CollectionId(self.scene.collections.len() - 1)
    }

    fn push_object(&mut self, name: String, kind: ObjectKind) -> ObjectId {
        self.scene.objects.push(SceneObject {
            name,
            kind,
            hide_viewport: false,
            hide_render: false,
        });
        ObjectId(self.scene.objects.len() - 1)
    }
}
