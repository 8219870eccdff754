//! Export-root resolution
//!
//! Walks the collection tree top-down and partitions it into export groups.
//! Each group is anchored at an export root and lists the collections whose
//! contents go into that root's output file.

use crate::directive::parse_name;
use crate::scene::{CollectionId, Scene};
use crate::visibility::{collection_passes, ExportMode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One output file's worth of collections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportGroup {
    /// Collection that names the output file
    pub root: CollectionId,
    /// Collections merged into the output, in traversal order (root first)
    pub members: Vec<CollectionId>,
}

/// Mapping from export root to its member collections
///
/// Groups keep the order in which their roots were discovered. Every
/// collection appears in at most one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportGroups {
    groups: Vec<ExportGroup>,
}

impl ExportGroups {
    /// Members of the group anchored at `root`
    pub fn get(&self, root: CollectionId) -> Option<&[CollectionId]> {
        self.groups
            .iter()
            .find(|g| g.root == root)
            .map(|g| g.members.as_slice())
    }

    /// Export roots in discovery order
    pub fn roots(&self) -> Vec<CollectionId> {
        self.groups.iter().map(|g| g.root).collect()
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether `col` is a member of any group
    pub fn contains(&self, col: CollectionId) -> bool {
        self.root_of(col).is_some()
    }

    /// Root of the group that `col` belongs to
    pub fn root_of(&self, col: CollectionId) -> Option<CollectionId> {
        self.groups
            .iter()
            .find(|g| g.members.contains(&col))
            .map(|g| g.root)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExportGroup> {
        self.groups.iter()
    }

    /// Clean-name view of the groups, for display and serialization
    pub fn describe(&self, scene: &Scene) -> Vec<GroupSummary> {
        self.groups
            .iter()
            .map(|g| GroupSummary {
                root: parse_name(&scene.collection(g.root).name).clean_name,
                members: g
                    .members
                    .iter()
                    .map(|m| parse_name(&scene.collection(*m).name).clean_name)
                    .collect(),
            })
            .collect()
    }

    fn add(&mut self, root: CollectionId, col: CollectionId) {
        let index = match self.groups.iter().position(|g| g.root == root) {
            Some(index) => index,
            None => {
                self.groups.push(ExportGroup {
                    root,
                    members: Vec::new(),
                });
                self.groups.len() - 1
            }
        };

        let members = &mut self.groups[index].members;
        if !members.contains(&col) {
            members.push(col);
        }
    }
}

impl<'a> IntoIterator for &'a ExportGroups {
    type Item = &'a ExportGroup;
    type IntoIter = std::slice::Iter<'a, ExportGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// A group rendered with clean names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub root: String,
    pub members: Vec<String>,
}

/// Resolve export roots for the scene's top-level collections
pub fn resolve_export_roots(scene: &Scene, mode: ExportMode) -> ExportGroups {
    resolve_export_roots_with(scene, &scene.roots, |col| {
        collection_passes(scene, col, mode)
    })
}

/// Resolve export roots starting from `roots`
///
/// `passes` is the host-side exportability check. A collection that fails
/// it, or carries `-dk`, is pruned along with its whole subtree. A
/// collection linked under several parents is assigned on its first visit
/// only.
pub fn resolve_export_roots_with<F>(scene: &Scene, roots: &[CollectionId], passes: F) -> ExportGroups
where
    F: Fn(CollectionId) -> bool,
{
    let mut walk = Walk {
        scene,
        passes,
        visited: HashSet::new(),
        groups: ExportGroups::default(),
    };

    for root in roots {
        walk.visit(*root, None);
    }

    walk.groups
}

struct Walk<'a, F> {
    scene: &'a Scene,
    passes: F,
    visited: HashSet<CollectionId>,
    groups: ExportGroups,
}

impl<F> Walk<'_, F>
where
    F: Fn(CollectionId) -> bool,
{
    fn visit(&mut self, id: CollectionId, current: Option<CollectionId>) {
        if !self.visited.insert(id) {
            return;
        }

        let scene = self.scene;
        let collection = scene.collection(id);
        let directives = parse_name(&collection.name).directives;

        if directives.exclude || !(self.passes)(id) {
            debug!("pruning collection '{}'", collection.name);
            return;
        }

        if directives.skip {
            debug!("skipping collection '{}'", collection.name);
            for child in &collection.children {
                self.visit(*child, current);
            }
            return;
        }

        let root = match current {
            Some(root) if !directives.separate => root,
            _ => id,
        };
        self.groups.add(root, id);

        for child in &collection.children {
            self.visit(*child, Some(root));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneBuilder;

    fn all(scene: &Scene) -> ExportGroups {
        resolve_export_roots(scene, ExportMode::All)
    }

    #[test]
    fn test_nested_separate_roots() {
        let mut b = SceneBuilder::new("s");
        let root = b.root("Root -sep");
        let child1 = b.child(root, "Child1");
        let child2 = b.child(root, "Child2 -sep");
        let grandchild = b.child(child2, "Grandchild");
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.roots(), vec![root, child2]);
        assert_eq!(groups.get(root), Some(&[root, child1][..]));
        assert_eq!(groups.get(child2), Some(&[child2, grandchild][..]));
    }

    #[test]
    fn test_skip_is_transparent() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let skipped = b.child(a, "B -sk");
        let c = b.child(skipped, "C");
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get(a), Some(&[a, c][..]));
        assert!(!groups.contains(skipped));
        assert_eq!(groups.get(skipped), None);
    }

    #[test]
    fn test_skip_at_top_level_makes_children_roots() {
        let mut b = SceneBuilder::new("s");
        let bin = b.root("Bin -sk");
        let x = b.child(bin, "X");
        let y = b.child(bin, "Y");
        let z = b.child(y, "Z");
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.roots(), vec![x, y]);
        assert_eq!(groups.get(y), Some(&[y, z][..]));
    }

    #[test]
    fn test_exclude_prunes_subtree() {
        let mut b = SceneBuilder::new("s");
        let level = b.root("Level");
        let enemy = b.child(level, "Enemy -dk");
        let minion = b.child(enemy, "Minion -sep");
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.get(level), Some(&[level][..]));
        assert!(!groups.contains(enemy));
        assert!(!groups.contains(minion));
    }

    #[test]
    fn test_exclude_wins_over_separate() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let both = b.child(a, "Both -sep -dk");
        b.child(both, "Below");
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.roots(), vec![a]);
        assert_eq!(groups.get(a), Some(&[a][..]));
    }

    #[test]
    fn test_unmarked_top_levels_are_their_own_roots() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let c = b.root("B");
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.roots(), vec![a, c]);
        assert_eq!(groups.get(c), Some(&[c][..]));
    }

    #[test]
    fn test_hidden_collection_stops_descent() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let hidden = b.child(a, "Hidden");
        let below = b.child(hidden, "Below -sep");
        b.collection_mut(hidden).hide_viewport = true;
        let scene = b.build();

        let groups = resolve_export_roots(&scene, ExportMode::Visible);
        assert_eq!(groups.get(a), Some(&[a][..]));
        assert!(!groups.contains(below));

        let groups = resolve_export_roots(&scene, ExportMode::All);
        assert_eq!(groups.root_of(below), Some(below));
    }

    #[test]
    fn test_shared_collection_assigned_once() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let other = b.root("B");
        let shared = b.child(a, "Shared");
        b.collection_mut(other).children.push(shared);
        let scene = b.build();

        let groups = all(&scene);
        assert_eq!(groups.root_of(shared), Some(a));
        assert_eq!(groups.get(other), Some(&[other][..]));
    }

    #[test]
    fn test_custom_predicate_and_roots() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("A");
        let keep = b.child(a, "Keep");
        let drop = b.child(a, "Drop");
        let scene = b.build();

        let groups = resolve_export_roots_with(&scene, &[keep, drop], |c| c != drop);
        assert_eq!(groups.roots(), vec![keep]);
    }

    #[test]
    fn test_partition_property() {
        let mut b = SceneBuilder::new("s");
        let r1 = b.root("R1");
        let s1 = b.child(r1, "S1 -sep");
        let k1 = b.child(s1, "K1 -sk");
        b.child(k1, "L1");
        b.child(k1, "L2 -sep");
        b.child(r1, "X -dk");
        let r2 = b.root("R2 -sk");
        b.child(r2, "M1");
        b.child(r2, "M2 -sep -anim");
        let scene = b.build();

        let groups = all(&scene);
        let mut seen = Vec::new();
        for group in &groups {
            assert_eq!(group.members[0], group.root);
            for member in &group.members {
                assert!(!seen.contains(member), "collection assigned twice");
                seen.push(*member);
            }
        }

        let expected: Vec<CollectionId> = scene
            .collection_ids()
            .filter(|c| {
                let d = parse_name(&scene.collection(*c).name).directives;
                !d.exclude && !d.skip
            })
            .collect();
        seen.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_describe_uses_clean_names() {
        let mut b = SceneBuilder::new("s");
        let a = b.root("Props -dir:props");
        b.child(a, "Small -anim");
        let scene = b.build();

        let summary = all(&scene).describe(&scene);
        assert_eq!(
            summary,
            vec![GroupSummary {
                root: "Props".to_string(),
                members: vec!["Props".to_string(), "Small".to_string()],
            }]
        );
    }
}
