//! The unified tree arena.
//!
//! Unified nodes live in a flat `Vec` with tombstones and a free list;
//! every link is an integer index, so the structure holds no reference
//! cycles and serializes directly. A `(parent, key)` sibling index keeps
//! merge-time child lookups O(1) amortized.
//!
//! # Invariants
//!
//! - The synthetic root (slot 0) always exists, is never mapped, and is
//!   never reported by queries.
//! - Every parent/child link pair is symmetric.
//! - A node carries at most one mapping per source.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use taxalign_types::{Rank, SourceId, SourceNodeId, TaxonKey, UnifiedId};

/// One `(source, source node)` mapping entry on a unified node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// The registered source.
    pub source: SourceId,
    /// The mapped node within that source's tree.
    pub node: SourceNodeId,
}

/// One node of the unified tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedNode {
    /// This node's arena index.
    pub id: UnifiedId,
    /// Identity key under the owning engine's policy.
    pub key: TaxonKey,
    /// Canonical literal: the spelling of the first source that introduced
    /// this node.
    pub literal: String,
    /// The taxon's rank.
    pub rank: Rank,
    /// Parent link; `None` only for the synthetic root.
    pub parent: Option<UnifiedId>,
    /// Child links in creation order.
    pub children: Vec<UnifiedId>,
    /// Mapping entries, at most one per source.
    pub mappings: Vec<Mapping>,
}

impl UnifiedNode {
    /// Returns `true` for the synthetic root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The mapped source node for `source`, if any.
    pub fn mapping_for(&self, source: SourceId) -> Option<SourceNodeId> {
        self.mappings
            .iter()
            .find(|m| m.source == source)
            .map(|m| m.node)
    }

    /// Returns `true` if this node is mapped in `source`.
    pub fn is_mapped_in(&self, source: SourceId) -> bool {
        self.mapping_for(source).is_some()
    }
}

/// The unified tree: arena storage plus the sibling index.
#[derive(Clone, Debug)]
pub struct UnifiedTree {
    nodes: Vec<Option<UnifiedNode>>,
    free: Vec<UnifiedId>,
    by_parent_key: HashMap<(UnifiedId, TaxonKey), Vec<UnifiedId>>,
    live: usize,
}

impl UnifiedTree {
    /// Create a tree holding only the synthetic root.
    pub fn new() -> Self {
        let root = UnifiedNode {
            id: UnifiedId::from_index(0),
            key: TaxonKey::derive("", Rank::Unranked),
            literal: String::new(),
            rank: Rank::Unranked,
            parent: None,
            children: Vec::new(),
            mappings: Vec::new(),
        };
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            by_parent_key: HashMap::new(),
            live: 0,
        }
    }

    /// The synthetic root id.
    pub fn root_id(&self) -> UnifiedId {
        UnifiedId::from_index(0)
    }

    /// Number of live nodes, excluding the synthetic root.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if only the synthetic root exists.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Look up a live node.
    pub fn get(&self, id: UnifiedId) -> Option<&UnifiedNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: UnifiedId) -> Option<&mut UnifiedNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Returns `true` if `id` names a live node (root included).
    pub fn contains(&self, id: UnifiedId) -> bool {
        self.get(id).is_some()
    }

    /// Children of a node in creation order. Dead ids yield an empty slice.
    pub fn children(&self, id: UnifiedId) -> &[UnifiedId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Existing children of `parent` carrying `key`, oldest first.
    pub fn children_with_key(&self, parent: UnifiedId, key: &TaxonKey) -> &[UnifiedId] {
        self.by_parent_key
            .get(&(parent, *key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The path from the first node below the root down to `id`, inclusive.
    ///
    /// The synthetic root is not part of any path. Dead ids and the root
    /// itself yield an empty vec.
    pub fn path_to(&self, id: UnifiedId) -> Vec<UnifiedId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let Some(node) = self.get(cur) else {
                return Vec::new();
            };
            if node.is_root() {
                break;
            }
            path.push(cur);
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Depth-first preorder over live nodes, excluding the synthetic root.
    pub fn preorder(&self) -> impl Iterator<Item = &UnifiedNode> {
        let mut stack: Vec<UnifiedId> = self
            .children(self.root_id())
            .iter()
            .rev()
            .copied()
            .collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = self.get(id)?;
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
            Some(node)
        })
    }

    // ---------------------------------------------------------------
    // Mutation (crate-internal; the merge engine is the only writer)
    // ---------------------------------------------------------------

    /// Allocate a node under `parent`, reusing a tombstone slot if one is
    /// free.
    pub(crate) fn alloc(
        &mut self,
        key: TaxonKey,
        literal: &str,
        rank: Rank,
        parent: UnifiedId,
    ) -> UnifiedId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => UnifiedId::from_index(self.nodes.len()),
        };
        let node = UnifiedNode {
            id,
            key,
            literal: literal.to_string(),
            rank,
            parent: Some(parent),
            children: Vec::new(),
            mappings: Vec::new(),
        };
        if id.index() == self.nodes.len() {
            self.nodes.push(Some(node));
        } else {
            self.nodes[id.index()] = Some(node);
        }
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.push(id);
        }
        self.by_parent_key.entry((parent, key)).or_default().push(id);
        self.live += 1;
        id
    }

    /// Remove a childless, unmapped node and return its record.
    ///
    /// The engine prunes bottom-up, so children are always gone first.
    pub(crate) fn remove(&mut self, id: UnifiedId) -> Option<UnifiedNode> {
        let node = self.get(id)?;
        debug_assert!(node.children.is_empty());
        debug_assert!(node.mappings.is_empty());
        let parent = node.parent?;
        let key = node.key;

        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|c| *c != id);
        }
        if let Some(bucket) = self.by_parent_key.get_mut(&(parent, key)) {
            bucket.retain(|c| *c != id);
            if bucket.is_empty() {
                self.by_parent_key.remove(&(parent, key));
            }
        }
        let node = self.nodes[id.index()].take();
        self.free.push(id);
        self.live -= 1;
        node
    }
}

impl Default for UnifiedTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(literal: &str, rank: Rank) -> TaxonKey {
        TaxonKey::derive(literal, rank)
    }

    #[test]
    fn new_tree_has_only_root() {
        let tree = UnifiedTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert!(tree.get(tree.root_id()).unwrap().is_root());
    }

    #[test]
    fn alloc_links_parent_and_sibling_index() {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let k = key("felis", Rank::Genus);
        let felis = tree.alloc(k, "Felis", Rank::Genus, root);

        assert_eq!(tree.children(root), &[felis]);
        assert_eq!(tree.children_with_key(root, &k), &[felis]);
        assert_eq!(tree.get(felis).unwrap().parent, Some(root));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn remove_detaches_and_tombstones() {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let k = key("felis", Rank::Genus);
        let felis = tree.alloc(k, "Felis", Rank::Genus, root);

        let removed = tree.remove(felis).unwrap();
        assert_eq!(removed.literal, "Felis");
        assert!(tree.get(felis).is_none());
        assert!(tree.children(root).is_empty());
        assert!(tree.children_with_key(root, &k).is_empty());
        assert!(tree.is_empty());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let a = tree.alloc(key("a", Rank::Genus), "a", Rank::Genus, root);
        tree.remove(a);
        let b = tree.alloc(key("b", Rank::Genus), "b", Rank::Genus, root);
        assert_eq!(a.index(), b.index());
    }

    #[test]
    fn path_to_excludes_synthetic_root() {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let felis = tree.alloc(key("felis", Rank::Genus), "Felis", Rank::Genus, root);
        let catus = tree.alloc(
            key("felis catus", Rank::Species),
            "Felis catus",
            Rank::Species,
            felis,
        );

        assert_eq!(tree.path_to(catus), vec![felis, catus]);
        assert!(tree.path_to(root).is_empty());
    }

    #[test]
    fn preorder_skips_root_and_respects_order() {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let felis = tree.alloc(key("felis", Rank::Genus), "Felis", Rank::Genus, root);
        tree.alloc(
            key("felis catus", Rank::Species),
            "Felis catus",
            Rank::Species,
            felis,
        );
        tree.alloc(
            key("panthera", Rank::Genus),
            "Panthera",
            Rank::Genus,
            root,
        );

        let literals: Vec<&str> = tree.preorder().map(|n| n.literal.as_str()).collect();
        assert_eq!(literals, vec!["Felis", "Felis catus", "Panthera"]);
    }

    #[test]
    fn same_key_under_different_parents_is_tracked_separately() {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let k = key("aotus", Rank::Genus);
        let fam_a = tree.alloc(key("fabaceae", Rank::Family), "Fabaceae", Rank::Family, root);
        let fam_b = tree.alloc(key("aotidae", Rank::Family), "Aotidae", Rank::Family, root);
        let plant = tree.alloc(k, "Aotus", Rank::Genus, fam_a);
        let monkey = tree.alloc(k, "Aotus", Rank::Genus, fam_b);

        assert_eq!(tree.children_with_key(fam_a, &k), &[plant]);
        assert_eq!(tree.children_with_key(fam_b, &k), &[monkey]);
    }
}
