//! The source hierarchy arena and its constructor API.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxalign_types::{Rank, SourceNodeId};

use crate::error::{ModelError, ModelResult};
use crate::node::SourceNode;

/// One externally supplied taxonomic classification tree.
///
/// Nodes live in a flat arena; the root is node 0 by construction. The tree
/// is append-only: the comparison engine has no business editing a source
/// hierarchy, and removal of a whole tree is handled at the session level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceTree {
    label: String,
    nodes: Vec<SourceNode>,
}

impl SourceTree {
    /// Create a tree with its root taxon.
    pub fn with_root(label: &str, literal: &str, rank: Rank) -> ModelResult<Self> {
        if literal.trim().is_empty() {
            return Err(ModelError::EmptyLiteral);
        }
        let root = SourceNode {
            id: SourceNodeId::from_index(0),
            literal: literal.to_string(),
            rank,
            parent: None,
            children: Vec::new(),
            synonyms: Vec::new(),
        };
        Ok(Self {
            label: label.to_string(),
            nodes: vec![root],
        })
    }

    /// The tree's registration label, unique within a session.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree holds no nodes.
    ///
    /// Only reachable through deserialization; `with_root` always creates
    /// the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node id.
    pub fn root(&self) -> ModelResult<SourceNodeId> {
        if self.nodes.is_empty() {
            return Err(ModelError::EmptyTree);
        }
        Ok(SourceNodeId::from_index(0))
    }

    /// Look up a node.
    pub fn node(&self, id: SourceNodeId) -> Option<&SourceNode> {
        self.nodes.get(id.index())
    }

    fn node_checked(&self, id: SourceNodeId) -> ModelResult<&SourceNode> {
        self.node(id).ok_or(ModelError::UnknownNode(id))
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Append a child taxon under `parent`.
    pub fn add_child(
        &mut self,
        parent: SourceNodeId,
        literal: &str,
        rank: Rank,
    ) -> ModelResult<SourceNodeId> {
        if literal.trim().is_empty() {
            return Err(ModelError::EmptyLiteral);
        }
        self.node_checked(parent)?;

        let id = SourceNodeId::from_index(self.nodes.len());
        self.nodes.push(SourceNode {
            id,
            literal: literal.to_string(),
            rank,
            parent: Some(parent),
            children: Vec::new(),
            synonyms: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        debug!(tree = %self.label, node = %id, literal, "added source node");
        Ok(id)
    }

    /// Record a symmetric synonym link between two taxa of this tree.
    ///
    /// Linking the same pair twice is a no-op.
    pub fn link_synonyms(&mut self, a: SourceNodeId, b: SourceNodeId) -> ModelResult<()> {
        if a == b {
            return Err(ModelError::SelfSynonym(a));
        }
        self.node_checked(a)?;
        self.node_checked(b)?;
        if !self.nodes[a.index()].synonyms.contains(&b) {
            self.nodes[a.index()].synonyms.push(b);
        }
        if !self.nodes[b.index()].synonyms.contains(&a) {
            self.nodes[b.index()].synonyms.push(a);
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Children of a node, in supplied order. Unknown ids yield an empty
    /// slice.
    pub fn children(&self, id: SourceNodeId) -> &[SourceNodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent of a node, `None` for the root or unknown ids.
    pub fn parent(&self, id: SourceNodeId) -> Option<SourceNodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// The root-to-`id` path, root first. Unknown ids yield an empty vec.
    pub fn path_to(&self, id: SourceNodeId) -> Vec<SourceNodeId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let Some(node) = self.node(cur) else {
                return Vec::new();
            };
            path.push(cur);
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// All nodes whose literal matches under the default key normalization,
    /// optionally restricted to a rank.
    pub fn find(&self, literal: &str, rank: Option<Rank>) -> Vec<SourceNodeId> {
        let policy = taxalign_types::KeyPolicy::default();
        let wanted = policy.normalize(literal);
        self.nodes
            .iter()
            .filter(|n| policy.normalize(&n.literal) == wanted)
            .filter(|n| rank.map_or(true, |r| n.rank == r))
            .map(|n| n.id)
            .collect()
    }

    /// Depth-first preorder traversal from the root.
    pub fn preorder(&self) -> Preorder<'_> {
        let mut stack = Vec::new();
        if !self.nodes.is_empty() {
            stack.push(SourceNodeId::from_index(0));
        }
        Preorder { tree: self, stack }
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    /// Validate structural integrity.
    ///
    /// The constructor API cannot produce a malformed tree, but instances
    /// arriving through deserialization can be arbitrary. Checks that:
    /// - the tree is non-empty and node ids match their arena slots,
    /// - exactly node 0 is parentless,
    /// - every link resolves and every parent/child pair is symmetric,
    /// - parent walks terminate (no cycles),
    /// - literals are non-empty and synonym links are within range.
    pub fn validate(&self) -> ModelResult<()> {
        if self.nodes.is_empty() {
            return Err(ModelError::EmptyTree);
        }

        for (slot, node) in self.nodes.iter().enumerate() {
            if node.id.index() != slot {
                return Err(ModelError::BrokenLink {
                    node: node.id,
                    detail: format!("id does not match arena slot {slot}"),
                });
            }
            if node.literal.trim().is_empty() {
                return Err(ModelError::EmptyLiteral);
            }
            match node.parent {
                None => {
                    if slot != 0 {
                        return Err(ModelError::BrokenLink {
                            node: node.id,
                            detail: "non-root node has no parent".to_string(),
                        });
                    }
                }
                Some(parent) => {
                    let parent_node = self.node_checked(parent)?;
                    if !parent_node.children.contains(&node.id) {
                        return Err(ModelError::BrokenLink {
                            node: node.id,
                            detail: format!("parent {parent} does not list it as a child"),
                        });
                    }
                }
            }
            for &child in &node.children {
                let child_node = self.node_checked(child)?;
                if child_node.parent != Some(node.id) {
                    return Err(ModelError::BrokenLink {
                        node: node.id,
                        detail: format!("child {child} does not point back"),
                    });
                }
            }
            for &syn in &node.synonyms {
                self.node_checked(syn)?;
            }
        }

        // Parent walks must terminate at the root.
        for node in &self.nodes {
            let mut visited = HashSet::new();
            let mut current = Some(node.id);
            while let Some(cur) = current {
                if !visited.insert(cur) {
                    return Err(ModelError::CycleDetected(cur));
                }
                current = self.node_checked(cur)?.parent;
            }
        }

        Ok(())
    }
}

/// Depth-first preorder iterator over a [`SourceTree`].
pub struct Preorder<'a> {
    tree: &'a SourceTree,
    stack: Vec<SourceNodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SourceNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id)?;
        for &child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}
