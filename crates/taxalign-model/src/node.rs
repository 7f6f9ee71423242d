use serde::{Deserialize, Serialize};

use taxalign_types::{Rank, SourceNodeId, TaxonKey};

/// One taxon in a source hierarchy.
///
/// Links are arena indices into the owning [`SourceTree`]; a node never
/// references another tree.
///
/// [`SourceTree`]: crate::tree::SourceTree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    /// This node's arena index.
    pub id: SourceNodeId,
    /// The taxon name as supplied, original spelling preserved.
    pub literal: String,
    /// The taxon's rank.
    pub rank: Rank,
    /// Parent link; `None` for the root.
    pub parent: Option<SourceNodeId>,
    /// Child links in supplied order.
    pub children: Vec<SourceNodeId>,
    /// Within-tree synonym links (symmetric).
    pub synonyms: Vec<SourceNodeId>,
}

impl SourceNode {
    /// Identity key under the default normalization policy.
    pub fn key(&self) -> TaxonKey {
        TaxonKey::derive(&self.literal, self.rank)
    }

    /// Returns `true` if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if this node is the tree root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
