//! Error types for source hierarchy construction and validation.

use taxalign_types::SourceNodeId;

/// Errors raised while building or validating a source hierarchy.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A node literal was empty after trimming.
    #[error("literal must not be empty")]
    EmptyLiteral,

    /// A node id did not resolve in this tree's arena.
    #[error("unknown node: {0}")]
    UnknownNode(SourceNodeId),

    /// The tree has no root node.
    #[error("tree has no root")]
    EmptyTree,

    /// A parent/child link pair is inconsistent.
    #[error("node {node} has a broken link: {detail}")]
    BrokenLink {
        /// The node carrying the bad link.
        node: SourceNodeId,
        /// What was wrong with it.
        detail: String,
    },

    /// A parent walk revisited a node.
    #[error("cycle detected at node {0}")]
    CycleDetected(SourceNodeId),

    /// A synonym link named the node itself.
    #[error("node {0} cannot be its own synonym")]
    SelfSynonym(SourceNodeId),
}

/// Convenience alias for model results.
pub type ModelResult<T> = Result<T, ModelError>;
