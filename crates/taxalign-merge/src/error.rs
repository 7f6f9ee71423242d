//! Error types for the merge engine.

use taxalign_model::ModelError;
use taxalign_types::{SourceId, UnifiedId};

/// Errors raised by merge operations.
///
/// Lookup misses (an unmapped literal or path) are not errors; they return
/// `Option`/empty. These variants cover caller misuse and state corruption.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The source hierarchy failed structural validation.
    #[error("invalid source tree: {0}")]
    InvalidTree(#[from] ModelError),

    /// A tree with this label is already registered.
    #[error("source already registered: {0:?}")]
    AlreadyRegistered(String),

    /// The source id does not name a registered tree.
    #[error("unknown source: {0}")]
    UnknownSource(SourceId),

    /// A referenced unified node does not exist.
    #[error("unified node not found: {0}")]
    NodeNotFound(UnifiedId),

    /// A mapping would violate the at-most-one-entry-per-(node, source)
    /// invariant.
    #[error("mapping conflict on {unified} for {source_id}")]
    MappingConflict {
        /// The unified node involved.
        unified: UnifiedId,
        /// The source whose mapping conflicted.
        source_id: SourceId,
    },

    /// Internal bookkeeping disagreed with itself.
    #[error("merge state inconsistency: {0}")]
    Inconsistency(String),

    /// Snapshot serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
