//! Error types for view alignment.

use taxalign_types::{UnifiedId, ViewId};

/// Errors raised by alignment and selection operations.
///
/// These are misuse-class failures: a view or node the caller never
/// registered. Unmapped counterparts during propagation are ordinary
/// outcomes and never error.
#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// The view id does not name a registered view.
    #[error("unknown view: {0}")]
    UnknownView(ViewId),

    /// The unified node does not exist (or is the synthetic root).
    #[error("unknown unified node: {0}")]
    UnknownNode(UnifiedId),
}

/// Convenience alias for alignment results.
pub type AlignResult<T> = Result<T, AlignError>;
