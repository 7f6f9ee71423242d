//! Error type for the session API.

use taxalign_align::AlignError;
use taxalign_compare::CompareError;
use taxalign_merge::MergeError;
use taxalign_types::ViewId;

/// Errors surfaced by [`ComparisonSession`] operations.
///
/// [`ComparisonSession`]: crate::session::ComparisonSession
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// A merge-layer failure.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// An alignment or selection failure.
    #[error("alignment error: {0}")]
    Align(#[from] AlignError),

    /// A classification failure.
    #[error("comparison error: {0}")]
    Compare(#[from] CompareError),

    /// The view id does not name a registered view.
    #[error("unknown view: {0}")]
    UnknownView(ViewId),
}

/// Convenience alias for session results.
pub type SdkResult<T> = Result<T, SdkError>;
