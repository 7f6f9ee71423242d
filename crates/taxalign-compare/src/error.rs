//! Error types for comparison classification.

use taxalign_types::SourceId;

/// Errors raised by classification requests.
///
/// Structural disagreement between sources is never an error; it is what
/// the Difference category reports. These variants cover caller misuse.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// A chosen source id does not name a registered tree.
    #[error("unknown source: {0}")]
    UnknownSource(SourceId),

    /// No sources were chosen.
    #[error("no sources chosen for comparison")]
    EmptySelection,
}

/// Convenience alias for comparison results.
pub type CompareResult<T> = Result<T, CompareError>;
