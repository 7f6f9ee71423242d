//! Error types for taxalign vocabulary parsing and decoding.

/// Errors raised while parsing or decoding vocabulary types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A decoded byte string had the wrong length.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// A rank name did not match any known rank.
    #[error("unknown rank: {0:?}")]
    UnknownRank(String),
}
