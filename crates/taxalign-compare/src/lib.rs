//! Comparison classifier for taxalign.
//!
//! Partitions the unified tree, relative to a chosen subset of registered
//! sources, into the categories a comparison table reports: taxa every
//! chosen source agrees on, taxa placed differently by different sources,
//! and taxa some sources lack. Synonym groups and per-taxon assignment
//! rows are computed as non-exclusive overlays.
//!
//! Classification is a pure function of the current merge state: nothing
//! here caches or listens; callers re-run [`classify`] after structural
//! change notifications, and running it twice without an intervening change
//! yields the same report.

pub mod classify;
pub mod error;
pub mod report;
pub mod synonym;

pub use classify::classify;
pub use error::{CompareError, CompareResult};
pub use report::{AssignmentEntry, AssignmentRow, Category, ComparisonReport};
