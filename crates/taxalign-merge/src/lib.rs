//! Merge engine for taxalign.
//!
//! Builds and maintains the unified tree: the single structure produced by
//! aligning N source hierarchies on taxon identity. The [`MergeEngine`]
//! merges incrementally on [`add_tree`], reverses the merge on
//! [`remove_tree`], keeps a bidirectional [`NodeMapper`] between unified and
//! source nodes, and publishes [`MergeEvent`]s to subscribers on every
//! structural change.
//!
//! Identity is lineage-scoped: a `(literal, rank)` key matches only among
//! children of the same merged parent, so unrelated taxa that happen to share
//! a name never conflate. Placement disagreements between sources surface as
//! distinct unified nodes and are reported by the classifier, not treated as
//! errors.
//!
//! [`add_tree`]: MergeEngine::add_tree
//! [`remove_tree`]: MergeEngine::remove_tree

pub mod engine;
pub mod error;
pub mod event;
pub mod mapper;
pub mod unified;

pub use engine::{MergeEngine, MergeOutcome, MergeSnapshot, NodeSnapshot};
pub use error::{MergeError, MergeResult};
pub use event::{EventFilter, MergeEvent, MergeEventKind};
pub use mapper::NodeMapper;
pub use unified::{Mapping, UnifiedNode, UnifiedTree};
