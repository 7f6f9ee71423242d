//! Foundation types for taxalign.
//!
//! This crate provides the identity and vocabulary types used throughout the
//! alignment engine. Every other taxalign crate depends on `taxalign-types`.
//!
//! # Key Types
//!
//! - [`TaxonKey`] -- Taxon identity derived from a normalized name literal
//!   and rank (BLAKE3 hash)
//! - [`KeyPolicy`] -- Normalization configuration governing key derivation
//! - [`Rank`] -- Ordered taxonomic rank enum
//! - [`SourceId`], [`SourceNodeId`], [`UnifiedId`], [`ViewId`] -- Arena and
//!   session identifiers
//! - [`PathMatch`] -- Result of a cross-hierarchy path translation

pub mod error;
pub mod ids;
pub mod key;
pub mod path;
pub mod rank;

pub use error::TypeError;
pub use ids::{SourceId, SourceNodeId, UnifiedId, ViewId};
pub use key::{KeyPolicy, TaxonKey};
pub use path::PathMatch;
pub use rank::Rank;
