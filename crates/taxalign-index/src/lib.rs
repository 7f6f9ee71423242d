//! Literal index for taxalign.
//!
//! Maps normalized name literals and [`TaxonKey`]s to node identifiers over
//! one node space (unified or source). Each index instance is owned by, and
//! constructed alongside, its engine session; there is no process-global
//! lookup table.
//!
//! Lookup misses are an ordinary outcome and return empty slices, so this
//! crate defines no error type.
//!
//! [`TaxonKey`]: taxalign_types::TaxonKey

pub mod index;

pub use index::LiteralIndex;
