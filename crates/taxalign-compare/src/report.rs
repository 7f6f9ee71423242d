//! Report types consumed by the tabular presentation layer.

use serde::{Deserialize, Serialize};

use taxalign_types::{Rank, SourceId, TaxonKey, UnifiedId};

/// The exclusive comparison category of a unified node, relative to the
/// chosen sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Mapped in every chosen source, with one agreed placement.
    Common,
    /// The node's taxon is placed differently by different chosen sources.
    Difference,
    /// Mapped in some chosen sources but not all, with no competing
    /// placement.
    Missing,
}

/// Which higher taxon each chosen source assigns a taxon under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    /// The assigning source.
    pub source: SourceId,
    /// Parent literals this source uses for the taxon, deduplicated and
    /// sorted. Empty when the source roots the taxon.
    pub parents: Vec<String>,
}

/// One row of the assignment table: a taxon key and its per-source parents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRow {
    /// The taxon's identity key.
    pub key: TaxonKey,
    /// Canonical literal.
    pub literal: String,
    /// Rank.
    pub rank: Rank,
    /// The unified nodes carrying this key, in traversal order.
    pub nodes: Vec<UnifiedId>,
    /// Per-source parent assignments, in source-id order.
    pub entries: Vec<AssignmentEntry>,
    /// `true` when two chosen sources assign the taxon differently.
    pub inconsistent: bool,
}

/// The full classification of the unified tree against a chosen subset of
/// sources.
///
/// Node lists follow unified preorder. Every unified node with at least one
/// chosen mapping appears in exactly one of `commons`, `differences`,
/// `missing`; synonym groups and assignment rows are overlays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// The sources compared, in id order.
    pub chosen: Vec<SourceId>,
    /// Nodes every chosen source agrees on.
    pub commons: Vec<UnifiedId>,
    /// Nodes involved in a placement disagreement.
    pub differences: Vec<UnifiedId>,
    /// Nodes absent from at least one chosen source.
    pub missing: Vec<UnifiedId>,
    /// Groups of distinct unified nodes linked by the synonym relation.
    pub synonym_groups: Vec<Vec<UnifiedId>>,
    /// Per-taxon assignment table.
    pub assignments: Vec<AssignmentRow>,
}

impl ComparisonReport {
    /// The exclusive category of `node`, if it was classified.
    pub fn category_of(&self, node: UnifiedId) -> Option<Category> {
        if self.commons.contains(&node) {
            Some(Category::Common)
        } else if self.differences.contains(&node) {
            Some(Category::Difference)
        } else if self.missing.contains(&node) {
            Some(Category::Missing)
        } else {
            None
        }
    }

    /// Number of classified nodes across the three exclusive categories.
    pub fn classified_len(&self) -> usize {
        self.commons.len() + self.differences.len() + self.missing.len()
    }

    /// The assignment row for a key, if present.
    pub fn assignment(&self, key: &TaxonKey) -> Option<&AssignmentRow> {
        self.assignments.iter().find(|row| row.key == *key)
    }

    /// Rows flagged inconsistent.
    pub fn inconsistent_assignments(&self) -> impl Iterator<Item = &AssignmentRow> {
        self.assignments.iter().filter(|row| row.inconsistent)
    }
}
