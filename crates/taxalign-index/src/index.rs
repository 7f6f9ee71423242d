//! The in-memory literal index.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use taxalign_types::TaxonKey;

/// Index from normalized literals and identity keys to node ids.
///
/// Generic over the id type so the same structure serves unified-space and
/// source-space lookups. Buckets preserve insertion order, which keeps
/// lookup results deterministic across runs.
///
/// The caller is responsible for normalizing literals consistently (the
/// merge engine routes everything through its [`KeyPolicy`]); the index
/// stores what it is given.
///
/// [`KeyPolicy`]: taxalign_types::KeyPolicy
#[derive(Clone, Debug, Default)]
pub struct LiteralIndex<I> {
    by_literal: HashMap<String, Vec<I>>,
    by_key: HashMap<TaxonKey, Vec<I>>,
}

impl<I: Copy + Eq + Hash> LiteralIndex<I> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            by_literal: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    /// Number of distinct keys indexed.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Record `id` under a normalized literal and its key.
    ///
    /// Inserting the same `(key, id)` pair twice is a no-op.
    pub fn insert(&mut self, literal_norm: &str, key: TaxonKey, id: I) {
        let bucket = self.by_key.entry(key).or_default();
        if bucket.contains(&id) {
            return;
        }
        bucket.push(id);
        self.by_literal
            .entry(literal_norm.to_string())
            .or_default()
            .push(id);
        trace!(literal = literal_norm, key = %key, "indexed node");
    }

    /// Drop `id` from a literal/key pair. Unindexed pairs are ignored.
    pub fn remove(&mut self, literal_norm: &str, key: TaxonKey, id: I) {
        if let Some(bucket) = self.by_key.get_mut(&key) {
            bucket.retain(|x| *x != id);
            if bucket.is_empty() {
                self.by_key.remove(&key);
            }
        }
        if let Some(bucket) = self.by_literal.get_mut(literal_norm) {
            bucket.retain(|x| *x != id);
            if bucket.is_empty() {
                self.by_literal.remove(literal_norm);
            }
        }
        trace!(literal = literal_norm, key = %key, "unindexed node");
    }

    /// All ids recorded under a normalized literal, any rank.
    pub fn ids_for_literal(&self, literal_norm: &str) -> &[I] {
        self.by_literal
            .get(literal_norm)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All ids recorded under an identity key.
    pub fn ids_for_key(&self, key: &TaxonKey) -> &[I] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.by_literal.clear();
        self.by_key.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxalign_types::Rank;

    fn key(literal: &str, rank: Rank) -> TaxonKey {
        TaxonKey::derive(literal, rank)
    }

    #[test]
    fn insert_and_lookup() {
        let mut idx: LiteralIndex<u32> = LiteralIndex::new();
        idx.insert("felis", key("felis", Rank::Genus), 1);
        assert_eq!(idx.ids_for_literal("felis"), &[1]);
        assert_eq!(idx.ids_for_key(&key("felis", Rank::Genus)), &[1]);
    }

    #[test]
    fn miss_returns_empty() {
        let idx: LiteralIndex<u32> = LiteralIndex::new();
        assert!(idx.ids_for_literal("nope").is_empty());
        assert!(idx.ids_for_key(&key("nope", Rank::Genus)).is_empty());
    }

    #[test]
    fn same_literal_different_ranks_share_literal_bucket() {
        let mut idx: LiteralIndex<u32> = LiteralIndex::new();
        idx.insert("aotus", key("aotus", Rank::Genus), 1);
        idx.insert("aotus", key("aotus", Rank::Subgenus), 2);
        assert_eq!(idx.ids_for_literal("aotus"), &[1, 2]);
        assert_eq!(idx.ids_for_key(&key("aotus", Rank::Genus)), &[1]);
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut idx: LiteralIndex<u32> = LiteralIndex::new();
        let k = key("felis", Rank::Genus);
        idx.insert("felis", k, 1);
        idx.insert("felis", k, 1);
        assert_eq!(idx.ids_for_literal("felis"), &[1]);
    }

    #[test]
    fn remove_drops_empty_buckets() {
        let mut idx: LiteralIndex<u32> = LiteralIndex::new();
        let k = key("felis", Rank::Genus);
        idx.insert("felis", k, 1);
        idx.remove("felis", k, 1);
        assert!(idx.is_empty());
        assert!(idx.ids_for_literal("felis").is_empty());
    }

    #[test]
    fn remove_keeps_other_ids() {
        let mut idx: LiteralIndex<u32> = LiteralIndex::new();
        let k = key("felis", Rank::Genus);
        idx.insert("felis", k, 1);
        idx.insert("felis", k, 2);
        idx.remove("felis", k, 1);
        assert_eq!(idx.ids_for_key(&k), &[2]);
    }

    #[test]
    fn buckets_preserve_insertion_order() {
        let mut idx: LiteralIndex<u32> = LiteralIndex::new();
        let k = key("felis", Rank::Genus);
        idx.insert("felis", k, 3);
        idx.insert("felis", k, 1);
        idx.insert("felis", k, 2);
        assert_eq!(idx.ids_for_key(&k), &[3, 1, 2]);
    }
}
