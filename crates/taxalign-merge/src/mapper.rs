//! Bidirectional mapping between unified and source nodes.
//!
//! The forward direction (`(source, source node) -> unified`) lives in a
//! hash table here; the reverse direction lives on each [`UnifiedNode`]'s
//! mapping list. Both are written together through [`NodeMapper::map`] /
//! [`NodeMapper::unmap`], which keeps them consistent.
//!
//! [`UnifiedNode`]: crate::unified::UnifiedNode

use std::collections::HashMap;

use taxalign_types::{PathMatch, SourceId, SourceNodeId, UnifiedId};

use crate::error::{MergeError, MergeResult};
use crate::unified::{Mapping, UnifiedTree};

/// The bidirectional node mapping table.
#[derive(Clone, Debug, Default)]
pub struct NodeMapper {
    forward: HashMap<(SourceId, SourceNodeId), UnifiedId>,
}

impl NodeMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapping entries.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` if no mappings exist.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Record `(source, node) <-> unified`.
    ///
    /// Fails if either side already has an entry: a source node maps to at
    /// most one unified node, and a unified node carries at most one mapping
    /// per source.
    pub fn map(
        &mut self,
        tree: &mut UnifiedTree,
        source: SourceId,
        node: SourceNodeId,
        unified: UnifiedId,
    ) -> MergeResult<()> {
        if self.forward.contains_key(&(source, node)) {
            return Err(MergeError::MappingConflict { unified, source_id: source });
        }
        let target = tree
            .get_mut(unified)
            .ok_or(MergeError::NodeNotFound(unified))?;
        if target.is_mapped_in(source) {
            return Err(MergeError::MappingConflict { unified, source_id: source });
        }
        target.mappings.push(Mapping { source, node });
        self.forward.insert((source, node), unified);
        Ok(())
    }

    /// Remove the entry for `(source, node)`, returning the unified side.
    pub fn unmap(
        &mut self,
        tree: &mut UnifiedTree,
        source: SourceId,
        node: SourceNodeId,
    ) -> Option<UnifiedId> {
        let unified = self.forward.remove(&(source, node))?;
        if let Some(target) = tree.get_mut(unified) {
            target
                .mappings
                .retain(|m| !(m.source == source && m.node == node));
        }
        Some(unified)
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    /// The unified counterpart of a source node.
    pub fn counterpart(&self, source: SourceId, node: SourceNodeId) -> Option<UnifiedId> {
        self.forward.get(&(source, node)).copied()
    }

    /// The source-side counterpart of a unified node in `source`.
    pub fn source_counterpart(
        &self,
        tree: &UnifiedTree,
        unified: UnifiedId,
        source: SourceId,
    ) -> Option<SourceNodeId> {
        tree.get(unified)?.mapping_for(source)
    }

    // ---------------------------------------------------------------
    // Path translation
    // ---------------------------------------------------------------

    /// Translate a unified path (root first) into `target`'s space.
    ///
    /// Walks hop by hop and stops at the first unmapped node, returning the
    /// deepest mapped prefix and whether the whole path translated. Empty
    /// input, or a path whose first hop is unmapped, yields `None`.
    pub fn translate_to_source(
        &self,
        tree: &UnifiedTree,
        path: &[UnifiedId],
        target: SourceId,
    ) -> Option<PathMatch<SourceNodeId>> {
        let mut mapped = Vec::with_capacity(path.len());
        for &hop in path {
            match tree.get(hop).and_then(|n| n.mapping_for(target)) {
                Some(node) => mapped.push(node),
                None => break,
            }
        }
        if mapped.is_empty() {
            return None;
        }
        let exact = mapped.len() == path.len();
        Some(PathMatch::new(mapped, exact))
    }

    /// Translate a source path (root first) into unified space.
    pub fn translate_to_unified(
        &self,
        source: SourceId,
        path: &[SourceNodeId],
    ) -> Option<PathMatch<UnifiedId>> {
        let mut mapped = Vec::with_capacity(path.len());
        for &hop in path {
            match self.counterpart(source, hop) {
                Some(unified) => mapped.push(unified),
                None => break,
            }
        }
        if mapped.is_empty() {
            return None;
        }
        let exact = mapped.len() == path.len();
        Some(PathMatch::new(mapped, exact))
    }

    /// Translate a path from one source's space into another's, via the
    /// unified tree.
    pub fn translate_between(
        &self,
        tree: &UnifiedTree,
        from: SourceId,
        path: &[SourceNodeId],
        to: SourceId,
    ) -> Option<PathMatch<SourceNodeId>> {
        let up = self.translate_to_unified(from, path)?;
        let down = self.translate_to_source(tree, &up.path, to)?;
        let exact = up.exact && down.exact;
        Some(PathMatch::new(down.path, exact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxalign_types::{Rank, TaxonKey};

    fn sid(n: usize) -> SourceId {
        SourceId::from_index(n)
    }

    fn snid(n: usize) -> SourceNodeId {
        SourceNodeId::from_index(n)
    }

    /// Unified chain Felis -> catus mapped for the given sources.
    fn chain(sources: &[SourceId]) -> (UnifiedTree, NodeMapper, UnifiedId, UnifiedId) {
        let mut tree = UnifiedTree::new();
        let root = tree.root_id();
        let felis = tree.alloc(
            TaxonKey::derive("felis", Rank::Genus),
            "Felis",
            Rank::Genus,
            root,
        );
        let catus = tree.alloc(
            TaxonKey::derive("felis catus", Rank::Species),
            "Felis catus",
            Rank::Species,
            felis,
        );
        let mut mapper = NodeMapper::new();
        for &s in sources {
            mapper.map(&mut tree, s, snid(0), felis).unwrap();
            mapper.map(&mut tree, s, snid(1), catus).unwrap();
        }
        (tree, mapper, felis, catus)
    }

    #[test]
    fn map_and_counterpart() {
        let (tree, mapper, felis, _) = chain(&[sid(0)]);
        assert_eq!(mapper.counterpart(sid(0), snid(0)), Some(felis));
        assert_eq!(
            mapper.source_counterpart(&tree, felis, sid(0)),
            Some(snid(0))
        );
    }

    #[test]
    fn duplicate_source_node_conflicts() {
        let (mut tree, mut mapper, felis, catus) = chain(&[sid(0)]);
        // snid(0) is already mapped to felis; remapping it anywhere fails.
        let err = mapper.map(&mut tree, sid(0), snid(0), catus).unwrap_err();
        assert!(matches!(err, MergeError::MappingConflict { .. }));
        let _ = felis;
    }

    #[test]
    fn second_mapping_for_same_source_conflicts() {
        let (mut tree, mut mapper, felis, _) = chain(&[sid(0)]);
        let err = mapper.map(&mut tree, sid(0), snid(9), felis).unwrap_err();
        assert!(matches!(err, MergeError::MappingConflict { .. }));
    }

    #[test]
    fn map_to_dead_node_fails() {
        let mut tree = UnifiedTree::new();
        let mut mapper = NodeMapper::new();
        let err = mapper
            .map(&mut tree, sid(0), snid(0), UnifiedId::from_index(99))
            .unwrap_err();
        assert!(matches!(err, MergeError::NodeNotFound(_)));
    }

    #[test]
    fn unmap_clears_both_sides() {
        let (mut tree, mut mapper, felis, _) = chain(&[sid(0)]);
        assert_eq!(mapper.unmap(&mut tree, sid(0), snid(0)), Some(felis));
        assert_eq!(mapper.counterpart(sid(0), snid(0)), None);
        assert!(tree.get(felis).unwrap().mappings.is_empty());
        // A second unmap finds nothing.
        assert_eq!(mapper.unmap(&mut tree, sid(0), snid(0)), None);
    }

    #[test]
    fn translate_exact_roundtrip() {
        let (tree, mapper, felis, catus) = chain(&[sid(0), sid(1)]);
        let down = mapper
            .translate_to_source(&tree, &[felis, catus], sid(1))
            .unwrap();
        assert!(down.exact);
        assert_eq!(down.path, vec![snid(0), snid(1)]);

        let up = mapper.translate_to_unified(sid(1), &down.path).unwrap();
        assert!(up.exact);
        assert_eq!(up.path, vec![felis, catus]);
    }

    #[test]
    fn translate_stops_at_first_unmapped_hop() {
        let (mut tree, mut mapper, felis, catus) = chain(&[sid(0), sid(1)]);
        // Source 1 loses its catus mapping; only felis remains reachable.
        mapper.unmap(&mut tree, sid(1), snid(1));
        let m = mapper
            .translate_to_source(&tree, &[felis, catus], sid(1))
            .unwrap();
        assert!(!m.exact);
        assert_eq!(m.path, vec![snid(0)]);
    }

    #[test]
    fn translate_empty_path_is_no_result() {
        let (tree, mapper, ..) = chain(&[sid(0)]);
        assert!(mapper.translate_to_source(&tree, &[], sid(0)).is_none());
        assert!(mapper.translate_to_unified(sid(0), &[]).is_none());
    }

    #[test]
    fn translate_fully_unmapped_is_no_result() {
        let (tree, mapper, felis, catus) = chain(&[sid(0)]);
        assert!(mapper
            .translate_to_source(&tree, &[felis, catus], sid(7))
            .is_none());
    }

    #[test]
    fn translate_between_sources() {
        let (tree, mapper, ..) = chain(&[sid(0), sid(1)]);
        let m = mapper
            .translate_between(&tree, sid(0), &[snid(0), snid(1)], sid(1))
            .unwrap();
        assert!(m.exact);
        assert_eq!(m.path, vec![snid(0), snid(1)]);
    }
}
