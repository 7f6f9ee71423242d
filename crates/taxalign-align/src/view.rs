//! Per-view state: scope, expansion, projected selection, and row caches.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use taxalign_merge::MergeEngine;
use taxalign_types::{SourceId, UnifiedId, ViewId};

/// What a view renders: the whole unified tree, or one source's slice of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewScope {
    /// The unified tree itself.
    Unified,
    /// Only the unified nodes mapped in one source, in that source's child
    /// order.
    Source(SourceId),
}

impl ViewScope {
    /// Returns `true` if `node` appears in a view of this scope.
    pub fn contains(&self, engine: &MergeEngine, node: UnifiedId) -> bool {
        let Some(record) = engine.unified().get(node) else {
            return false;
        };
        if record.is_root() {
            return false;
        }
        match self {
            ViewScope::Unified => true,
            ViewScope::Source(source) => record.is_mapped_in(*source),
        }
    }
}

/// An alignment target computed for one view: the node to operate on and
/// whether it is the exact counterpart or an ancestor fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aligned {
    /// The node to operate on in the target view.
    pub node: UnifiedId,
    /// `false` when the triggering node had no counterpart and the nearest
    /// mapped ancestor was substituted.
    pub exact: bool,
}

/// Live state of one registered view.
///
/// All coordinates are unified-space ids; translation to source-space paths
/// for painting goes through the engine's [`NodeMapper`]. The visible-row
/// cache is stamped with the engine revision and rebuilt lazily after any
/// structural or expansion change.
///
/// This is the single implementation of the alignment capability
/// ([`compute_alignment`], [`is_collapsible`]); no rendering-toolkit
/// subclassing is involved.
///
/// [`NodeMapper`]: taxalign_merge::NodeMapper
/// [`compute_alignment`]: TreeViewState::compute_alignment
/// [`is_collapsible`]: TreeViewState::is_collapsible
#[derive(Debug)]
pub struct TreeViewState {
    id: ViewId,
    scope: ViewScope,
    expanded: HashSet<UnifiedId>,
    selected: Vec<UnifiedId>,
    anchor: Option<UnifiedId>,
    lead: Option<UnifiedId>,
    rows: Vec<UnifiedId>,
    rows_revision: Option<u64>,
}

impl TreeViewState {
    /// Create a view with everything collapsed and nothing selected.
    pub fn new(id: ViewId, scope: ViewScope) -> Self {
        Self {
            id,
            scope,
            expanded: HashSet::new(),
            selected: Vec::new(),
            anchor: None,
            lead: None,
            rows: Vec::new(),
            rows_revision: None,
        }
    }

    /// This view's id.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// This view's scope.
    pub fn scope(&self) -> ViewScope {
        self.scope
    }

    // ---------------------------------------------------------------
    // Scope queries
    // ---------------------------------------------------------------

    /// Returns `true` if `node` appears in this view.
    pub fn contains(&self, engine: &MergeEngine, node: UnifiedId) -> bool {
        self.scope.contains(engine, node)
    }

    /// The view's top-level nodes, in render order.
    pub fn top_nodes(&self, engine: &MergeEngine) -> Vec<UnifiedId> {
        match self.scope {
            ViewScope::Unified => engine.unified().children(engine.unified().root_id()).to_vec(),
            ViewScope::Source(source) => {
                let Some(tree) = engine.source(source) else {
                    return Vec::new();
                };
                let Ok(root) = tree.root() else {
                    return Vec::new();
                };
                engine
                    .mapper()
                    .counterpart(source, root)
                    .into_iter()
                    .collect()
            }
        }
    }

    /// Children of `node` visible in this view, in render order.
    ///
    /// For a source-scoped view, render order is the source tree's child
    /// order, not unified creation order.
    pub fn children_in_scope(&self, engine: &MergeEngine, node: UnifiedId) -> Vec<UnifiedId> {
        match self.scope {
            ViewScope::Unified => engine.unified().children(node).to_vec(),
            ViewScope::Source(source) => {
                let Some(mapped) = engine
                    .mapper()
                    .source_counterpart(engine.unified(), node, source)
                else {
                    return Vec::new();
                };
                let Some(tree) = engine.source(source) else {
                    return Vec::new();
                };
                tree.children(mapped)
                    .iter()
                    .filter_map(|&child| engine.mapper().counterpart(source, child))
                    .collect()
            }
        }
    }

    /// Returns `true` if `node` has no visible children here.
    pub fn is_leaf(&self, engine: &MergeEngine, node: UnifiedId) -> bool {
        self.children_in_scope(engine, node).is_empty()
    }

    // ---------------------------------------------------------------
    // Expansion
    // ---------------------------------------------------------------

    /// Returns `true` if `node` is expanded.
    pub fn is_expanded(&self, node: UnifiedId) -> bool {
        self.expanded.contains(&node)
    }

    /// Expand `node` and every ancestor so it is visible and open.
    /// Returns `true` if any state changed.
    pub fn expand_to(&mut self, engine: &MergeEngine, node: UnifiedId) -> bool {
        let mut changed = false;
        for hop in engine.unified().path_to(node) {
            changed |= self.expanded.insert(hop);
        }
        if changed {
            self.rows_revision = None;
        }
        changed
    }

    /// Collapse `node`. Descendant expansion state is retained, as a tree
    /// widget would. Returns `true` if state changed.
    pub fn collapse(&mut self, node: UnifiedId) -> bool {
        let changed = self.expanded.remove(&node);
        if changed {
            self.rows_revision = None;
        }
        changed
    }

    // ---------------------------------------------------------------
    // Alignment capability
    // ---------------------------------------------------------------

    /// The node this view should operate on when `node` is triggered
    /// elsewhere: the exact counterpart if it appears here, otherwise the
    /// deepest visible ancestor. `None` when nothing on the path appears.
    pub fn compute_alignment(&self, engine: &MergeEngine, node: UnifiedId) -> Option<Aligned> {
        let path = engine.unified().path_to(node);
        for &hop in path.iter().rev() {
            if self.contains(engine, hop) {
                return Some(Aligned {
                    node: hop,
                    exact: hop == node,
                });
            }
        }
        None
    }

    /// Collapse safety: `node` may be collapsed here only when this view's
    /// children of `node` and the triggering view's cover each other:
    /// every child the trigger showed appears here, and this view shows
    /// nothing under `node` that the trigger did not. Collapsing must never
    /// hide information unique to a view that was not present at the source
    /// of the request.
    pub fn is_collapsible(
        &self,
        engine: &MergeEngine,
        node: UnifiedId,
        origin_scope: ViewScope,
        origin_children: &[UnifiedId],
    ) -> bool {
        origin_children.iter().all(|&c| self.contains(engine, c))
            && self
                .children_in_scope(engine, node)
                .iter()
                .all(|&c| origin_scope.contains(engine, c))
    }

    // ---------------------------------------------------------------
    // Rows
    // ---------------------------------------------------------------

    /// The visible rows of this view, top to bottom.
    ///
    /// Rebuilds the cache when the engine revision or local expansion state
    /// has moved since the last call.
    pub fn visible_rows(&mut self, engine: &MergeEngine) -> &[UnifiedId] {
        if self.rows_revision != Some(engine.revision()) {
            self.rebuild_rows(engine);
        }
        &self.rows
    }

    fn rebuild_rows(&mut self, engine: &MergeEngine) {
        let mut rows = Vec::new();
        let mut stack: Vec<UnifiedId> = self.top_nodes(engine).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            rows.push(node);
            if self.expanded.contains(&node) {
                for child in self.children_in_scope(engine, node).into_iter().rev() {
                    stack.push(child);
                }
            }
        }
        self.rows = rows;
        self.rows_revision = Some(engine.revision());
    }

    /// The node rendered at `row`, if in range.
    pub fn node_at_row(&mut self, engine: &MergeEngine, row: usize) -> Option<UnifiedId> {
        self.visible_rows(engine).get(row).copied()
    }

    /// The row currently rendering `node`, if visible.
    pub fn row_of_node(&mut self, engine: &MergeEngine, node: UnifiedId) -> Option<usize> {
        self.visible_rows(engine).iter().position(|&n| n == node)
    }

    // ---------------------------------------------------------------
    // Projected selection
    // ---------------------------------------------------------------

    /// The nodes this view reports selected, in selection order.
    pub fn selected(&self) -> &[UnifiedId] {
        &self.selected
    }

    /// Returns `true` if this view reports `node` selected.
    pub fn is_selected(&self, node: UnifiedId) -> bool {
        self.selected.contains(&node)
    }

    /// The view's range-selection anchor, if it appears in this view.
    pub fn anchor(&self) -> Option<UnifiedId> {
        self.anchor
    }

    /// The view's range-selection lead, if it appears in this view.
    pub fn lead(&self) -> Option<UnifiedId> {
        self.lead
    }

    /// Apply a selection delta, keeping only nodes in scope.
    pub(crate) fn apply_selection_delta(
        &mut self,
        engine: &MergeEngine,
        added: &[UnifiedId],
        removed: &[UnifiedId],
    ) {
        if !removed.is_empty() {
            self.selected.retain(|n| !removed.contains(n));
        }
        for &node in added {
            if self.contains(engine, node) && !self.selected.contains(&node) {
                self.selected.push(node);
            }
        }
    }

    pub(crate) fn set_anchor_lead(
        &mut self,
        engine: &MergeEngine,
        anchor: Option<UnifiedId>,
        lead: Option<UnifiedId>,
    ) {
        self.anchor = anchor.filter(|&n| self.contains(engine, n));
        self.lead = lead.filter(|&n| self.contains(engine, n));
    }

    // ---------------------------------------------------------------
    // Invalidation
    // ---------------------------------------------------------------

    /// Drop state referring to nodes that no longer exist.
    ///
    /// Called by the session after a source removal pruned unified nodes.
    pub fn purge(&mut self, dead: &[UnifiedId]) {
        let before = self.expanded.len() + self.selected.len();
        self.expanded.retain(|n| !dead.contains(n));
        self.selected.retain(|n| !dead.contains(n));
        if self.anchor.is_some_and(|n| dead.contains(&n)) {
            self.anchor = None;
        }
        if self.lead.is_some_and(|n| dead.contains(&n)) {
            self.lead = None;
        }
        if before != self.expanded.len() + self.selected.len() {
            self.rows_revision = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taxalign_model::SourceTree;
    use taxalign_types::Rank;

    /// A = Felis -> {catus, silvestris}; B = Felis -> catus.
    fn engine_ab() -> (MergeEngine, SourceId, SourceId) {
        let mut a = SourceTree::with_root("A", "Felis", Rank::Genus).unwrap();
        let root = a.root().unwrap();
        a.add_child(root, "Felis catus", Rank::Species).unwrap();
        a.add_child(root, "Felis silvestris", Rank::Species).unwrap();

        let mut b = SourceTree::with_root("B", "Felis", Rank::Genus).unwrap();
        let root = b.root().unwrap();
        b.add_child(root, "Felis catus", Rank::Species).unwrap();

        let mut engine = MergeEngine::new();
        let a = engine.add_tree(Arc::new(a)).unwrap().source;
        let b = engine.add_tree(Arc::new(b)).unwrap().source;
        (engine, a, b)
    }

    fn node(engine: &MergeEngine, literal: &str) -> UnifiedId {
        engine.nodes_for_literal(literal, None)[0]
    }

    #[test]
    fn scope_filters_membership() {
        let (engine, _a, b) = engine_ab();
        let view = TreeViewState::new(ViewId::from_index(0), ViewScope::Source(b));
        assert!(view.contains(&engine, node(&engine, "felis")));
        assert!(view.contains(&engine, node(&engine, "felis catus")));
        assert!(!view.contains(&engine, node(&engine, "felis silvestris")));
    }

    #[test]
    fn unified_scope_sees_everything() {
        let (engine, ..) = engine_ab();
        let view = TreeViewState::new(ViewId::from_index(0), ViewScope::Unified);
        assert!(view.contains(&engine, node(&engine, "felis silvestris")));
        assert!(!view.contains(&engine, engine.unified().root_id()));
    }

    #[test]
    fn rows_follow_expansion() {
        let (engine, a, _b) = engine_ab();
        let mut view = TreeViewState::new(ViewId::from_index(0), ViewScope::Source(a));
        let felis = node(&engine, "felis");

        assert_eq!(view.visible_rows(&engine), &[felis]);
        view.expand_to(&engine, felis);
        let rows = view.visible_rows(&engine).to_vec();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], felis);
        assert_eq!(view.row_of_node(&engine, node(&engine, "felis catus")), Some(1));
    }

    #[test]
    fn source_view_omits_unmapped_children() {
        let (engine, _a, b) = engine_ab();
        let mut view = TreeViewState::new(ViewId::from_index(0), ViewScope::Source(b));
        let felis = node(&engine, "felis");
        view.expand_to(&engine, felis);
        // B has no silvestris: two rows only.
        assert_eq!(view.visible_rows(&engine).len(), 2);
    }

    #[test]
    fn node_at_row_miss_is_none() {
        let (engine, a, _b) = engine_ab();
        let mut view = TreeViewState::new(ViewId::from_index(0), ViewScope::Source(a));
        assert_eq!(view.node_at_row(&engine, 99), None);
    }

    #[test]
    fn compute_alignment_exact_and_fallback() {
        let (engine, _a, b) = engine_ab();
        let view = TreeViewState::new(ViewId::from_index(1), ViewScope::Source(b));

        let catus = node(&engine, "felis catus");
        let exact = view.compute_alignment(&engine, catus).unwrap();
        assert!(exact.exact);
        assert_eq!(exact.node, catus);

        // silvestris is absent in B: fall back to Felis.
        let silvestris = node(&engine, "felis silvestris");
        let fallback = view.compute_alignment(&engine, silvestris).unwrap();
        assert!(!fallback.exact);
        assert_eq!(fallback.node, node(&engine, "felis"));
    }

    #[test]
    fn collapsibility_requires_mutual_child_cover() {
        let (engine, a, b) = engine_ab();
        let view_a = TreeViewState::new(ViewId::from_index(0), ViewScope::Source(a));
        let view_b = TreeViewState::new(ViewId::from_index(1), ViewScope::Source(b));
        let felis = node(&engine, "felis");

        let a_children = view_a.children_in_scope(&engine, felis);
        let b_children = view_b.children_in_scope(&engine, felis);

        // Collapsing A on B's behalf would hide silvestris, which B never
        // showed.
        assert!(!view_a.is_collapsible(&engine, felis, ViewScope::Source(b), &b_children));
        // Collapsing B on A's behalf: silvestris has no counterpart in B.
        assert!(!view_b.is_collapsible(&engine, felis, ViewScope::Source(a), &a_children));
        // A view aligned with itself always covers.
        assert!(view_b.is_collapsible(&engine, felis, ViewScope::Source(b), &b_children));
    }

    #[test]
    fn purge_drops_dead_state() {
        let (engine, a, _b) = engine_ab();
        let mut view = TreeViewState::new(ViewId::from_index(0), ViewScope::Source(a));
        let felis = node(&engine, "felis");
        let catus = node(&engine, "felis catus");
        view.expand_to(&engine, felis);
        view.apply_selection_delta(&engine, &[catus], &[]);

        view.purge(&[catus]);
        assert!(!view.is_selected(catus));
        assert!(view.is_expanded(felis));
    }
}
