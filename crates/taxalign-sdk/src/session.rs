//! The comparison session facade.

use std::sync::{mpsc, Arc};

use tracing::debug;

use taxalign_align::{
    AlignOutcome, AlignReport, AlignmentController, PropagationContext, SelectionModel,
    SelectionOutcome, SelectionRequest, SelectionSynchronizer, TreeViewState, ViewScope,
};
use taxalign_compare::{classify, ComparisonReport};
use taxalign_merge::{EventFilter, MergeEngine, MergeEvent};
use taxalign_model::SourceTree;
use taxalign_types::{KeyPolicy, Rank, SourceId, UnifiedId, ViewId};

use crate::error::{SdkError, SdkResult};

/// One multi-hierarchy comparison: an engine, its views, and the state that
/// keeps them in lock-step.
///
/// All operations are synchronous and complete before returning. The caller
/// hands completed source hierarchies in on the controlling thread; fetching
/// them is someone else's asynchronous problem.
pub struct ComparisonSession {
    engine: MergeEngine,
    views: Vec<TreeViewState>,
    next_view: u32,
    alignment: AlignmentController,
    selection: SelectionSynchronizer,
    align_ctx: PropagationContext,
    select_ctx: PropagationContext,
    report_cache: Option<ReportCache>,
}

struct ReportCache {
    chosen: Vec<SourceId>,
    revision: u64,
    report: ComparisonReport,
}

impl ComparisonSession {
    /// Create a session with the default key policy.
    pub fn new() -> Self {
        Self::with_policy(KeyPolicy::default())
    }

    /// Create a session with an explicit normalization policy.
    pub fn with_policy(policy: KeyPolicy) -> Self {
        Self {
            engine: MergeEngine::with_policy(policy),
            views: Vec::new(),
            next_view: 0,
            alignment: AlignmentController::new(),
            selection: SelectionSynchronizer::new(),
            align_ctx: PropagationContext::new(),
            select_ctx: PropagationContext::new(),
            report_cache: None,
        }
    }

    // ---------------------------------------------------------------
    // Sources
    // ---------------------------------------------------------------

    /// Register and merge a source hierarchy.
    pub fn add_source(&mut self, tree: Arc<SourceTree>) -> SdkResult<SourceId> {
        let outcome = self.engine.add_tree(tree)?;
        self.report_cache = None;
        Ok(outcome.source)
    }

    /// Remove a source, pruning unified nodes it alone accounted for and
    /// dropping dead ids from every view and from the selection.
    pub fn remove_source(&mut self, source: SourceId) -> SdkResult<()> {
        let outcome = self.engine.remove_tree(source)?;
        let dead: Vec<UnifiedId> = outcome
            .events
            .iter()
            .filter_map(|e| match e {
                MergeEvent::NodeRemoved { node, .. } => Some(*node),
                _ => None,
            })
            .collect();
        if !dead.is_empty() {
            for view in &mut self.views {
                view.purge(&dead);
            }
            self.selection.model_mut().purge(&dead);
        }
        self.report_cache = None;
        Ok(())
    }

    /// All registered sources as `(id, label)`, in id order.
    pub fn sources(&self) -> Vec<(SourceId, String)> {
        self.engine
            .sources()
            .map(|(id, tree)| (id, tree.label().to_string()))
            .collect()
    }

    // ---------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------

    /// Register a view over the unified tree or one source's slice of it.
    pub fn register_view(&mut self, scope: ViewScope) -> ViewId {
        let id = ViewId::from_index(self.next_view as usize);
        self.next_view += 1;
        self.views.push(TreeViewState::new(id, scope));
        debug!(view = %id, ?scope, "registered view");
        id
    }

    /// Unregister a view. Fails fast on unknown ids.
    pub fn unregister_view(&mut self, view: ViewId) -> SdkResult<()> {
        let idx = self.view_index(view)?;
        self.views.remove(idx);
        Ok(())
    }

    /// A registered view's state.
    pub fn view(&self, view: ViewId) -> Option<&TreeViewState> {
        self.views.iter().find(|v| v.id() == view)
    }

    /// All registered views.
    pub fn views(&self) -> &[TreeViewState] {
        &self.views
    }

    /// The visible rows of a view, top to bottom.
    pub fn visible_rows(&mut self, view: ViewId) -> SdkResult<Vec<UnifiedId>> {
        let idx = self.view_index(view)?;
        Ok(self.views[idx].visible_rows(&self.engine).to_vec())
    }

    /// The node a view renders at `row`, if in range.
    pub fn node_at(&mut self, view: ViewId, row: usize) -> SdkResult<Option<UnifiedId>> {
        let idx = self.view_index(view)?;
        Ok(self.views[idx].node_at_row(&self.engine, row))
    }

    /// The row a view renders `node` at, if visible.
    pub fn row_of(&mut self, view: ViewId, node: UnifiedId) -> SdkResult<Option<usize>> {
        let idx = self.view_index(view)?;
        Ok(self.views[idx].row_of_node(&self.engine, node))
    }

    // ---------------------------------------------------------------
    // Alignment
    // ---------------------------------------------------------------

    /// Expand `node` in `view` and propagate to every other view.
    pub fn expand(&mut self, view: ViewId, node: UnifiedId) -> SdkResult<AlignOutcome> {
        let outcome = self.alignment.request_expand(
            &self.engine,
            &mut self.views,
            view,
            node,
            &mut self.align_ctx,
        )?;
        Ok(outcome)
    }

    /// Expand by row coordinate. Stale rows are a no-op.
    pub fn expand_row(&mut self, view: ViewId, row: usize) -> SdkResult<AlignOutcome> {
        match self.node_at(view, row)? {
            Some(node) => self.expand(view, node),
            None => Ok(AlignOutcome::Applied(AlignReport::default())),
        }
    }

    /// Collapse `node` in `view` and propagate where collapse is safe.
    pub fn collapse(&mut self, view: ViewId, node: UnifiedId) -> SdkResult<AlignOutcome> {
        let outcome = self.alignment.request_collapse(
            &self.engine,
            &mut self.views,
            view,
            node,
            &mut self.align_ctx,
        )?;
        Ok(outcome)
    }

    /// Collapse by row coordinate. Stale rows are a no-op.
    pub fn collapse_row(&mut self, view: ViewId, row: usize) -> SdkResult<AlignOutcome> {
        match self.node_at(view, row)? {
            Some(node) => self.collapse(view, node),
            None => Ok(AlignOutcome::Applied(AlignReport::default())),
        }
    }

    // ---------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------

    /// Apply a selection request originating in `view` and mirror it.
    pub fn select(
        &mut self,
        view: ViewId,
        request: SelectionRequest,
    ) -> SdkResult<SelectionOutcome> {
        let outcome = self.selection.apply(
            &self.engine,
            &mut self.views,
            view,
            request,
            &mut self.select_ctx,
        )?;
        Ok(outcome)
    }

    /// The session-wide selection.
    pub fn selection(&self) -> &SelectionModel {
        self.selection.model()
    }

    // ---------------------------------------------------------------
    // Classification
    // ---------------------------------------------------------------

    /// Classify the unified tree against `chosen`, reusing the cached
    /// report while neither the merge state nor the subset has changed.
    pub fn compare(&mut self, chosen: &[SourceId]) -> SdkResult<&ComparisonReport> {
        let mut wanted: Vec<SourceId> = chosen.to_vec();
        wanted.sort();
        wanted.dedup();

        let fresh = self.report_cache.as_ref().is_some_and(|cache| {
            cache.revision == self.engine.revision() && cache.chosen == wanted
        });
        if !fresh {
            let report = classify(&self.engine, &wanted)?;
            self.report_cache = Some(ReportCache {
                chosen: wanted,
                revision: self.engine.revision(),
                report,
            });
        }
        // The cache was just filled on the miss path.
        Ok(&self.report_cache.as_ref().expect("report cache filled").report)
    }

    // ---------------------------------------------------------------
    // Engine passthroughs
    // ---------------------------------------------------------------

    /// The underlying merge engine.
    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    /// All unified nodes matching a literal.
    pub fn nodes_for_literal(&self, literal: &str, rank: Option<Rank>) -> Vec<UnifiedId> {
        self.engine.nodes_for_literal(literal, rank)
    }

    /// Subscribe to structural-change events.
    pub fn subscribe(&mut self, filter: EventFilter) -> mpsc::Receiver<MergeEvent> {
        self.engine.subscribe(filter)
    }

    fn view_index(&self, view: ViewId) -> SdkResult<usize> {
        self.views
            .iter()
            .position(|v| v.id() == view)
            .ok_or(SdkError::UnknownView(view))
    }
}

impl Default for ComparisonSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxalign_align::{AlignAction, SelectionTarget};
    use taxalign_compare::Category;
    use taxalign_merge::MergeEventKind;
    use taxalign_types::Rank;

    // The single-mutation-domain contract: hosts may move a session behind
    // a mutex on another thread.
    #[test]
    fn session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ComparisonSession>();
    }

    fn felis_catus(label: &str) -> Arc<SourceTree> {
        let mut tree = SourceTree::with_root(label, "Felis", Rank::Genus).unwrap();
        let root = tree.root().unwrap();
        tree.add_child(root, "Felis catus", Rank::Species).unwrap();
        Arc::new(tree)
    }

    fn felis_leo(label: &str) -> Arc<SourceTree> {
        let mut tree = SourceTree::with_root(label, "Felis", Rank::Genus).unwrap();
        let root = tree.root().unwrap();
        tree.add_child(root, "Felis leo", Rank::Species).unwrap();
        Arc::new(tree)
    }

    fn node(session: &ComparisonSession, literal: &str) -> UnifiedId {
        session.nodes_for_literal(literal, None)[0]
    }

    // Scenario 1: two agreeing sources merge onto shared nodes and
    // classify Common.
    #[test]
    fn scenario_agreeing_merge() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();

        let felis = session.nodes_for_literal("felis", None);
        assert_eq!(felis.len(), 1);
        let record = session.engine().unified().get(felis[0]).unwrap();
        assert!(record.is_mapped_in(a));
        assert!(record.is_mapped_in(b));

        let catus = node(&session, "felis catus");
        let report = session.compare(&[a, b]).unwrap();
        assert_eq!(report.category_of(catus), Some(Category::Common));
    }

    // Scenario 2: a third source lacking catus reclassifies it Missing.
    #[test]
    fn scenario_third_source_reclassifies() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();
        let catus = node(&session, "felis catus");
        {
            let report = session.compare(&[a, b]).unwrap();
            assert_eq!(report.category_of(catus), Some(Category::Common));
        }

        let c = session.add_source(felis_leo("C")).unwrap();
        let leo = node(&session, "felis leo");
        let report = session.compare(&[a, b, c]).unwrap();
        assert_eq!(report.category_of(catus), Some(Category::Missing));
        assert_eq!(report.category_of(leo), Some(Category::Missing));
    }

    // Scenario 3: expand in A auto-expands B; collapse in B leaves A
    // expanded while A shows children B lacks.
    #[test]
    fn scenario_lockstep_expand_collapse() {
        let mut session = ComparisonSession::new();
        let a_tree = {
            let mut tree = SourceTree::with_root("A", "Felis", Rank::Genus).unwrap();
            let root = tree.root().unwrap();
            tree.add_child(root, "Felis catus", Rank::Species).unwrap();
            tree.add_child(root, "Felis silvestris", Rank::Species).unwrap();
            Arc::new(tree)
        };
        let a = session.add_source(a_tree).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();
        let view_a = session.register_view(ViewScope::Source(a));
        let view_b = session.register_view(ViewScope::Source(b));

        let felis = node(&session, "felis");
        session.expand(view_a, felis).unwrap();
        assert!(session.view(view_b).unwrap().is_expanded(felis));

        let outcome = session.collapse(view_b, felis).unwrap();
        let AlignOutcome::Applied(report) = outcome else {
            panic!("expected Applied");
        };
        assert!(!session.view(view_b).unwrap().is_expanded(felis));
        assert!(session.view(view_a).unwrap().is_expanded(felis));
        assert!(report
            .for_view(view_a)
            .any(|s| s.action == AlignAction::LeftExpanded));
    }

    // Scenario 4: selecting by row in one view selects the counterpart row
    // in the other; clearing clears both.
    #[test]
    fn scenario_row_selection_roundtrip() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();
        let view_a = session.register_view(ViewScope::Source(a));
        let view_b = session.register_view(ViewScope::Source(b));

        let felis = node(&session, "felis");
        session.expand(view_a, felis).unwrap();

        let catus = node(&session, "felis catus");
        let row_a = session.row_of(view_a, catus).unwrap().unwrap();
        session
            .select(
                view_a,
                SelectionRequest::Replace(vec![SelectionTarget::Row(row_a)]),
            )
            .unwrap();
        let row_b = session.row_of(view_b, catus).unwrap().unwrap();
        assert_eq!(session.node_at(view_b, row_b).unwrap(), Some(catus));
        assert!(session.view(view_b).unwrap().is_selected(catus));

        session.select(view_b, SelectionRequest::Clear).unwrap();
        assert!(session.view(view_a).unwrap().selected().is_empty());
        assert!(session.view(view_b).unwrap().selected().is_empty());
        assert!(session.selection().is_empty());
    }

    #[test]
    fn remove_source_purges_view_and_selection_state() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let c = session.add_source(felis_leo("C")).unwrap();
        let view_a = session.register_view(ViewScope::Source(a));
        let view_u = session.register_view(ViewScope::Unified);

        let felis = node(&session, "felis");
        let leo = node(&session, "felis leo");
        session.expand(view_a, felis).unwrap();
        session
            .select(
                view_u,
                SelectionRequest::Replace(vec![SelectionTarget::Node(leo)]),
            )
            .unwrap();
        assert!(session.view(view_u).unwrap().is_selected(leo));

        session.remove_source(c).unwrap();
        assert!(!session.view(view_u).unwrap().is_selected(leo));
        assert!(session.selection().is_empty());
        assert!(session.nodes_for_literal("felis leo", None).is_empty());
    }

    #[test]
    fn compare_reuses_cache_until_structure_changes() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();

        let first = session.compare(&[a, b]).unwrap().clone();
        // Chosen order and duplicates do not defeat the cache.
        let second = session.compare(&[b, a, a]).unwrap().clone();
        assert_eq!(first, second);

        let c = session.add_source(felis_leo("C")).unwrap();
        let after = session.compare(&[a, b]).unwrap();
        assert_eq!(after.chosen, vec![a, b]);
        let _ = c;
    }

    #[test]
    fn unregistered_view_fails_fast() {
        let mut session = ComparisonSession::new();
        session.add_source(felis_catus("A")).unwrap();
        let ghost = ViewId::from_index(9);
        assert!(matches!(
            session.visible_rows(ghost),
            Err(SdkError::UnknownView(_))
        ));
        let felis = node(&session, "felis");
        assert!(matches!(
            session.expand(ghost, felis),
            Err(SdkError::Align(_))
        ));
    }

    #[test]
    fn unregister_view_stops_mirroring_it() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();
        let view_a = session.register_view(ViewScope::Source(a));
        let view_b = session.register_view(ViewScope::Source(b));

        session.unregister_view(view_b).unwrap();
        assert!(session.view(view_b).is_none());
        let felis = node(&session, "felis");
        session.expand(view_a, felis).unwrap();
        assert_eq!(session.views().len(), 1);

        assert!(matches!(
            session.unregister_view(view_b),
            Err(SdkError::UnknownView(_))
        ));
    }

    #[test]
    fn no_propagation_storm_across_echoed_events() {
        let mut session = ComparisonSession::new();
        let a = session.add_source(felis_catus("A")).unwrap();
        let b = session.add_source(felis_catus("B")).unwrap();
        let view_a = session.register_view(ViewScope::Source(a));
        let view_b = session.register_view(ViewScope::Source(b));

        let felis = node(&session, "felis");
        session.expand(view_a, felis).unwrap();

        // A presentation adapter echoing B's applied expansion back as a
        // fresh request changes nothing: the state is already in place.
        let outcome = session.expand(view_b, felis).unwrap();
        let AlignOutcome::Applied(report) = outcome else {
            panic!("expected Applied");
        };
        assert!(report.is_empty());
    }

    #[test]
    fn events_flow_through_the_session() {
        let mut session = ComparisonSession::new();
        let rx = session.subscribe(EventFilter {
            kinds: Some(vec![MergeEventKind::TreeAdded, MergeEventKind::TreeRemoved]),
            sources: None,
        });
        let a = session.add_source(felis_catus("A")).unwrap();
        session.remove_source(a).unwrap();
        let kinds: Vec<MergeEventKind> = rx.try_iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![MergeEventKind::TreeAdded, MergeEventKind::TreeRemoved]
        );
    }
}
