//! Expand/collapse propagation across registered views.

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxalign_merge::MergeEngine;
use taxalign_types::{UnifiedId, ViewId};

use crate::error::{AlignError, AlignResult};
use crate::token::PropagationContext;
use crate::view::TreeViewState;

/// What the controller did to one view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignAction {
    /// The node (and any collapsed ancestors) was expanded.
    Expanded,
    /// The node was collapsed.
    Collapsed,
    /// Collapse was requested but refused: the view shows children the
    /// triggering view does not, or only an ancestor fallback aligned.
    LeftExpanded,
}

/// One applied (or refused) operation on one view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignStep {
    /// The view operated on.
    pub view: ViewId,
    /// The node operated on, in that view.
    pub node: UnifiedId,
    /// What happened.
    pub action: AlignAction,
}

/// Per-view record of a propagated alignment request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignReport {
    /// Steps in application order, the triggering view first.
    pub steps: Vec<AlignStep>,
}

impl AlignReport {
    /// Returns `true` if nothing changed anywhere.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps touching one view.
    pub fn for_view(&self, view: ViewId) -> impl Iterator<Item = &AlignStep> {
        self.steps.iter().filter(move |s| s.view == view)
    }
}

/// The result of an alignment request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlignOutcome {
    /// The request propagated; the report lists what each view did.
    Applied(AlignReport),
    /// The request arrived while another propagation held the context and
    /// was dropped.
    Suppressed,
}

/// Propagates expand/collapse requests from one view to all others.
///
/// The controller is stateless; the re-entrancy state lives in the
/// [`PropagationContext`] the caller passes in, which makes the guard
/// visible in every signature and directly testable.
#[derive(Debug, Default)]
pub struct AlignmentController;

impl AlignmentController {
    /// Create a controller.
    pub fn new() -> Self {
        Self
    }

    /// Expand `node` in `origin` and propagate to every other view.
    ///
    /// Views without an exact counterpart expand the nearest mapped
    /// ancestor instead. Leaf nodes are not expansion targets; the request
    /// is a no-op for them.
    pub fn request_expand(
        &self,
        engine: &MergeEngine,
        views: &mut [TreeViewState],
        origin: ViewId,
        node: UnifiedId,
        ctx: &mut PropagationContext,
    ) -> AlignResult<AlignOutcome> {
        let origin_idx = Self::require_view(views, origin)?;
        Self::require_node(engine, node)?;
        if !ctx.enter() {
            debug!(view = %origin, node = %node, "expand request suppressed");
            return Ok(AlignOutcome::Suppressed);
        }
        let report = self.propagate_expand(engine, views, origin_idx, node);
        ctx.exit();
        Ok(AlignOutcome::Applied(report))
    }

    /// Collapse `node` in `origin` and propagate to every other view that
    /// can collapse it without hiding view-unique children.
    pub fn request_collapse(
        &self,
        engine: &MergeEngine,
        views: &mut [TreeViewState],
        origin: ViewId,
        node: UnifiedId,
        ctx: &mut PropagationContext,
    ) -> AlignResult<AlignOutcome> {
        let origin_idx = Self::require_view(views, origin)?;
        Self::require_node(engine, node)?;
        if !ctx.enter() {
            debug!(view = %origin, node = %node, "collapse request suppressed");
            return Ok(AlignOutcome::Suppressed);
        }
        let report = self.propagate_collapse(engine, views, origin_idx, node);
        ctx.exit();
        Ok(AlignOutcome::Applied(report))
    }

    // ---------------------------------------------------------------
    // Propagation
    // ---------------------------------------------------------------

    fn propagate_expand(
        &self,
        engine: &MergeEngine,
        views: &mut [TreeViewState],
        origin_idx: usize,
        node: UnifiedId,
    ) -> AlignReport {
        let mut report = AlignReport::default();
        if views[origin_idx].is_leaf(engine, node) {
            debug!(node = %node, "leaf is not an expand target");
            return report;
        }

        if views[origin_idx].expand_to(engine, node) {
            report.steps.push(AlignStep {
                view: views[origin_idx].id(),
                node,
                action: AlignAction::Expanded,
            });
        }

        for idx in 0..views.len() {
            if idx == origin_idx {
                continue;
            }
            let view = &mut views[idx];
            let Some(aligned) = view.compute_alignment(engine, node) else {
                continue;
            };
            if view.expand_to(engine, aligned.node) {
                report.steps.push(AlignStep {
                    view: view.id(),
                    node: aligned.node,
                    action: AlignAction::Expanded,
                });
            }
        }
        report
    }

    fn propagate_collapse(
        &self,
        engine: &MergeEngine,
        views: &mut [TreeViewState],
        origin_idx: usize,
        node: UnifiedId,
    ) -> AlignReport {
        let mut report = AlignReport::default();
        let origin_scope = views[origin_idx].scope();
        let origin_children = views[origin_idx].children_in_scope(engine, node);
        if origin_children.is_empty() {
            debug!(node = %node, "leaf is not a collapse target");
            return report;
        }

        if views[origin_idx].collapse(node) {
            report.steps.push(AlignStep {
                view: views[origin_idx].id(),
                node,
                action: AlignAction::Collapsed,
            });
        }

        for idx in 0..views.len() {
            if idx == origin_idx {
                continue;
            }
            let view = &mut views[idx];
            let Some(aligned) = view.compute_alignment(engine, node) else {
                continue;
            };
            if !view.is_expanded(aligned.node) {
                continue;
            }
            // An ancestor fallback never collapses: its children do not
            // correspond to the triggering node's.
            let collapsible = aligned.exact
                && view.is_collapsible(engine, aligned.node, origin_scope, &origin_children);
            if collapsible && view.collapse(aligned.node) {
                report.steps.push(AlignStep {
                    view: view.id(),
                    node: aligned.node,
                    action: AlignAction::Collapsed,
                });
            } else {
                report.steps.push(AlignStep {
                    view: view.id(),
                    node: aligned.node,
                    action: AlignAction::LeftExpanded,
                });
            }
        }
        report
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    fn require_view(views: &[TreeViewState], id: ViewId) -> AlignResult<usize> {
        views
            .iter()
            .position(|v| v.id() == id)
            .ok_or(AlignError::UnknownView(id))
    }

    fn require_node(engine: &MergeEngine, node: UnifiedId) -> AlignResult<()> {
        let live = engine
            .unified()
            .get(node)
            .is_some_and(|n| !n.is_root());
        if live {
            Ok(())
        } else {
            Err(AlignError::UnknownNode(node))
        }
    }
}
