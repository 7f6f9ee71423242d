//! Selection mirroring across registered views.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxalign_merge::MergeEngine;
use taxalign_types::{UnifiedId, ViewId};

use crate::error::{AlignError, AlignResult};
use crate::token::PropagationContext;
use crate::view::TreeViewState;

/// A node addressed by identity or by the origin view's row coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTarget {
    /// A unified node directly.
    Node(UnifiedId),
    /// A visible row of the originating view. Out-of-range rows resolve to
    /// nothing and are skipped.
    Row(usize),
}

/// Interactive multi-select semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionRequest {
    /// Replace the whole selection.
    Replace(Vec<SelectionTarget>),
    /// Add one node.
    Add(SelectionTarget),
    /// Remove one node.
    Remove(SelectionTarget),
    /// Toggle one node (ctrl-click).
    Toggle(SelectionTarget),
    /// Select the row range between the anchor and the target in the
    /// originating view (shift-click). With no anchor set, behaves like
    /// `Replace` with the target alone.
    ExtendTo(SelectionTarget),
    /// Clear everything.
    Clear,
}

/// The nodes a request actually added and removed, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDelta {
    /// Nodes newly selected.
    pub added: Vec<UnifiedId>,
    /// Nodes newly deselected.
    pub removed: Vec<UnifiedId>,
}

impl SelectionDelta {
    /// Returns `true` if the request changed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The result of a selection request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The delta that was applied and mirrored to every view.
    Applied(SelectionDelta),
    /// The request arrived while another propagation held the context and
    /// was dropped.
    Suppressed,
}

/// The session-wide selection: an ordered set of unified node identities
/// plus the anchor/lead pair driving range extension.
#[derive(Clone, Debug, Default)]
pub struct SelectionModel {
    order: Vec<UnifiedId>,
    set: HashSet<UnifiedId>,
    anchor: Option<UnifiedId>,
    lead: Option<UnifiedId>,
}

impl SelectionModel {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected nodes in selection order.
    pub fn selected(&self) -> &[UnifiedId] {
        &self.order
    }

    /// Returns `true` if `node` is selected.
    pub fn is_selected(&self, node: UnifiedId) -> bool {
        self.set.contains(&node)
    }

    /// Number of selected nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The range-extension anchor.
    pub fn anchor(&self) -> Option<UnifiedId> {
        self.anchor
    }

    /// The most recently targeted node.
    pub fn lead(&self) -> Option<UnifiedId> {
        self.lead
    }

    fn insert(&mut self, node: UnifiedId) -> bool {
        if self.set.insert(node) {
            self.order.push(node);
            true
        } else {
            false
        }
    }

    fn remove(&mut self, node: UnifiedId) -> bool {
        if self.set.remove(&node) {
            self.order.retain(|n| *n != node);
            true
        } else {
            false
        }
    }

    /// Drop nodes that no longer exist.
    pub fn purge(&mut self, dead: &[UnifiedId]) {
        self.order.retain(|n| !dead.contains(n));
        self.set.retain(|n| !dead.contains(n));
        if self.anchor.is_some_and(|n| dead.contains(&n)) {
            self.anchor = None;
        }
        if self.lead.is_some_and(|n| dead.contains(&n)) {
            self.lead = None;
        }
    }
}

/// Mirrors selection deltas across all registered views.
///
/// Owns the [`SelectionModel`]; views carry only their scope-filtered
/// projection of it. Uses the same propagation-context pattern as the
/// alignment controller, with an independently scoped context.
#[derive(Debug, Default)]
pub struct SelectionSynchronizer {
    model: SelectionModel,
}

impl SelectionSynchronizer {
    /// Create a synchronizer with an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The session-wide selection.
    pub fn model(&self) -> &SelectionModel {
        &self.model
    }

    /// Mutable access for session-level maintenance, e.g. purging ids that
    /// a source removal killed.
    pub fn model_mut(&mut self) -> &mut SelectionModel {
        &mut self.model
    }

    /// Apply a selection request originating in `origin` and mirror the
    /// resulting delta to every registered view.
    ///
    /// Nodes with no counterpart in some view are omitted from that view's
    /// projection; that is not an error. Dead node ids fail fast.
    pub fn apply(
        &mut self,
        engine: &MergeEngine,
        views: &mut [TreeViewState],
        origin: ViewId,
        request: SelectionRequest,
        ctx: &mut PropagationContext,
    ) -> AlignResult<SelectionOutcome> {
        let origin_idx = views
            .iter()
            .position(|v| v.id() == origin)
            .ok_or(AlignError::UnknownView(origin))?;
        if !ctx.enter() {
            debug!(view = %origin, "selection request suppressed");
            return Ok(SelectionOutcome::Suppressed);
        }
        let result = self.apply_inner(engine, views, origin_idx, request);
        ctx.exit();
        result.map(SelectionOutcome::Applied)
    }

    fn apply_inner(
        &mut self,
        engine: &MergeEngine,
        views: &mut [TreeViewState],
        origin_idx: usize,
        request: SelectionRequest,
    ) -> AlignResult<SelectionDelta> {
        let (desired, anchor, lead) = self.resolve(engine, &mut views[origin_idx], request)?;

        let mut delta = SelectionDelta::default();
        match desired {
            Desired::Set(nodes) => {
                let wanted: HashSet<UnifiedId> = nodes.iter().copied().collect();
                for node in self.model.selected().to_vec() {
                    if !wanted.contains(&node) && self.model.remove(node) {
                        delta.removed.push(node);
                    }
                }
                for node in nodes {
                    if self.model.insert(node) {
                        delta.added.push(node);
                    }
                }
            }
            Desired::Add(nodes) => {
                for node in nodes {
                    if self.model.insert(node) {
                        delta.added.push(node);
                    }
                }
            }
            Desired::Remove(nodes) => {
                for node in nodes {
                    if self.model.remove(node) {
                        delta.removed.push(node);
                    }
                }
            }
            Desired::Toggle(nodes) => {
                for node in nodes {
                    if self.model.is_selected(node) {
                        self.model.remove(node);
                        delta.removed.push(node);
                    } else {
                        self.model.insert(node);
                        delta.added.push(node);
                    }
                }
            }
        }
        self.model.anchor = anchor;
        self.model.lead = lead;

        for view in views.iter_mut() {
            view.apply_selection_delta(engine, &delta.added, &delta.removed);
            view.set_anchor_lead(engine, anchor, lead);
        }
        debug!(
            added = delta.added.len(),
            removed = delta.removed.len(),
            total = self.model.len(),
            "selection delta applied"
        );
        Ok(delta)
    }

    /// Translate a request into the desired change plus anchor/lead, in the
    /// origin view's coordinates.
    fn resolve(
        &self,
        engine: &MergeEngine,
        origin: &mut TreeViewState,
        request: SelectionRequest,
    ) -> AlignResult<(Desired, Option<UnifiedId>, Option<UnifiedId>)> {
        let anchor = self.model.anchor;
        match request {
            SelectionRequest::Replace(targets) => {
                let nodes = self.resolve_targets(engine, origin, &targets)?;
                let last = nodes.last().copied();
                Ok((Desired::Set(nodes), last, last))
            }
            SelectionRequest::Add(target) => {
                let nodes = self.resolve_targets(engine, origin, &[target])?;
                let last = nodes.last().copied().or(anchor);
                Ok((Desired::Add(nodes), last, last))
            }
            SelectionRequest::Remove(target) => {
                let nodes = self.resolve_targets(engine, origin, &[target])?;
                Ok((Desired::Remove(nodes), anchor, self.model.lead))
            }
            SelectionRequest::Toggle(target) => {
                let nodes = self.resolve_targets(engine, origin, &[target])?;
                let last = nodes.last().copied().or(anchor);
                Ok((Desired::Toggle(nodes), last, last))
            }
            SelectionRequest::ExtendTo(target) => {
                let nodes = self.resolve_targets(engine, origin, &[target])?;
                let Some(&lead) = nodes.last() else {
                    // Target resolved to nothing: keep the selection as is.
                    return Ok((Desired::Add(Vec::new()), anchor, self.model.lead));
                };
                let anchor = anchor.unwrap_or(lead);
                let range = Self::row_range(engine, origin, anchor, lead);
                Ok((Desired::Set(range), Some(anchor), Some(lead)))
            }
            SelectionRequest::Clear => Ok((Desired::Set(Vec::new()), None, None)),
        }
    }

    fn resolve_targets(
        &self,
        engine: &MergeEngine,
        origin: &mut TreeViewState,
        targets: &[SelectionTarget],
    ) -> AlignResult<Vec<UnifiedId>> {
        let mut nodes = Vec::with_capacity(targets.len());
        for target in targets {
            match *target {
                SelectionTarget::Node(node) => {
                    let live = engine
                        .unified()
                        .get(node)
                        .is_some_and(|n| !n.is_root());
                    if !live {
                        return Err(AlignError::UnknownNode(node));
                    }
                    nodes.push(node);
                }
                SelectionTarget::Row(row) => {
                    // A stale row coordinate is a lookup miss, not misuse.
                    if let Some(node) = origin.node_at_row(engine, row) {
                        nodes.push(node);
                    }
                }
            }
        }
        Ok(nodes)
    }

    /// The inclusive row span between two visible nodes of the origin view.
    /// Falls back to the endpoints that are visible if either is not.
    fn row_range(
        engine: &MergeEngine,
        origin: &mut TreeViewState,
        anchor: UnifiedId,
        lead: UnifiedId,
    ) -> Vec<UnifiedId> {
        let anchor_row = origin.row_of_node(engine, anchor);
        let lead_row = origin.row_of_node(engine, lead);
        match (anchor_row, lead_row) {
            (Some(a), Some(l)) => {
                let (lo, hi) = if a <= l { (a, l) } else { (l, a) };
                origin.visible_rows(engine)[lo..=hi].to_vec()
            }
            (None, Some(_)) => vec![lead],
            (Some(_), None) | (None, None) => {
                [anchor, lead].into_iter().collect()
            }
        }
    }
}

enum Desired {
    Set(Vec<UnifiedId>),
    Add(Vec<UnifiedId>),
    Remove(Vec<UnifiedId>),
    Toggle(Vec<UnifiedId>),
}
