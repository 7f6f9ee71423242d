//! Structural-change notifications.
//!
//! Every mutation of the unified tree produces [`MergeEvent`]s. Events are
//! returned from the mutating call and fanned out to subscribers through
//! synchronous mpsc channels; the engine never blocks on a subscriber, and
//! subscribers whose receivers are gone are pruned on the next publish.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use taxalign_types::{SourceId, TaxonKey, UnifiedId};

/// Classification of merge events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeEventKind {
    /// A unified node was created.
    NodeAdded,
    /// A unified node was pruned.
    NodeRemoved,
    /// A source hierarchy finished merging.
    TreeAdded,
    /// A source hierarchy was removed.
    TreeRemoved,
}

/// A single structural-change notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeEvent {
    /// A unified node was created while merging `source`.
    NodeAdded {
        /// The new node.
        node: UnifiedId,
        /// The source whose merge created it.
        source: SourceId,
    },
    /// A unified node lost its last mapping and was pruned.
    ///
    /// The id is already dead when the event is observed; the key is
    /// carried so consumers can update key-based state.
    NodeRemoved {
        /// The pruned node's id.
        node: UnifiedId,
        /// The pruned node's identity key.
        key: TaxonKey,
        /// The source whose removal triggered the prune.
        source: SourceId,
    },
    /// `source` finished merging into the unified tree.
    TreeAdded {
        /// The newly registered source.
        source: SourceId,
    },
    /// `source` was removed and its mappings reversed.
    TreeRemoved {
        /// The removed source.
        source: SourceId,
    },
}

impl MergeEvent {
    /// The event's kind.
    pub fn kind(&self) -> MergeEventKind {
        match self {
            MergeEvent::NodeAdded { .. } => MergeEventKind::NodeAdded,
            MergeEvent::NodeRemoved { .. } => MergeEventKind::NodeRemoved,
            MergeEvent::TreeAdded { .. } => MergeEventKind::TreeAdded,
            MergeEvent::TreeRemoved { .. } => MergeEventKind::TreeRemoved,
        }
    }

    /// The source the event pertains to.
    pub fn source(&self) -> SourceId {
        match self {
            MergeEvent::NodeAdded { source, .. }
            | MergeEvent::NodeRemoved { source, .. }
            | MergeEvent::TreeAdded { source }
            | MergeEvent::TreeRemoved { source } => *source,
        }
    }
}

/// Filter for subscribing to a subset of merge events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<MergeEventKind>>,
    /// If set, only events for these sources are delivered.
    pub sources: Option<Vec<SourceId>>,
}

impl EventFilter {
    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &MergeEvent) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind()) {
                return false;
            }
        }
        if let Some(ref sources) = self.sources {
            if !sources.contains(&event.source()) {
                return false;
            }
        }
        true
    }
}

/// Fan-out router delivering events to matching subscribers.
#[derive(Default)]
pub(crate) struct EventRouter {
    subscribers: Vec<(EventFilter, mpsc::Sender<MergeEvent>)>,
}

impl EventRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; returns the receiving end.
    pub(crate) fn subscribe(&mut self, filter: EventFilter) -> mpsc::Receiver<MergeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((filter, tx));
        rx
    }

    /// Route an event to all matching subscribers.
    ///
    /// Subscribers whose receivers are dropped are pruned; non-matching
    /// subscribers are kept for future events.
    pub(crate) fn publish(&mut self, event: &MergeEvent) {
        self.subscribers.retain(|(filter, tx)| {
            if filter.matches(event) {
                tx.send(event.clone()).is_ok()
            } else {
                true
            }
        });
    }

    /// Number of active subscribers.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
