//! The merge engine: incremental unified-tree construction over N sources.

use std::collections::BTreeMap;
use std::sync::{mpsc, Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxalign_index::LiteralIndex;
use taxalign_model::SourceTree;
use taxalign_types::{KeyPolicy, Rank, SourceId, UnifiedId};

use crate::error::{MergeError, MergeResult};
use crate::event::{EventFilter, EventRouter, MergeEvent};
use crate::mapper::NodeMapper;
use crate::unified::UnifiedTree;

/// The result of a mutating engine call: the source affected and the
/// structural-change events produced, in emission order.
///
/// The same events are also delivered to any registered subscribers.
#[derive(Debug)]
pub struct MergeOutcome {
    /// The source that was added or removed.
    pub source: SourceId,
    /// Events produced by this call.
    pub events: Vec<MergeEvent>,
}

/// Builds and maintains the unified tree from registered source hierarchies.
///
/// One engine instance owns its literal index, mapper, and event router;
/// independent comparison sessions never share state. The engine reads
/// source trees but never mutates them.
///
/// All operations are synchronous and complete before returning. An engine
/// plus its views forms a single mutation domain; hosts embedding it in a
/// multi-threaded runtime must serialize access behind one mutex.
pub struct MergeEngine {
    policy: KeyPolicy,
    unified: UnifiedTree,
    mapper: NodeMapper,
    index: LiteralIndex<UnifiedId>,
    sources: BTreeMap<SourceId, Arc<SourceTree>>,
    next_source: u32,
    router: EventRouter,
    revision: u64,
}

impl MergeEngine {
    /// Create an engine with the default key policy.
    pub fn new() -> Self {
        Self::with_policy(KeyPolicy::default())
    }

    /// Create an engine with an explicit normalization policy.
    pub fn with_policy(policy: KeyPolicy) -> Self {
        Self {
            policy,
            unified: UnifiedTree::new(),
            mapper: NodeMapper::new(),
            index: LiteralIndex::new(),
            sources: BTreeMap::new(),
            next_source: 0,
            router: EventRouter::new(),
            revision: 0,
        }
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Register a source hierarchy and merge it into the unified tree.
    ///
    /// Traverses the source depth-first. For each node, if the merged parent
    /// already has a child with the node's identity key that is not yet
    /// mapped for this source, a mapping entry is attached to it; otherwise
    /// a new unified node is created under the merged parent. The parent is
    /// always merged first by traversal order; independently-rooted sources
    /// hang off the synthetic unified root.
    ///
    /// Fails fast on malformed trees and on labels that are already
    /// registered.
    pub fn add_tree(&mut self, tree: Arc<SourceTree>) -> MergeResult<MergeOutcome> {
        tree.validate()?;
        if self.source_by_label(tree.label()).is_some() {
            return Err(MergeError::AlreadyRegistered(tree.label().to_string()));
        }

        let source = SourceId::from_index(self.next_source as usize);
        self.next_source += 1;

        let mut events = Vec::new();
        for node in tree.preorder() {
            let parent_unified = match node.parent {
                None => self.unified.root_id(),
                Some(p) => self.mapper.counterpart(source, p).ok_or_else(|| {
                    MergeError::Inconsistency(format!(
                        "parent {p} of {} visited out of order",
                        node.id
                    ))
                })?,
            };

            let key = self.policy.key(&node.literal, node.rank);
            let existing = self
                .unified
                .children_with_key(parent_unified, &key)
                .iter()
                .copied()
                .find(|&u| {
                    self.unified
                        .get(u)
                        .is_some_and(|n| !n.is_mapped_in(source))
                });

            match existing {
                Some(unified) => {
                    self.mapper.map(&mut self.unified, source, node.id, unified)?;
                }
                None => {
                    let unified =
                        self.unified
                            .alloc(key, &node.literal, node.rank, parent_unified);
                    self.mapper.map(&mut self.unified, source, node.id, unified)?;
                    self.index
                        .insert(&self.policy.normalize(&node.literal), key, unified);
                    let event = MergeEvent::NodeAdded {
                        node: unified,
                        source,
                    };
                    self.router.publish(&event);
                    events.push(event);
                }
            }
        }

        self.sources.insert(source, tree.clone());
        let event = MergeEvent::TreeAdded { source };
        self.router.publish(&event);
        events.push(event);
        self.revision += 1;

        debug!(
            source = %source,
            label = tree.label(),
            nodes = tree.len(),
            unified = self.unified.len(),
            "merged source tree"
        );
        Ok(MergeOutcome { source, events })
    }

    /// Remove a registered source, reversing its merge.
    ///
    /// Mapping entries are deleted children-first; unified nodes left with
    /// no remaining mappings are pruned. Removing an unknown source fails
    /// fast.
    pub fn remove_tree(&mut self, source: SourceId) -> MergeResult<MergeOutcome> {
        let tree = self
            .sources
            .get(&source)
            .cloned()
            .ok_or(MergeError::UnknownSource(source))?;

        let order: Vec<_> = tree.preorder().map(|n| n.id).collect();
        let mut events = Vec::new();
        // Reverse preorder visits every child before its parent.
        for node in order.into_iter().rev() {
            let unified = self
                .mapper
                .unmap(&mut self.unified, source, node)
                .ok_or_else(|| {
                    MergeError::Inconsistency(format!("{node} of {source} was not mapped"))
                })?;

            let prune = self
                .unified
                .get(unified)
                .is_some_and(|n| n.mappings.is_empty() && n.children.is_empty());
            if prune {
                if let Some(removed) = self.unified.remove(unified) {
                    self.index.remove(
                        &self.policy.normalize(&removed.literal),
                        removed.key,
                        unified,
                    );
                    let event = MergeEvent::NodeRemoved {
                        node: unified,
                        key: removed.key,
                        source,
                    };
                    self.router.publish(&event);
                    events.push(event);
                }
            }
        }

        self.sources.remove(&source);
        let event = MergeEvent::TreeRemoved { source };
        self.router.publish(&event);
        events.push(event);
        self.revision += 1;

        debug!(source = %source, label = tree.label(), unified = self.unified.len(), "removed source tree");
        Ok(MergeOutcome { source, events })
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// All unified nodes matching a literal, optionally restricted to a
    /// rank. Misses yield an empty vec.
    pub fn nodes_for_literal(&self, literal: &str, rank: Option<Rank>) -> Vec<UnifiedId> {
        match rank {
            Some(rank) => self
                .index
                .ids_for_key(&self.policy.key(literal, rank))
                .to_vec(),
            None => self
                .index
                .ids_for_literal(&self.policy.normalize(literal))
                .to_vec(),
        }
    }

    /// The unified tree.
    pub fn unified(&self) -> &UnifiedTree {
        &self.unified
    }

    /// The bidirectional node mapping table.
    pub fn mapper(&self) -> &NodeMapper {
        &self.mapper
    }

    /// The normalization policy this engine derives keys with.
    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    /// Look up a registered source tree.
    pub fn source(&self, id: SourceId) -> Option<&Arc<SourceTree>> {
        self.sources.get(&id)
    }

    /// Returns `true` if `id` names a registered source.
    pub fn is_registered(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    /// All registered sources in id order.
    pub fn sources(&self) -> impl Iterator<Item = (SourceId, &Arc<SourceTree>)> {
        self.sources.iter().map(|(id, tree)| (*id, tree))
    }

    /// Find a registered source by label.
    pub fn source_by_label(&self, label: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .find(|(_, tree)| tree.label() == label)
            .map(|(id, _)| *id)
    }

    /// Monotonic stamp bumped on every structural change; cheap cache
    /// invalidation for row caches and classification reports.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ---------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------

    /// Subscribe to structural-change events matching `filter`.
    ///
    /// Delivery is synchronous with the mutating call; dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&mut self, filter: EventFilter) -> mpsc::Receiver<MergeEvent> {
        self.router.subscribe(filter)
    }

    // ---------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------

    /// A structural snapshot of the current unified tree, independent of
    /// arena ids and registration order.
    pub fn snapshot(&self) -> MergeSnapshot {
        let roots = self.snapshot_children(self.unified.root_id());
        MergeSnapshot { roots }
    }

    fn snapshot_children(&self, id: UnifiedId) -> Vec<NodeSnapshot> {
        let mut out: Vec<NodeSnapshot> = self
            .unified
            .children(id)
            .iter()
            .filter_map(|&child| self.snapshot_node(child))
            .collect();
        out.sort_by(|a, b| {
            (self.policy.normalize(&a.literal), a.rank)
                .cmp(&(self.policy.normalize(&b.literal), b.rank))
        });
        out
    }

    fn snapshot_node(&self, id: UnifiedId) -> Option<NodeSnapshot> {
        let node = self.unified.get(id)?;
        let mut sources: Vec<String> = node
            .mappings
            .iter()
            .filter_map(|m| self.sources.get(&m.source))
            .map(|tree| tree.label().to_string())
            .collect();
        sources.sort();
        Some(NodeSnapshot {
            literal: node.literal.clone(),
            rank: node.rank,
            sources,
            children: self.snapshot_children(id),
        })
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural snapshot of one unified node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Canonical literal.
    pub literal: String,
    /// Rank.
    pub rank: Rank,
    /// Sorted labels of the sources mapping this node.
    pub sources: Vec<String>,
    /// Children sorted by normalized literal and rank.
    pub children: Vec<NodeSnapshot>,
}

/// Structural snapshot of the whole unified tree.
///
/// Two merges are structurally identical exactly when their snapshots are
/// equal; arena ids and source registration order do not participate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSnapshot {
    /// Top-level nodes below the synthetic root.
    pub roots: Vec<NodeSnapshot>,
}

impl MergeSnapshot {
    /// Serialize the snapshot to bincode bytes.
    pub fn to_bytes(&self) -> MergeResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| MergeError::Serialization(e.to_string()))
    }

    /// Deserialize a snapshot from bincode bytes.
    pub fn from_bytes(data: &[u8]) -> MergeResult<Self> {
        bincode::deserialize(data).map_err(|e| MergeError::Serialization(e.to_string()))
    }
}
