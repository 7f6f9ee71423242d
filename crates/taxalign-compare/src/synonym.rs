//! Synonym overlay: grouping unified nodes linked by source synonym data.

use std::collections::HashMap;

use taxalign_merge::MergeEngine;
use taxalign_types::{SourceId, UnifiedId};

/// Union-find over unified ids, path-halving on find.
#[derive(Default)]
struct UnionFind {
    parent: HashMap<UnifiedId, UnifiedId>,
}

impl UnionFind {
    fn find(&mut self, mut x: UnifiedId) -> UnifiedId {
        loop {
            let p = *self.parent.entry(x).or_insert(x);
            if p == x {
                return x;
            }
            let gp = *self.parent.entry(p).or_insert(p);
            self.parent.insert(x, gp);
            x = gp;
        }
    }

    fn union(&mut self, a: UnifiedId, b: UnifiedId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }
}

/// Group unified nodes whose source nodes are cross-linked by the synonym
/// relation of any chosen source.
///
/// Only groups of two or more distinct unified nodes are reported. Groups
/// and their members are ordered by unified id for deterministic output.
pub(crate) fn synonym_groups(
    engine: &MergeEngine,
    chosen: &[SourceId],
) -> Vec<Vec<UnifiedId>> {
    let mut uf = UnionFind::default();
    for &source in chosen {
        let Some(tree) = engine.source(source) else {
            continue;
        };
        for node in tree.preorder() {
            for &syn in &node.synonyms {
                // Each symmetric pair is visited twice; union once.
                if syn < node.id {
                    continue;
                }
                let a = engine.mapper().counterpart(source, node.id);
                let b = engine.mapper().counterpart(source, syn);
                if let (Some(a), Some(b)) = (a, b) {
                    if a != b {
                        uf.union(a, b);
                    }
                }
            }
        }
    }

    let members: Vec<UnifiedId> = uf.parent.keys().copied().collect();
    let mut groups: HashMap<UnifiedId, Vec<UnifiedId>> = HashMap::new();
    for member in members {
        let root = uf.find(member);
        groups.entry(root).or_default().push(member);
    }

    let mut out: Vec<Vec<UnifiedId>> = groups
        .into_values()
        .filter(|g| g.len() >= 2)
        .map(|mut g| {
            g.sort();
            g
        })
        .collect();
    out.sort_by_key(|g| g[0]);
    out
}
