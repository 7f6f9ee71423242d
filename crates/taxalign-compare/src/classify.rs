//! The classification pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use taxalign_merge::MergeEngine;
use taxalign_types::{SourceId, TaxonKey, UnifiedId};

use crate::error::{CompareError, CompareResult};
use crate::report::{AssignmentEntry, AssignmentRow, ComparisonReport};
use crate::synonym::synonym_groups;

/// Classify the unified tree against a chosen subset of registered sources.
///
/// Unified nodes sharing an identity key form a key-group; a group with
/// more than one member carrying chosen mappings is a placement
/// disagreement. Relative to the chosen sources, each node with at least
/// one chosen mapping is classified:
///
/// - present in every chosen source → [`Category::Common`];
/// - otherwise, if its key-group has two or more placements →
///   [`Category::Difference`];
/// - otherwise → [`Category::Missing`].
///
/// Nodes with no chosen mapping are not part of the partition. The whole
/// computation reads only current mappings; calling it twice without an
/// intervening structural change yields the same report.
///
/// Fails fast on an empty chosen set or an unregistered source id.
pub fn classify(engine: &MergeEngine, chosen: &[SourceId]) -> CompareResult<ComparisonReport> {
    if chosen.is_empty() {
        return Err(CompareError::EmptySelection);
    }
    let mut chosen_set = BTreeSet::new();
    for &source in chosen {
        if !engine.is_registered(source) {
            return Err(CompareError::UnknownSource(source));
        }
        chosen_set.insert(source);
    }
    let chosen_ids: Vec<SourceId> = chosen_set.iter().copied().collect();

    // Group nodes by key, keeping first-occurrence order for the report.
    let mut key_order: Vec<TaxonKey> = Vec::new();
    let mut groups: HashMap<TaxonKey, Vec<UnifiedId>> = HashMap::new();
    let mut placements: HashMap<TaxonKey, usize> = HashMap::new();
    for node in engine.unified().preorder() {
        let present = chosen_count(node.mappings.iter().map(|m| m.source), &chosen_set);
        if present == 0 {
            continue;
        }
        let group = groups.entry(node.key).or_insert_with(|| {
            key_order.push(node.key);
            Vec::new()
        });
        group.push(node.id);
        *placements.entry(node.key).or_insert(0) += 1;
    }

    let mut report = ComparisonReport {
        chosen: chosen_ids.clone(),
        ..ComparisonReport::default()
    };

    for node in engine.unified().preorder() {
        let present = chosen_count(node.mappings.iter().map(|m| m.source), &chosen_set);
        if present == 0 {
            continue;
        }
        if present == chosen_set.len() {
            report.commons.push(node.id);
        } else if placements.get(&node.key).copied().unwrap_or(0) >= 2 {
            report.differences.push(node.id);
        } else {
            report.missing.push(node.id);
        }
    }

    for key in key_order {
        let nodes = &groups[&key];
        report
            .assignments
            .push(assignment_row(engine, key, nodes, &chosen_set));
    }

    report.synonym_groups = synonym_groups(engine, &chosen_ids);

    debug!(
        chosen = chosen_ids.len(),
        commons = report.commons.len(),
        differences = report.differences.len(),
        missing = report.missing.len(),
        "classified unified tree"
    );
    Ok(report)
}

fn chosen_count(
    sources: impl Iterator<Item = SourceId>,
    chosen: &BTreeSet<SourceId>,
) -> usize {
    // Mappings are unique per source, so counting matches is counting
    // distinct chosen sources.
    sources.filter(|s| chosen.contains(s)).count()
}

/// Build the assignment-table row for one key-group.
fn assignment_row(
    engine: &MergeEngine,
    key: TaxonKey,
    nodes: &[UnifiedId],
    chosen: &BTreeSet<SourceId>,
) -> AssignmentRow {
    let policy = engine.policy();
    // Per source: the set of parent literals it assigns the taxon under,
    // deduplicated by normalized form.
    let mut per_source: BTreeMap<SourceId, BTreeMap<String, String>> = BTreeMap::new();
    let mut literal = String::new();
    let mut rank = taxalign_types::Rank::Unranked;

    for &id in nodes {
        let Some(node) = engine.unified().get(id) else {
            continue;
        };
        if literal.is_empty() {
            literal = node.literal.clone();
            rank = node.rank;
        }
        for mapping in &node.mappings {
            if !chosen.contains(&mapping.source) {
                continue;
            }
            let Some(tree) = engine.source(mapping.source) else {
                continue;
            };
            let parents = per_source.entry(mapping.source).or_default();
            let parent_literal = tree
                .node(mapping.node)
                .and_then(|n| n.parent)
                .and_then(|p| tree.node(p))
                .map(|p| p.literal.clone());
            if let Some(parent_literal) = parent_literal {
                parents
                    .entry(policy.normalize(&parent_literal))
                    .or_insert(parent_literal);
            }
        }
    }

    // Two sources disagree when their normalized parent sets differ.
    let mut normalized_sets = per_source
        .values()
        .map(|parents| parents.keys().cloned().collect::<BTreeSet<String>>());
    let first = normalized_sets.next();
    let inconsistent = match first {
        Some(first) => normalized_sets.any(|set| set != first),
        None => false,
    };

    let entries = per_source
        .into_iter()
        .map(|(source, parents)| AssignmentEntry {
            source,
            parents: parents.into_values().collect(),
        })
        .collect();

    AssignmentRow {
        key,
        literal,
        rank,
        nodes: nodes.to_vec(),
        entries,
        inconsistent,
    }
}
