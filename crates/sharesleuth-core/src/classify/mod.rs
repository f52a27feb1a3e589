/// Bottom-up department classification.
///
/// Items are resolved deepest-first. A node's totals are its own keyword
/// score (×5 for folders, ×1 for files) plus, for every resolved child,
/// three times the child's top score credited to each of the child's
/// winning departments. The result is a pure function of the record set,
/// the keyword map and the tie policy.
pub mod matcher;
pub mod tree;

use crate::model::{ClassificationResult, KeywordMap, ScanRecord, TiePolicy};
use matcher::{Matcher, NameTokens};
use std::collections::BTreeMap;
use tracing::info;
use tree::PathTree;

pub const FOLDER_WEIGHT: u64 = 5;
pub const FILE_WEIGHT: u64 = 1;
pub const CHILD_WEIGHT: u64 = 3;

/// Classify every record. Results are sorted by path key.
pub fn classify(
    records: &[ScanRecord],
    keywords: &KeywordMap,
    policy: TiePolicy,
) -> Vec<ClassificationResult> {
    let tree = PathTree::build(records);
    let matcher = Matcher::new(keywords);
    let names: Vec<&str> = keywords
        .departments()
        .iter()
        .map(|d| d.name.as_str())
        .collect();

    // Child contributions, keyed by department index.
    let mut inherited: Vec<BTreeMap<usize, u64>> = vec![BTreeMap::new(); tree.len()];
    let mut results: Vec<Option<ClassificationResult>> = vec![None; tree.len()];

    for idx in tree.bottom_up_order() {
        let node = tree.node(idx);
        let record = &records[node.record];
        let weight = if record.is_folder() {
            FOLDER_WEIGHT
        } else {
            FILE_WEIGHT
        };

        let own = matcher.score(&NameTokens::new(&node.name));
        let mut totals = std::mem::take(&mut inherited[idx.idx()]);
        for m in &own {
            *totals.entry(m.department).or_insert(0) += m.score * weight;
        }

        let top = totals.values().copied().max().unwrap_or(0);
        let mut winners: Vec<usize> = if top > 0 {
            totals
                .iter()
                .filter(|(_, &score)| score == top)
                .map(|(&dept, _)| dept)
                .collect()
        } else {
            Vec::new()
        };
        winners.sort_by(|a, b| names[*a].cmp(names[*b]));

        if let Some(parent) = node.parent {
            let bucket = &mut inherited[parent.idx()];
            for &dept in &winners {
                *bucket.entry(dept).or_insert(0) += top * CHILD_WEIGHT;
            }
        }

        let sum: u64 = totals.values().sum();
        let confidence = if top > 0 { top as f64 / sum as f64 } else { 0.0 };

        let mut matched_keywords: Vec<String> = Vec::new();
        for &dept in &winners {
            if let Some(m) = own.iter().find(|m| m.department == dept) {
                for kw in &m.keywords {
                    if !matched_keywords.iter().any(|k| k == kw) {
                        matched_keywords.push((*kw).to_owned());
                    }
                }
            }
        }

        let tied_departments: Vec<String> = if winners.len() > 1 {
            winners.iter().map(|&d| names[d].to_owned()).collect()
        } else {
            Vec::new()
        };
        let department = match (winners.as_slice(), policy) {
            ([], _) => None,
            ([single], _) => Some(names[*single].to_owned()),
            ([first, ..], TiePolicy::FirstAlphabetical) => Some(names[*first].to_owned()),
            (_, TiePolicy::Unassigned) => None,
        };

        results[idx.idx()] = Some(ClassificationResult {
            path: record.path.clone(),
            item_type: record.item_type,
            depth: node.depth,
            department,
            score: top,
            confidence,
            tied_departments,
            matched_keywords,
            competing_scores: totals
                .iter()
                .map(|(&dept, &score)| (names[dept].to_owned(), score))
                .collect(),
        });
    }

    let results: Vec<ClassificationResult> = results.into_iter().flatten().collect();
    let classified = results.iter().filter(|r| r.is_classified()).count();
    let tied = results.iter().filter(|r| r.is_tied()).count();
    info!(
        "Classified {} of {} items ({} tied)",
        classified,
        results.len(),
        tied
    );
    results
}
