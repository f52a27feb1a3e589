/// Classification output types.
use crate::model::ItemType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do with `department` when several departments share the top score.
///
/// Ties are always listed in `tied_departments`; the policy only decides
/// whether one of them is also promoted to the department column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TiePolicy {
    /// Leave `department` empty for tied items.
    #[default]
    Unassigned,
    /// Promote the alphabetically first tied department.
    FirstAlphabetical,
}

/// The classification of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub path: String,
    pub item_type: ItemType,
    /// Levels below the tree root the item belongs to (roots are 0).
    pub depth: u32,
    /// `None` when unclassified, or tied under [`TiePolicy::Unassigned`].
    pub department: Option<String>,
    /// Top total score. 0 means unclassified.
    pub score: u64,
    /// Share of the item's total evidence held by the top score (0.0–1.0).
    pub confidence: f64,
    /// Every department sharing the top score when there is more than one,
    /// sorted by name. Empty for a single winner.
    pub tied_departments: Vec<String>,
    /// Keywords of the winning department(s) found in the item's own name.
    pub matched_keywords: Vec<String>,
    /// Every department with a non-zero total.
    pub competing_scores: BTreeMap<String, u64>,
}

impl ClassificationResult {
    #[inline]
    pub fn is_classified(&self) -> bool {
        self.score > 0
    }

    #[inline]
    pub fn is_tied(&self) -> bool {
        !self.tied_departments.is_empty()
    }
}
