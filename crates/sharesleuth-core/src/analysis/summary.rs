/// Run summary — totals, issue counts and department distribution.
///
/// All internal sizes are `u64` bytes; floating point is only used when
/// formatting for display.
use super::issues::{Issue, IssueType};
use crate::model::{ClassificationResult, ScanRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub total_files: u64,
    pub total_folders: u64,
    pub total_bytes: u64,
    pub total_size: String,
    pub total_issues: u64,
    /// Issue label → count, every type present even when zero.
    pub issue_counts: BTreeMap<String, u64>,
    pub explicit_permission_items: u64,
    /// Department → number of folders assigned to it.
    pub department_folders: BTreeMap<String, u64>,
    pub tied_folders: u64,
    pub unclassified_folders: u64,
}

pub fn summarize(
    records: &[ScanRecord],
    results: &[ClassificationResult],
    issues: &[Issue],
    generated_at: DateTime<Utc>,
) -> RunSummary {
    let (mut total_files, mut total_folders, mut total_bytes, mut explicit) = (0u64, 0u64, 0u64, 0u64);
    for record in records {
        if record.is_folder() {
            total_folders += 1;
        } else {
            total_files += 1;
            total_bytes = total_bytes.saturating_add(record.size_bytes);
        }
        if record.has_explicit_permissions {
            explicit += 1;
        }
    }

    let mut issue_counts: BTreeMap<String, u64> = IssueType::ALL
        .iter()
        .map(|t| (t.label().to_owned(), 0))
        .collect();
    for issue in issues {
        *issue_counts
            .entry(issue.issue_type.label().to_owned())
            .or_insert(0) += 1;
    }

    let mut department_folders: BTreeMap<String, u64> = BTreeMap::new();
    let (mut tied_folders, mut unclassified_folders) = (0u64, 0u64);
    for result in results.iter().filter(|r| r.item_type.is_folder()) {
        if result.is_tied() {
            tied_folders += 1;
        }
        match &result.department {
            Some(dept) => *department_folders.entry(dept.clone()).or_insert(0) += 1,
            None if !result.is_classified() => unclassified_folders += 1,
            None => {}
        }
    }

    RunSummary {
        generated_at,
        total_files,
        total_folders,
        total_bytes,
        total_size: format_size(total_bytes),
        total_issues: issues.len() as u64,
        issue_counts,
        explicit_permission_items: explicit,
        department_folders,
        tied_folders,
        unclassified_folders,
    }
}

/// Format a byte count into a human-readable string with appropriate unit.
///
/// Uses binary units (KiB = 1024) labelled with the common short forms.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;
    const PB: f64 = TB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else if b < TB {
        format!("{:.2} GB", b / GB)
    } else if b < PB {
        format!("{:.2} TB", b / TB)
    } else {
        format!("{:.2} PB", b / PB)
    }
}
