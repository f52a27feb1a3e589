/// Issue inventory: one row per raised blocker flag.
///
/// Items without a department of their own are attributed to their
/// nearest classified ancestor, or `Unclassified` when there is none.
use super::summary::format_size;
use crate::config::Thresholds;
use crate::model::{ClassificationResult, ItemType, ScanRecord};
use crate::normalize::paths::{ancestor_keys, path_key};
use serde::Serialize;
use std::collections::HashMap;

pub const UNCLASSIFIED: &str = "Unclassified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IssueType {
    #[serde(rename = "Long Path")]
    LongPath,
    #[serde(rename = "Large File")]
    LargeFile,
    #[serde(rename = "Too Many Files")]
    TooManyFiles,
    #[serde(rename = "Unsupported Characters")]
    UnsupportedCharacters,
    #[serde(rename = "Unsafe Extension")]
    UnsafeExtension,
}

impl IssueType {
    pub const ALL: [IssueType; 5] = [
        Self::LongPath,
        Self::LargeFile,
        Self::TooManyFiles,
        Self::UnsupportedCharacters,
        Self::UnsafeExtension,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::LongPath => "Long Path",
            Self::LargeFile => "Large File",
            Self::TooManyFiles => "Too Many Files",
            Self::UnsupportedCharacters => "Unsupported Characters",
            Self::UnsafeExtension => "Unsafe Extension",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Issue {
    pub issue_type: IssueType,
    pub path: String,
    pub name: String,
    #[serde(rename = "Type")]
    pub item_type: ItemType,
    pub department: String,
    pub details: String,
}

/// Build the issue list, sorted by department, issue type, then path.
pub fn collect_issues(
    records: &[ScanRecord],
    results: &[ClassificationResult],
    thresholds: &Thresholds,
) -> Vec<Issue> {
    let departments: HashMap<String, &str> = results
        .iter()
        .filter_map(|r| Some((path_key(&r.path), r.department.as_deref()?)))
        .collect();

    let department_of = |path: &str| -> String {
        let key = path_key(path);
        let department = std::iter::once(key.as_str())
            .chain(ancestor_keys(&key))
            .find_map(|k| departments.get(k))
            .map_or_else(|| UNCLASSIFIED.to_owned(), |d| (*d).to_owned());
        department
    };

    let mut issues = Vec::new();
    for record in records.iter().filter(|r| r.has_blocker()) {
        let department = department_of(&record.path);
        let mut push = |issue_type: IssueType, details: String| {
            issues.push(Issue {
                issue_type,
                path: record.path.clone(),
                name: record.name.clone(),
                item_type: record.item_type,
                department: department.clone(),
                details,
            });
        };

        if record.is_too_long_path {
            push(
                IssueType::LongPath,
                format!(
                    "Path is {} characters (limit {})",
                    record.path_length, thresholds.max_path_length
                ),
            );
        }
        if record.is_large_file {
            push(
                IssueType::LargeFile,
                format!(
                    "File is {} (limit {})",
                    format_size(record.size_bytes),
                    format_size(thresholds.max_file_size)
                ),
            );
        }
        if record.is_too_many_files {
            push(
                IssueType::TooManyFiles,
                format!(
                    "Folder holds {} files (limit {})",
                    record.file_count_in_folder, thresholds.max_files_per_folder
                ),
            );
        }
        if record.has_unsupported_chars {
            push(
                IssueType::UnsupportedCharacters,
                "Name contains unsupported characters or a trailing space or period".to_owned(),
            );
        }
        if record.is_unsafe_extension {
            push(
                IssueType::UnsafeExtension,
                format!("Extension {} is blocked", record.extension),
            );
        }
    }

    issues.sort_by(|a, b| {
        a.department
            .cmp(&b.department)
            .then_with(|| a.issue_type.cmp(&b.issue_type))
            .then_with(|| a.path.cmp(&b.path))
    });
    issues
}
