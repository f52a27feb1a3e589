/// Schema normalizer: every record, whether it came from a live walk or a
/// disk-usage export, is built here so both sources yield identical rows.
pub mod backfill;
pub mod extract;
pub mod paths;

use crate::flags::{evaluate, FlagRules};
use crate::model::{ItemType, ScanRecord};
use crate::output::RecordWriter;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::Metadata;
use std::path::Path;
use tracing::{debug, info};

pub use backfill::{backfill, ExplicitPaths};
pub use extract::{ExtractReader, ExtractRow};

/// Source-independent facts about one item.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub path: String,
    pub item_type: ItemType,
    pub size_bytes: u64,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub file_count: u64,
}

/// Derive name, extension, path length and flags for `item`.
pub fn build_record(item: RawItem, rules: &FlagRules) -> ScanRecord {
    let is_folder = item.item_type.is_folder();
    let name = paths::leaf_name(&item.path).to_owned();
    let extension = if is_folder {
        String::new()
    } else {
        paths::extension_of(&name).to_owned()
    };
    // Extract folders carry a trailing separator as a type marker; it is
    // not part of the path a migration target sees.
    let measured = if is_folder {
        paths::trim_trailing_separators(&item.path)
    } else {
        item.path.as_str()
    };
    let path_length = measured.chars().count();

    let mut record = ScanRecord {
        name,
        extension,
        size_bytes: if is_folder { 0 } else { item.size_bytes },
        created: item.created,
        last_modified: item.last_modified,
        item_type: item.item_type,
        path_length,
        has_unsupported_chars: false,
        is_unsafe_extension: false,
        is_large_file: false,
        is_too_many_files: false,
        is_too_long_path: false,
        has_explicit_permissions: false,
        file_count_in_folder: if is_folder { item.file_count } else { 0 },
        path: item.path,
    };
    evaluate(&record, rules).apply(&mut record);
    record
}

/// Build a record from live filesystem metadata.
pub fn record_from_metadata(
    path: &Path,
    meta: &Metadata,
    file_count: u64,
    rules: &FlagRules,
) -> ScanRecord {
    let item_type = if meta.is_dir() {
        ItemType::Folder
    } else {
        ItemType::File
    };
    build_record(
        RawItem {
            path: path.to_string_lossy().into_owned(),
            item_type,
            size_bytes: meta.len(),
            created: meta.created().ok().map(DateTime::<Utc>::from),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            file_count,
        },
        rules,
    )
}

/// Build a record from a parsed extract row. `counts` supplies immediate
/// file counts when the extract has no `FileCount` column.
pub fn record_from_extract(
    row: ExtractRow,
    counts: Option<&HashMap<String, u64>>,
    rules: &FlagRules,
) -> ScanRecord {
    let item_type = if row.is_folder {
        ItemType::Folder
    } else {
        ItemType::File
    };
    let file_count = match (row.file_count, counts) {
        (Some(n), _) => n,
        (None, Some(counts)) if row.is_folder => counts
            .get(&paths::path_key(&row.full_name))
            .copied()
            .unwrap_or(0),
        _ => 0,
    };
    build_record(
        RawItem {
            path: row.full_name,
            item_type,
            size_bytes: row.size,
            created: None,
            last_modified: row.last_modified,
            file_count,
        },
        rules,
    )
}

/// Counters from normalizing one or more extracts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractTotals {
    pub folders: u64,
    pub files: u64,
    pub malformed: u64,
}

/// Stream every row of `extract` into `writer`.
pub fn normalize_extract(
    extract: &Path,
    rules: &FlagRules,
    writer: &mut RecordWriter,
) -> crate::Result<ExtractTotals> {
    let counts = {
        let header_check = ExtractReader::open(extract)?;
        if header_check.has_file_count_column() {
            None
        } else {
            debug!(
                "{} has no FileCount column, running counting pass",
                extract.display()
            );
            Some(extract::count_immediate_files(extract)?)
        }
    };

    let mut totals = ExtractTotals::default();
    let mut reader = ExtractReader::open(extract)?;
    for row in reader.by_ref() {
        let record = record_from_extract(row, counts.as_ref(), rules);
        if record.is_folder() {
            totals.folders += 1;
        } else {
            totals.files += 1;
        }
        writer.write(&record)?;
    }
    totals.malformed = reader.malformed();

    info!(
        "Normalized {}: {} folders, {} files, {} malformed rows",
        extract.display(),
        totals.folders,
        totals.files,
        totals.malformed
    );
    Ok(totals)
}
