/// Disk-usage export reader.
///
/// Exports start with a two-line preamble (a comment line, then a header)
/// that is skipped unconditionally. Data rows are
/// `FullName,Size,LastModified[,FileCount]` with standard CSV quoting.
/// A trailing separator on `FullName` marks a folder.
use super::paths;
use crate::error::{Error, Result};
use crate::output::size;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// One parsed data row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRow {
    pub full_name: String,
    pub is_folder: bool,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub file_count: Option<u64>,
}

/// Streaming iterator over the rows of one export.
///
/// Malformed rows are logged and skipped; [`ExtractReader::malformed`]
/// reports how many.
pub struct ExtractReader {
    path: PathBuf,
    header: Vec<String>,
    rows: csv::StringRecordsIntoIter<BufReader<File>>,
    malformed: u64,
}

impl ExtractReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("cannot open extract {}: {e}", path.display())))?;
        let mut input = BufReader::new(file);

        let mut line = String::new();
        input.read_line(&mut line)?;
        line.clear();
        input.read_line(&mut line)?;
        let header = line
            .trim_start_matches('\u{feff}')
            .trim_end()
            .split(',')
            .map(|h| h.trim().trim_matches('"').to_owned())
            .collect();

        let rows = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input)
            .into_records();

        Ok(Self {
            path: path.to_path_buf(),
            header,
            rows,
            malformed: 0,
        })
    }

    /// Whether the preamble header names a `FileCount` column.
    pub fn has_file_count_column(&self) -> bool {
        self.header
            .iter()
            .any(|h| h.eq_ignore_ascii_case("FileCount"))
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

impl Iterator for ExtractReader {
    type Item = ExtractRow;

    fn next(&mut self) -> Option<ExtractRow> {
        loop {
            let record = match self.rows.next()? {
                Ok(record) => record,
                Err(err) => {
                    self.malformed += 1;
                    warn!("Skipping unreadable row in {}: {err}", self.path.display());
                    continue;
                }
            };
            match parse_row(&record) {
                Some(row) => return Some(row),
                None => {
                    self.malformed += 1;
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    warn!(
                        "Skipping malformed row {} in {}: {:?}",
                        line,
                        self.path.display(),
                        record.iter().collect::<Vec<_>>()
                    );
                }
            }
        }
    }
}

fn parse_row(record: &csv::StringRecord) -> Option<ExtractRow> {
    if record.len() < 2 {
        return None;
    }
    let full_name = record.get(0)?.trim();
    if full_name.is_empty() {
        return None;
    }
    Some(ExtractRow {
        full_name: full_name.to_owned(),
        is_folder: paths::has_trailing_separator(full_name),
        size: size::parse(record.get(1).unwrap_or("")),
        last_modified: record.get(2).and_then(parse_timestamp),
        file_count: record.get(3).and_then(|c| c.trim().parse().ok()),
    })
}

/// Accepts RFC 3339 plus the common export layouts; naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Counting pass: immediate file children per folder key.
///
/// Memory is proportional to the number of distinct parent folders.
pub fn count_immediate_files(path: &Path) -> Result<HashMap<String, u64>> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in ExtractReader::open(path)? {
        if row.is_folder {
            continue;
        }
        if let Some(parent) = paths::parent_path(&row.full_name) {
            *counts.entry(paths::path_key(parent)).or_insert(0) += 1;
        }
    }
    Ok(counts)
}
