/// Canonical CSV I/O.
///
/// Writers emit the header row explicitly so that an empty scan still
/// produces a well-formed file. Files that are rewritten in place (back-fill,
/// resume filtering, classification outputs) go through a sibling temp file
/// and a rename, so readers only ever see a complete file.
use crate::error::{Error, Result};
use crate::model::{ClassificationResult, PermissionEntry, ScanRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub const RECORD_HEADER: &[&str] = &[
    "Path",
    "Name",
    "Extension",
    "SizeBytes",
    "Created",
    "LastModified",
    "Type",
    "PathLength",
    "HasUnsupportedChars",
    "IsUnsafeExtension",
    "IsLargeFile",
    "IsTooManyFiles",
    "IsTooLongPath",
    "HasExplicitPermissions",
    "FileCountInFolder",
];

pub const PERMISSION_HEADER: &[&str] = &["Path", "Account", "AccessLevel", "AccessControlType"];

pub const CLASSIFICATION_HEADER: &[&str] = &[
    "Path",
    "Type",
    "Depth",
    "Department",
    "Score",
    "Confidence",
    "TiedDepartments",
    "MatchedKeywords",
    "CompetingScores",
];

pub const ISSUE_HEADER: &[&str] = &["IssueType", "Path", "Name", "Type", "Department", "Details"];

/// Streaming CSV writer for one row type.
pub struct CsvSink<T> {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
    rows: u64,
    _row: PhantomData<fn(&T)>,
}

impl<T: Serialize> CsvSink<T> {
    /// Create (or truncate) `path` and write `header`.
    pub fn create(path: &Path, header: &[&str]) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::output(path, e))?;
        let mut sink = Self::wrap(path, file);
        sink.writer.write_record(header)?;
        Ok(sink)
    }

    /// Open `path` for appending. A missing or empty file gets a header.
    pub fn append(path: &Path, header: &[&str]) -> Result<Self> {
        let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::output(path, e))?;
        let mut sink = Self::wrap(path, file);
        if needs_header {
            sink.writer.write_record(header)?;
        }
        Ok(sink)
    }

    fn wrap(path: &Path, file: File) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
            _row: PhantomData,
        }
    }

    pub fn write(&mut self, row: &T) -> Result<()> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush buffered rows to the OS. Called before every checkpoint so the
    /// checkpoint never claims more than what is on disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Error::output(&self.path, e))
    }

    /// Rows written through this sink (excludes the header).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        Ok(self.rows)
    }
}

pub type RecordWriter = CsvSink<ScanRecord>;
pub type PermissionWriter = CsvSink<PermissionEntry>;

/// Stream rows of `path` as `T`.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<csv::DeserializeRecordsIntoIter<File, T>> {
    let reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    Ok(reader.into_deserialize())
}

pub fn read_records(path: &Path) -> Result<Vec<ScanRecord>> {
    read_rows(path)?.map(|r| r.map_err(Error::from)).collect()
}

pub fn read_permissions(path: &Path) -> Result<Vec<PermissionEntry>> {
    read_rows(path)?.map(|r| r.map_err(Error::from)).collect()
}

/// `file.ext` → `file.ext.tmp` in the same directory.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `bytes` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);
    {
        let mut file = File::create(&tmp).map_err(|e| Error::output(&tmp, e))?;
        file.write_all(bytes).map_err(|e| Error::output(&tmp, e))?;
        file.sync_all().map_err(|e| Error::output(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::output(path, e))
}

/// Write a whole CSV through a temp file, then rename it over `path`.
pub fn write_csv_atomic<T, I>(path: &Path, header: &[&str], rows: I) -> Result<u64>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let tmp = temp_sibling(path);
    let mut sink = CsvSink::<T>::create(&tmp, header)?;
    for row in rows {
        sink.write(&row)?;
    }
    let written = sink.finish()?;
    fs::rename(&tmp, path).map_err(|e| Error::output(path, e))?;
    Ok(written)
}

/// Stream `path` through `edit`, keeping rows for which it returns `Some`,
/// and atomically replace the file. Returns `(kept, read)`.
pub fn rewrite_csv<T, F>(path: &Path, header: &[&str], mut edit: F) -> Result<(u64, u64)>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(T) -> Option<T>,
{
    let tmp = temp_sibling(path);
    let mut sink = CsvSink::<T>::create(&tmp, header)?;
    let mut read = 0u64;
    for row in read_rows::<T>(path)? {
        read += 1;
        if let Some(row) = edit(row?) {
            sink.write(&row)?;
        }
    }
    let kept = sink.finish()?;
    fs::rename(&tmp, path).map_err(|e| Error::output(path, e))?;
    Ok((kept, read))
}

/// Flat CSV form of a [`ClassificationResult`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassificationRow<'a> {
    pub path: &'a str,
    #[serde(rename = "Type")]
    pub item_type: &'static str,
    pub depth: u32,
    pub department: &'a str,
    pub score: u64,
    pub confidence: String,
    pub tied_departments: String,
    pub matched_keywords: String,
    pub competing_scores: String,
}

impl<'a> From<&'a ClassificationResult> for ClassificationRow<'a> {
    fn from(r: &'a ClassificationResult) -> Self {
        Self {
            path: &r.path,
            item_type: r.item_type.label(),
            depth: r.depth,
            department: r.department.as_deref().unwrap_or(""),
            score: r.score,
            confidence: format!("{:.4}", r.confidence),
            tied_departments: r.tied_departments.join("; "),
            matched_keywords: r.matched_keywords.join("; "),
            competing_scores: r
                .competing_scores
                .iter()
                .map(|(dept, score)| format!("{dept}={score}"))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

/// `True`/`False` booleans, as the downstream renderer expects.
pub mod true_false {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.trim() {
            t if t.eq_ignore_ascii_case("true") || t == "1" => Ok(true),
            f if f.eq_ignore_ascii_case("false") || f == "0" || f.is_empty() => Ok(false),
            other => Err(de::Error::custom(format!("invalid boolean {other:?}"))),
        }
    }
}

/// Optional UTC timestamps as RFC 3339 with full sub-second precision.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = String::deserialize(d)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// Byte sizes: integers, with a decimal fallback for exported values that
/// overflow or are written in floating-point notation.
pub mod size {
    use serde::{Deserialize, Deserializer};

    /// Parse a size cell. Unparseable or negative values become 0.
    pub fn parse(raw: &str) -> u64 {
        let raw = raw.trim();
        if raw.is_empty() {
            return 0;
        }
        if let Ok(n) = raw.parse::<u64>() {
            return n;
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() && f > 0.0 => f.round().min(u64::MAX as f64) as u64,
            _ => 0,
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(parse(&raw))
    }
}
