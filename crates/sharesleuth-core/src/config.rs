/// Typed run configuration, loaded from JSON and validated up front.
///
/// Every recognised field is enumerated here. Optional fields carry explicit
/// defaults so no stage has to probe for missing values.
use crate::error::{Error, Result};
use crate::model::TiePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names written inside [`ScanConfig::output_dir`].
pub const RAW_DATA_FILE: &str = "raw_data.csv";
pub const PERMISSIONS_FILE: &str = "permissions.csv";
pub const CHECKPOINT_FILE: &str = "scan_checkpoint.json";
pub const CLASSIFIED_FILE: &str = "classified.csv";
pub const ISSUES_FILE: &str = "issues.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Migration limits. All three are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Paths strictly longer than this (in characters) are flagged.
    pub max_path_length: usize,
    /// Files strictly larger than this (in bytes) are flagged.
    pub max_file_size: u64,
    /// Folders with strictly more immediate files than this are flagged.
    pub max_files_per_folder: u64,
}

/// How often the scanner persists its checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointCadence {
    pub folders: u64,
    pub files: u64,
}

impl Default for CheckpointCadence {
    fn default() -> Self {
        Self {
            folders: 500,
            files: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Roots to enumerate on a live scan.
    #[serde(default)]
    pub root_paths: Vec<PathBuf>,

    /// Disk-usage export CSVs. When non-empty they replace the live scan.
    #[serde(default)]
    pub extracts: Vec<PathBuf>,

    /// Permissions CSV accompanying `extracts`, used for the back-fill.
    #[serde(default)]
    pub permission_extract: Option<PathBuf>,

    /// `Department,Keywords` CSV. Required before classification.
    #[serde(default)]
    pub keyword_file: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    pub thresholds: Thresholds,

    #[serde(default = "default_unsafe_extensions")]
    pub unsafe_extensions: Vec<String>,

    #[serde(default = "default_unsupported_characters")]
    pub unsupported_characters: Vec<char>,

    /// Maximum age of prior outputs that may be reused.
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: u64,

    /// Upper bound on worker threads for enumeration and item processing.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Run the second (files) pass after folders.
    #[serde(default = "default_true")]
    pub scan_files: bool,

    #[serde(default)]
    pub checkpoint_every: CheckpointCadence,

    #[serde(default)]
    pub tie_policy: TiePolicy,

    /// Continue an interrupted scan instead of starting over.
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Ignore any reusable prior output.
    #[serde(default)]
    pub force_rescan: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_unsafe_extensions() -> Vec<String> {
    [
        ".exe", ".dll", ".bat", ".cmd", ".com", ".msi", ".ps1", ".vbs", ".js", ".scr", ".pif",
        ".reg", ".hta", ".jar",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_unsupported_characters() -> Vec<char> {
    vec!['"', '*', ':', '<', '>', '?', '/', '\\', '|']
}

fn default_freshness_hours() -> u64 {
    24
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

fn default_true() -> bool {
    true
}

impl ScanConfig {
    /// Build a configuration with defaults for everything but the thresholds.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            root_paths: Vec::new(),
            extracts: Vec::new(),
            permission_extract: None,
            keyword_file: None,
            output_dir: default_output_dir(),
            thresholds,
            unsafe_extensions: default_unsafe_extensions(),
            unsupported_characters: default_unsupported_characters(),
            freshness_hours: default_freshness_hours(),
            concurrency: default_concurrency(),
            scan_files: true,
            checkpoint_every: CheckpointCadence::default(),
            tie_policy: TiePolicy::default(),
            resume: true,
            force_rescan: false,
        }
    }

    /// Parse a JSON configuration. Missing thresholds are rejected here.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Check everything a full run needs, including the keyword file.
    pub fn validate(&self) -> Result<()> {
        self.validate_scan()?;
        self.validate_keywords()
    }

    /// Check invariants that serde cannot express for the scan stage.
    ///
    /// Live scans need at least one existing root; extract runs need every
    /// extract to exist.
    pub fn validate_scan(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        if self.freshness_hours == 0 {
            return Err(Error::Config("freshnessHours must be at least 1".into()));
        }
        if self.checkpoint_every.folders == 0 || self.checkpoint_every.files == 0 {
            return Err(Error::Config(
                "checkpointEvery values must be at least 1".into(),
            ));
        }
        if self.thresholds.max_path_length == 0 {
            return Err(Error::Config("thresholds.maxPathLength must be positive".into()));
        }

        if self.extracts.is_empty() {
            if self.root_paths.is_empty() {
                return Err(Error::Config("no rootPaths configured".into()));
            }
            if !self.root_paths.iter().any(|p| p.exists()) {
                return Err(Error::Config(
                    "none of the configured rootPaths can be resolved".into(),
                ));
            }
        } else if let Some(missing) = self.extracts.iter().find(|p| !p.is_file()) {
            return Err(Error::Config(format!(
                "extract not found: {}",
                missing.display()
            )));
        }
        if let Some(perms) = &self.permission_extract {
            if !perms.is_file() {
                return Err(Error::Config(format!(
                    "permission extract not found: {}",
                    perms.display()
                )));
            }
        }
        Ok(())
    }

    /// Classification needs an existing keyword file.
    pub fn validate_keywords(&self) -> Result<()> {
        match &self.keyword_file {
            None => Err(Error::Config("no keywordFile configured".into())),
            Some(path) if !path.is_file() => Err(Error::Config(format!(
                "keyword file not found: {}",
                path.display()
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Paths that identify the data source in the checkpoint.
    pub fn source_paths(&self) -> &[PathBuf] {
        if self.extracts.is_empty() {
            &self.root_paths
        } else {
            &self.extracts
        }
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_hours * 3_600)
    }

    pub fn raw_data_path(&self) -> PathBuf {
        self.output_dir.join(RAW_DATA_FILE)
    }

    pub fn permissions_path(&self) -> PathBuf {
        self.output_dir.join(PERMISSIONS_FILE)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.output_dir.join(CHECKPOINT_FILE)
    }

    pub fn classified_path(&self) -> PathBuf {
        self.output_dir.join(CLASSIFIED_FILE)
    }

    pub fn issues_path(&self) -> PathBuf {
        self.output_dir.join(ISSUES_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "rootPaths": ["."],
        "keywordFile": "keywords.csv",
        "thresholds": { "maxPathLength": 400, "maxFileSize": 262144000, "maxFilesPerFolder": 5000 }
    }"#;

    #[test]
    fn defaults_are_explicit() {
        let cfg = ScanConfig::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.freshness_hours, 24);
        assert!(cfg.scan_files);
        assert!(cfg.resume);
        assert!(!cfg.force_rescan);
        assert_eq!(cfg.checkpoint_every, CheckpointCadence::default());
        assert_eq!(cfg.tie_policy, TiePolicy::Unassigned);
        assert!(cfg.concurrency >= 1);
        assert!(cfg.unsupported_characters.contains(&'|'));
        assert_eq!(cfg.raw_data_path(), PathBuf::from("output").join(RAW_DATA_FILE));
    }

    #[test]
    fn missing_thresholds_are_fatal() {
        let err = ScanConfig::from_json(r#"{ "rootPaths": ["."] }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let partial = r#"{ "thresholds": { "maxPathLength": 10, "maxFileSize": 1 } }"#;
        assert!(ScanConfig::from_json(partial).is_err());
    }

    #[test]
    fn validate_rejects_unresolvable_roots() {
        let mut cfg = ScanConfig::from_json(MINIMAL).unwrap();
        cfg.root_paths = vec![PathBuf::from("/no/such/root/anywhere")];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("rootPaths"));
    }

    #[test]
    fn validate_requires_keyword_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut cfg = ScanConfig::from_json(MINIMAL).unwrap();
        cfg.root_paths = vec![tmp.path().to_path_buf()];
        cfg.keyword_file = None;
        assert!(cfg.validate().is_err());

        let kw = tmp.path().join("k.csv");
        std::fs::write(&kw, "Department,Keywords\nFinance,finance\n").unwrap();
        cfg.keyword_file = Some(kw);
        cfg.validate().unwrap();
    }

    #[test]
    fn tie_policy_parses_camel_case() {
        let json = MINIMAL.replacen('{', r#"{ "tiePolicy": "firstAlphabetical","#, 1);
        let cfg = ScanConfig::from_json(&json).unwrap();
        assert_eq!(cfg.tie_policy, TiePolicy::FirstAlphabetical);
    }
}
