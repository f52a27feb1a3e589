/// Scan checkpoint persistence and the reuse/resume decision.
///
/// A checkpoint moves through **Fresh** (nothing usable on disk) →
/// **Loaded** (a checkpoint file parsed) → **Reusable** or **Stale**.
/// Reusable output lets the pipeline skip scanning entirely; a stale but
/// interrupted scan of the same roots can be resumed root by root.
use crate::config::ScanConfig;
use crate::error::Result;
use crate::normalize::paths::path_key;
use crate::output::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk checkpoint document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    /// Start time of the scan that produced the outputs.
    #[serde(default)]
    pub last_scan_time: Option<DateTime<Utc>>,
    /// Roots (or extracts) the outputs were built from.
    #[serde(default)]
    pub scan_paths: Option<Vec<PathBuf>>,
    /// Roots whose scan finished.
    #[serde(default)]
    pub completed_paths: Vec<PathBuf>,
    #[serde(default)]
    pub last_completed_path: Option<String>,
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub folders_processed: u64,
    #[serde(default)]
    pub raw_data_file: Option<PathBuf>,
    #[serde(default)]
    pub permissions_file: Option<PathBuf>,
    /// Set once `HasExplicitPermissions` has been back-filled into the raw
    /// data. Older checkpoints lack it and get back-filled on reuse.
    #[serde(default)]
    pub backfilled: bool,
}

impl CheckpointState {
    /// Checkpoints written before root tracking existed cannot be trusted.
    pub fn is_old_format(&self) -> bool {
        self.last_scan_time.is_none() || self.scan_paths.is_none()
    }

    /// Whether `root` is among the completed roots, compared the way roots
    /// are matched everywhere else: case-insensitive, separators ignored.
    pub fn is_complete(&self, root: &Path) -> bool {
        let key = path_key(&root.to_string_lossy());
        self.completed_paths
            .iter()
            .any(|p| path_key(&p.to_string_lossy()) == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointStatus {
    Fresh,
    Loaded,
}

/// Why prior output cannot be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    NoCheckpoint,
    ForcedRescan,
    OldFormat,
    RootSetChanged,
    Incomplete { pending: usize },
    MissingOutputs,
    OutputsExpired,
    RootModified(PathBuf),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCheckpoint => write!(f, "no checkpoint"),
            Self::ForcedRescan => write!(f, "rescan forced"),
            Self::OldFormat => write!(f, "checkpoint predates root tracking"),
            Self::RootSetChanged => write!(f, "configured roots changed"),
            Self::Incomplete { pending } => write!(f, "{pending} root(s) not finished"),
            Self::MissingOutputs => write!(f, "scan outputs missing"),
            Self::OutputsExpired => write!(f, "scan outputs older than the freshness window"),
            Self::RootModified(root) => write!(f, "{} modified since last scan", root.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Reusable,
    Stale(StaleReason),
}

/// What the scan stage should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Outputs are current; do not scan.
    Reuse,
    /// Keep rows under `completed`, scan the remaining roots in append mode.
    Resume { completed: Vec<PathBuf> },
    /// Truncate outputs and scan every root.
    Full { reason: StaleReason },
}

pub struct CheckpointManager {
    path: PathBuf,
    state: CheckpointState,
    status: CheckpointStatus,
    cadence: (u64, u64),
    folders_since_save: u64,
    files_since_save: u64,
}

impl CheckpointManager {
    /// Load the checkpoint for `config`. A missing or unparseable file
    /// yields a Fresh manager; corruption is logged, never fatal.
    pub fn load(config: &ScanConfig) -> Self {
        let path = config.checkpoint_path();
        let (state, status) = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<CheckpointState>(&bytes) {
                Ok(state) => (state, CheckpointStatus::Loaded),
                Err(err) => {
                    warn!(
                        "Ignoring unreadable checkpoint {}: {err}",
                        path.display()
                    );
                    (CheckpointState::default(), CheckpointStatus::Fresh)
                }
            },
            Err(err) => {
                debug!("No checkpoint at {}: {err}", path.display());
                (CheckpointState::default(), CheckpointStatus::Fresh)
            }
        };
        Self {
            path,
            state,
            status,
            cadence: (config.checkpoint_every.folders, config.checkpoint_every.files),
            folders_since_save: 0,
            files_since_save: 0,
        }
    }

    pub fn status(&self) -> CheckpointStatus {
        self.status
    }

    pub fn state(&self) -> &CheckpointState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decide whether prior output can be reused as-is.
    pub fn assess(&self, config: &ScanConfig, now: DateTime<Utc>) -> Freshness {
        if self.status == CheckpointStatus::Fresh {
            return Freshness::Stale(StaleReason::NoCheckpoint);
        }
        if config.force_rescan {
            return Freshness::Stale(StaleReason::ForcedRescan);
        }
        if self.state.is_old_format() {
            return Freshness::Stale(StaleReason::OldFormat);
        }
        if !self.same_sources(config) {
            return Freshness::Stale(StaleReason::RootSetChanged);
        }
        let pending = self.pending_sources(config).len();
        if pending > 0 {
            return Freshness::Stale(StaleReason::Incomplete { pending });
        }
        if let Some(reason) = outputs_problem(config, now) {
            return Freshness::Stale(reason);
        }
        if let Some(root) = self.modified_source(config) {
            return Freshness::Stale(StaleReason::RootModified(root));
        }
        Freshness::Reusable
    }

    /// Turn the freshness decision into a plan for the scan stage.
    pub fn plan(&self, config: &ScanConfig, now: DateTime<Utc>) -> ScanPlan {
        match self.assess(config, now) {
            Freshness::Reusable => ScanPlan::Reuse,
            Freshness::Stale(StaleReason::Incomplete { .. })
                if config.resume && config.extracts.is_empty() =>
            {
                match outputs_problem(config, now) {
                    None => ScanPlan::Resume {
                        completed: self.completed_sources(config),
                    },
                    Some(reason) => ScanPlan::Full { reason },
                }
            }
            Freshness::Stale(reason) => ScanPlan::Full { reason },
        }
    }

    /// Reset the state for a new scan, or keep it when resuming.
    ///
    /// `kept` is the `(folders, files)` already present in retained output.
    pub fn begin(&mut self, config: &ScanConfig, started: DateTime<Utc>, resume: bool, kept: (u64, u64)) {
        if !resume {
            self.state = CheckpointState {
                last_scan_time: Some(started),
                scan_paths: Some(config.source_paths().to_vec()),
                completed_paths: Vec::new(),
                last_completed_path: None,
                files_processed: 0,
                folders_processed: 0,
                raw_data_file: Some(config.raw_data_path()),
                permissions_file: Some(config.permissions_path()),
                backfilled: false,
            };
        }
        self.state.backfilled = false;
        self.state.folders_processed = kept.0;
        self.state.files_processed = kept.1;
        self.status = CheckpointStatus::Loaded;
        self.folders_since_save = 0;
        self.files_since_save = 0;
    }

    /// Account for processed items. Returns `true` once a save is due.
    pub fn record(&mut self, folders: u64, files: u64, last_path: Option<&str>) -> bool {
        self.state.folders_processed += folders;
        self.state.files_processed += files;
        self.folders_since_save += folders;
        self.files_since_save += files;
        if let Some(path) = last_path {
            self.state.last_completed_path = Some(path.to_owned());
        }
        self.folders_since_save >= self.cadence.0 || self.files_since_save >= self.cadence.1
    }

    pub fn is_complete(&self, root: &Path) -> bool {
        self.state.is_complete(root)
    }

    pub fn mark_complete(&mut self, root: &Path) {
        if !self.is_complete(root) {
            self.state.completed_paths.push(root.to_path_buf());
        }
    }

    pub fn mark_backfilled(&mut self) {
        self.state.backfilled = true;
    }

    /// Atomically persist the current state.
    pub fn save(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.state)?;
        write_atomic(&self.path, &bytes)?;
        self.folders_since_save = 0;
        self.files_since_save = 0;
        debug!(
            "Checkpoint saved: {} folders, {} files",
            self.state.folders_processed, self.state.files_processed
        );
        Ok(())
    }

    fn same_sources(&self, config: &ScanConfig) -> bool {
        let recorded: HashSet<String> = self
            .state
            .scan_paths
            .iter()
            .flatten()
            .map(|p| path_key(&p.to_string_lossy()))
            .collect();
        let configured: HashSet<String> = config
            .source_paths()
            .iter()
            .map(|p| path_key(&p.to_string_lossy()))
            .collect();
        recorded == configured
    }

    fn completed_sources(&self, config: &ScanConfig) -> Vec<PathBuf> {
        config
            .source_paths()
            .iter()
            .filter(|p| self.is_complete(p))
            .cloned()
            .collect()
    }

    fn pending_sources<'a>(&self, config: &'a ScanConfig) -> Vec<&'a PathBuf> {
        config
            .source_paths()
            .iter()
            .filter(|p| !self.is_complete(p))
            .collect()
    }

    fn modified_source(&self, config: &ScanConfig) -> Option<PathBuf> {
        let since = self.state.last_scan_time?;
        config.source_paths().iter().find_map(|root| {
            let modified = fs::metadata(root).and_then(|m| m.modified()).ok()?;
            (DateTime::<Utc>::from(modified) > since).then(|| root.clone())
        })
    }
}

/// Both outputs must exist and be younger than the freshness window.
fn outputs_problem(config: &ScanConfig, now: DateTime<Utc>) -> Option<StaleReason> {
    let window = chrono::Duration::from_std(config.freshness_window()).ok()?;
    for output in [config.raw_data_path(), config.permissions_path()] {
        let modified = match fs::metadata(&output).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return Some(StaleReason::MissingOutputs),
        };
        if now.signed_duration_since(modified) > window {
            return Some(StaleReason::OutputsExpired);
        }
    }
    None
}
