/// Scanner module — background enumeration of the configured roots.
///
/// Each root is walked twice with `jwalk`: a folders pass (root included)
/// followed by an optional files pass. Entries are batched and every batch
/// is processed on a bounded rayon pool (metadata, immediate file counts,
/// flags, explicit ACL diff), then written sequentially to the canonical
/// CSVs. Item-level failures are logged, counted and reported as
/// [`ScanProgress::Skipped`]; they never stop the scan.
pub mod progress;
mod walk;

use crate::checkpoint::CheckpointManager;
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::flags::FlagRules;
use crate::platform::AclSource;
use progress::ScanProgress;

use crossbeam_channel::Receiver;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

/// Maximum number of progress messages that may queue up in the channel.
///
/// When the consumer falls behind the scanner blocks briefly on `send`
/// instead of growing the queue without bound.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Everything the scan thread needs, moved into it on start.
pub struct ScanJob {
    pub roots: Vec<PathBuf>,
    pub rules: FlagRules,
    pub concurrency: usize,
    pub scan_files: bool,
    pub raw_data: PathBuf,
    pub permissions: PathBuf,
    /// Append to existing outputs (resume) instead of truncating them.
    pub append: bool,
    pub acl: Arc<dyn AclSource>,
    pub checkpoint: CheckpointManager,
}

impl ScanJob {
    pub fn from_config(
        config: &ScanConfig,
        acl: Arc<dyn AclSource>,
        checkpoint: CheckpointManager,
        append: bool,
    ) -> Self {
        Self {
            roots: config.root_paths.clone(),
            rules: FlagRules::from_config(config),
            concurrency: config.concurrency.max(1),
            scan_files: config.scan_files,
            raw_data: config.raw_data_path(),
            permissions: config.permissions_path(),
            append,
            acl,
            checkpoint,
        }
    }
}

/// Counters for the work done by one scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCounts {
    pub folders: u64,
    pub files: u64,
    pub skipped: u64,
    pub acl_failures: u64,
    pub permission_entries: u64,
}

pub struct ScanOutcome {
    pub counts: ScanCounts,
    /// The checkpoint as last saved, with every scanned root completed.
    pub checkpoint: CheckpointManager,
    pub duration: Duration,
}

/// Handle to a running scan.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    thread: thread::JoinHandle<Result<ScanOutcome>>,
}

impl ScanHandle {
    /// Drain progress messages into `on_progress` until the scan thread
    /// exits, then return its outcome.
    pub fn wait_with<F>(self, mut on_progress: F) -> Result<ScanOutcome>
    where
        F: FnMut(&ScanProgress),
    {
        for message in self.progress_rx.iter() {
            on_progress(&message);
        }
        self.thread.join().map_err(|_| Error::Stage {
            stage: "scan",
            message: "scanner thread panicked".into(),
        })?
    }

    pub fn wait(self) -> Result<ScanOutcome> {
        self.wait_with(|_| {})
    }
}

/// Start a scan on a background thread.
pub fn start_scan(job: ScanJob) -> Result<ScanHandle> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);

    let thread = thread::Builder::new()
        .name("sharesleuth-scanner".into())
        .spawn(move || {
            info!(
                "Starting scan of {} root(s) with {} workers",
                job.roots.len(),
                job.concurrency
            );
            walk::run(job, progress_tx)
        })?;

    Ok(ScanHandle {
        progress_rx,
        thread,
    })
}
