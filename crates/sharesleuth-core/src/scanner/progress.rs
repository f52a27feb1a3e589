/// Progress messages sent from the scan thread over a crossbeam channel.
///
/// Messages carry counters and paths only; records go straight to disk.
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// A root is about to be walked. `index` is zero-based.
    RootStarted {
        root: PathBuf,
        index: usize,
        total: usize,
    },
    /// Running totals for this run, sent after every batch.
    Update {
        folders_found: u64,
        files_found: u64,
        current_path: String,
    },
    /// An item could not be read and was left out of the inventory.
    Skipped { path: String, message: String },
    /// The checkpoint was persisted. Totals include resumed work.
    Checkpointed { folders: u64, files: u64 },
    /// Both passes over `root` finished.
    RootCompleted {
        root: PathBuf,
        folders: u64,
        files: u64,
    },
    Complete { duration: Duration, skipped: u64 },
}
