/// The scan loop: jwalk enumeration, per-batch parallel processing on a
/// bounded rayon pool, sequential CSV writes and checkpoint cadence.
use super::progress::ScanProgress;
use super::{ScanCounts, ScanJob, ScanOutcome};
use crate::checkpoint::CheckpointManager;
use crate::error::Result;
use crate::flags::FlagRules;
use crate::model::{PermissionEntry, ScanRecord};
use crate::normalize;
use crate::output::{PermissionWriter, RecordWriter, PERMISSION_HEADER, RECORD_HEADER};
use crate::permissions::{self, AclSnapshot};
use crate::platform::AclSource;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Entries collected before a batch is handed to the worker pool.
const BATCH_SIZE: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Folders,
    Files,
}

enum ItemOutcome {
    Record {
        record: ScanRecord,
        permissions: Vec<PermissionEntry>,
        acl_error: Option<String>,
    },
    Skipped {
        path: String,
        message: String,
    },
}

/// Parent ACLs fetched during one batch. Siblings share a parent, so most
/// lookups after the first are hits.
struct ParentAcls<'a> {
    source: &'a dyn AclSource,
    cache: Mutex<HashMap<PathBuf, Option<Arc<AclSnapshot>>>>,
}

impl<'a> ParentAcls<'a> {
    fn new(source: &'a dyn AclSource) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// `None` means "no parent data", which makes the child eligible.
    fn get(&self, parent: &Path) -> Option<Arc<AclSnapshot>> {
        if let Some(hit) = self.cache.lock().get(parent) {
            return hit.clone();
        }
        // Query outside the lock; a racing duplicate query is harmless.
        let snapshot = self.source.query(parent).ok().flatten().map(Arc::new);
        self.cache
            .lock()
            .insert(parent.to_path_buf(), snapshot.clone());
        snapshot
    }
}

struct Walker {
    pool: rayon::ThreadPool,
    rules: FlagRules,
    acl: Arc<dyn AclSource>,
    concurrency: usize,
    records: RecordWriter,
    permissions: PermissionWriter,
    checkpoint: CheckpointManager,
    counts: ScanCounts,
    tx: Sender<ScanProgress>,
}

pub(super) fn run(job: ScanJob, tx: Sender<ScanProgress>) -> Result<ScanOutcome> {
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(job.concurrency)
        .thread_name(|i| format!("sharesleuth-worker-{i}"))
        .build()?;

    let (records, permissions) = if job.append {
        (
            RecordWriter::append(&job.raw_data, RECORD_HEADER)?,
            PermissionWriter::append(&job.permissions, PERMISSION_HEADER)?,
        )
    } else {
        (
            RecordWriter::create(&job.raw_data, RECORD_HEADER)?,
            PermissionWriter::create(&job.permissions, PERMISSION_HEADER)?,
        )
    };

    let mut walker = Walker {
        pool,
        rules: job.rules,
        acl: job.acl,
        concurrency: job.concurrency,
        records,
        permissions,
        checkpoint: job.checkpoint,
        counts: ScanCounts::default(),
        tx,
    };

    let total = job.roots.len();
    for (index, root) in job.roots.iter().enumerate() {
        if walker.checkpoint.is_complete(root) {
            info!("Skipping completed root {}", root.display());
            continue;
        }
        walker.scan_root(root, index, total, job.scan_files)?;
    }

    walker.records.flush()?;
    walker.permissions.flush()?;
    walker.checkpoint.save()?;

    let duration = start.elapsed();
    info!(
        "Scan complete: {} folders, {} files, {} skipped in {:?}",
        walker.counts.folders, walker.counts.files, walker.counts.skipped, duration
    );
    let _ = walker.tx.send(ScanProgress::Complete {
        duration,
        skipped: walker.counts.skipped,
    });

    Ok(ScanOutcome {
        counts: walker.counts,
        checkpoint: walker.checkpoint,
        duration,
    })
}

impl Walker {
    fn scan_root(&mut self, root: &Path, index: usize, total: usize, scan_files: bool) -> Result<()> {
        if let Err(err) = fs::symlink_metadata(root) {
            self.skip(root.to_string_lossy().into_owned(), err.to_string());
            // Nothing to resume for a root that is not there.
            self.checkpoint.mark_complete(root);
            return Ok(());
        }

        debug!("Scanning root {} ({}/{})", root.display(), index + 1, total);
        let _ = self.tx.send(ScanProgress::RootStarted {
            root: root.to_path_buf(),
            index,
            total,
        });
        let before = self.counts;

        self.walk(root, Pass::Folders)?;
        if scan_files {
            self.walk(root, Pass::Files)?;
        }

        self.records.flush()?;
        self.permissions.flush()?;
        self.checkpoint.mark_complete(root);
        self.checkpoint.save()?;

        let folders = self.counts.folders - before.folders;
        let files = self.counts.files - before.files;
        debug!(
            "Finished root {}: {} folders, {} files",
            root.display(),
            folders,
            files
        );
        let _ = self.tx.send(ScanProgress::RootCompleted {
            root: root.to_path_buf(),
            folders,
            files,
        });
        Ok(())
    }

    fn walk(&mut self, root: &Path, pass: Pass) -> Result<()> {
        let walker = jwalk::WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .parallelism(jwalk::Parallelism::RayonNewPool(self.concurrency));

        let mut batch: Vec<PathBuf> = Vec::with_capacity(BATCH_SIZE);
        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    // Both passes hit the same unreadable directories; count once.
                    if pass == Pass::Folders {
                        self.skip(path, err.to_string());
                    } else {
                        debug!("Files pass: {path}: {err}");
                    }
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            if is_dir != (pass == Pass::Folders) {
                continue;
            }
            batch.push(entry.path());
            if batch.len() >= BATCH_SIZE {
                self.process_batch(&mut batch)?;
            }
        }
        self.process_batch(&mut batch)
    }

    fn process_batch(&mut self, batch: &mut Vec<PathBuf>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let outcomes: Vec<ItemOutcome> = {
            let rules = &self.rules;
            let parents = ParentAcls::new(self.acl.as_ref());
            let acl = self.acl.as_ref();
            self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|path| process_item(path, rules, acl, &parents))
                    .collect()
            })
        };
        batch.clear();

        let mut last_path: Option<String> = None;
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Record {
                    record,
                    permissions,
                    acl_error,
                } => {
                    if let Some(err) = acl_error {
                        self.counts.acl_failures += 1;
                        warn!("Cannot read ACL for {}: {err}", record.path);
                    }
                    for entry in &permissions {
                        self.permissions.write(entry)?;
                    }
                    self.counts.permission_entries += permissions.len() as u64;
                    self.records.write(&record)?;

                    let (folders, files) = if record.is_folder() { (1, 0) } else { (0, 1) };
                    self.counts.folders += folders;
                    self.counts.files += files;
                    if self.checkpoint.record(folders, files, Some(record.path.as_str())) {
                        self.save_checkpoint()?;
                    }
                    last_path = Some(record.path);
                }
                ItemOutcome::Skipped { path, message } => self.skip(path, message),
            }
        }

        if let Some(current_path) = last_path {
            let _ = self.tx.send(ScanProgress::Update {
                folders_found: self.counts.folders,
                files_found: self.counts.files,
                current_path,
            });
        }
        Ok(())
    }

    /// Flush both writers, then persist the checkpoint so it never points
    /// past rows that are on disk.
    fn save_checkpoint(&mut self) -> Result<()> {
        self.records.flush()?;
        self.permissions.flush()?;
        self.checkpoint.save()?;
        let state = self.checkpoint.state();
        let _ = self.tx.send(ScanProgress::Checkpointed {
            folders: state.folders_processed,
            files: state.files_processed,
        });
        Ok(())
    }

    fn skip(&mut self, path: String, message: String) {
        self.counts.skipped += 1;
        warn!("Skipping {path}: {message}");
        let _ = self.tx.send(ScanProgress::Skipped { path, message });
    }
}

fn process_item(
    path: &Path,
    rules: &FlagRules,
    acl: &dyn AclSource,
    parents: &ParentAcls<'_>,
) -> ItemOutcome {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            return ItemOutcome::Skipped {
                path: path.to_string_lossy().into_owned(),
                message: err.to_string(),
            }
        }
    };
    let is_dir = meta.is_dir();
    let file_count = if is_dir { count_immediate_files(path) } else { 0 };
    let record = normalize::record_from_metadata(path, &meta, file_count, rules);

    let (permissions, acl_error) = match acl.query(path) {
        Ok(Some(snapshot)) => {
            let parent = path.parent().and_then(|p| parents.get(p));
            let entries =
                permissions::explicit_entries(&record.path, &snapshot, parent.as_deref(), is_dir);
            (entries, None)
        }
        Ok(None) => (Vec::new(), None),
        Err(err) => (Vec::new(), Some(err.to_string())),
    };

    ItemOutcome::Record {
        record,
        permissions,
        acl_error,
    }
}

/// Non-directory entries directly inside `dir`. Unreadable directories
/// count as empty; the walk reports them separately.
fn count_immediate_files(dir: &Path) -> u64 {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
            .count() as u64,
        Err(err) => {
            debug!("Cannot list {}: {err}", dir.display());
            0
        }
    }
}
