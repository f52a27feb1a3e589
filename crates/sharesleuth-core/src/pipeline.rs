/// Stage sequencing for a run.
///
/// ```text
/// checkpoint assessment → scan | resume | extract normalize | reuse
///                       → permission back-fill
///                       → classification → issues + summary
/// ```
///
/// Stages run one after another. Classification only ever writes its own
/// outputs, so a failed classification leaves scan data and checkpoint intact.
use crate::analysis::{collect_issues, summarize};
use crate::checkpoint::{CheckpointManager, CheckpointState, CheckpointStatus, Freshness, ScanPlan};
use crate::classify::classify;
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::flags::FlagRules;
use crate::model::{ItemType, KeywordMap, PermissionEntry, ScanRecord};
use crate::normalize::paths::{is_same_or_ancestor, path_key};
use crate::normalize::{self, backfill, ExplicitPaths};
use crate::output::{
    self, ClassificationRow, RecordWriter, CLASSIFICATION_HEADER, ISSUE_HEADER, PERMISSION_HEADER,
    RECORD_HEADER,
};
use crate::platform::{self, AclSource, SystemAcl};
use crate::scanner::progress::ScanProgress;
use crate::scanner::{start_scan, ScanJob};
use crate::stats::RunStats;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Checkpoint view for the `status` command.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub checkpoint_path: PathBuf,
    pub status: CheckpointStatus,
    pub state: CheckpointState,
    pub freshness: Freshness,
    pub plan: ScanPlan,
}

pub struct Pipeline {
    config: ScanConfig,
    acl: Arc<dyn AclSource>,
}

impl Pipeline {
    /// A pipeline reading the operating system's ACLs.
    pub fn new(config: ScanConfig) -> Self {
        Self::with_acl_source(config, Arc::new(SystemAcl))
    }

    pub fn with_acl_source(config: ScanConfig, acl: Arc<dyn AclSource>) -> Self {
        Self { config, acl }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan (or reuse), back-fill, then classify and analyse.
    pub fn run(&self) -> Result<RunStats> {
        self.config.validate()?;
        // Keyword problems are fatal before any scanning starts.
        let keywords = self.load_keywords()?;
        let mut stats = RunStats::default();
        self.scan_stage(&mut stats)?;
        self.classify_stage(&keywords, &mut stats)?;
        Ok(stats)
    }

    /// Only the scan stage and back-fill.
    pub fn scan(&self) -> Result<RunStats> {
        self.config.validate_scan()?;
        let mut stats = RunStats::default();
        self.scan_stage(&mut stats)?;
        Ok(stats)
    }

    /// Re-classify existing scan output without touching it.
    pub fn classify(&self) -> Result<RunStats> {
        self.config.validate_keywords()?;
        let keywords = self.load_keywords()?;
        let mut stats = RunStats {
            scan_reused: true,
            ..Default::default()
        };
        self.classify_stage(&keywords, &mut stats)?;
        Ok(stats)
    }

    pub fn status(&self) -> StatusReport {
        let checkpoint = CheckpointManager::load(&self.config);
        let now = Utc::now();
        StatusReport {
            checkpoint_path: checkpoint.path().to_path_buf(),
            status: checkpoint.status(),
            state: checkpoint.state().clone(),
            freshness: checkpoint.assess(&self.config, now),
            plan: checkpoint.plan(&self.config, now),
        }
    }

    fn load_keywords(&self) -> Result<KeywordMap> {
        let path = self
            .config
            .keyword_file
            .as_deref()
            .ok_or_else(|| Error::Config("no keywordFile configured".into()))?;
        let keywords = KeywordMap::load(path)?;
        info!(
            "Loaded {} departments from {}",
            keywords.len(),
            path.display()
        );
        Ok(keywords)
    }

    fn scan_stage(&self, stats: &mut RunStats) -> Result<()> {
        let out = &self.config.output_dir;
        fs::create_dir_all(out).map_err(|e| Error::output(out, e))?;

        let mut checkpoint = CheckpointManager::load(&self.config);
        let started = Utc::now();
        let plan = checkpoint.plan(&self.config, started);

        if plan == ScanPlan::Reuse {
            let state = checkpoint.state();
            info!(
                "Reusing scan output from {} ({} folders, {} files)",
                state
                    .last_scan_time
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                state.folders_processed,
                state.files_processed
            );
            stats.scan_reused = true;
            stats.folders_processed = state.folders_processed;
            stats.files_processed = state.files_processed;
            if state.backfilled {
                return Ok(());
            }
            // The previous run stopped between its final save and back-fill.
            info!("Reused scan output was never back-filled");
            return self.backfill_stage(&mut checkpoint, stats);
        }

        let mut checkpoint = if self.config.extracts.is_empty() {
            self.live_scan(plan, checkpoint, started, stats)?
        } else {
            if let ScanPlan::Full { reason } = &plan {
                info!("Normalizing extracts: {reason}");
            }
            self.normalize_extracts(&mut checkpoint, started, stats)?;
            checkpoint
        };
        self.backfill_stage(&mut checkpoint, stats)
    }

    fn live_scan(
        &self,
        plan: ScanPlan,
        mut checkpoint: CheckpointManager,
        started: DateTime<Utc>,
        stats: &mut RunStats,
    ) -> Result<CheckpointManager> {
        if cfg!(windows) && !platform::is_elevated() {
            warn!("Not running elevated; ACLs of restricted folders may be unreadable");
        }

        let (resume, kept) = match plan {
            ScanPlan::Resume { completed } => {
                info!(
                    "Resuming scan: {} of {} roots already complete",
                    completed.len(),
                    self.config.root_paths.len()
                );
                (true, self.retain_completed(&completed)?)
            }
            ScanPlan::Full { reason } => {
                info!("Full scan: {reason}");
                (false, (0, 0))
            }
            ScanPlan::Reuse => return Ok(checkpoint),
        };

        checkpoint.begin(&self.config, started, resume, kept);
        checkpoint.save()?;

        let job = ScanJob::from_config(&self.config, Arc::clone(&self.acl), checkpoint, resume);
        let outcome = start_scan(job)?.wait_with(log_progress)?;

        let state = outcome.checkpoint.state();
        stats.resumed = resume;
        stats.folders_processed = state.folders_processed;
        stats.files_processed = state.files_processed;
        stats.skipped = outcome.counts.skipped;
        stats.acl_failures = outcome.counts.acl_failures;
        Ok(outcome.checkpoint)
    }

    /// Drop rows of roots that were interrupted so they can be rescanned
    /// cleanly. Returns the `(folders, files)` kept.
    fn retain_completed(&self, completed: &[PathBuf]) -> Result<(u64, u64)> {
        let keys: Vec<String> = completed
            .iter()
            .map(|p| path_key(&p.to_string_lossy()))
            .collect();
        let under_completed = |path: &str| -> bool {
            let key = path_key(path);
            keys.iter().any(|root| is_same_or_ancestor(root, &key))
        };

        let (mut folders, mut files) = (0u64, 0u64);
        let (kept, read) = output::rewrite_csv::<ScanRecord, _>(
            &self.config.raw_data_path(),
            RECORD_HEADER,
            |record| {
                if !under_completed(&record.path) {
                    return None;
                }
                match record.item_type {
                    ItemType::Folder => folders += 1,
                    ItemType::File => files += 1,
                }
                Some(record)
            },
        )?;
        output::rewrite_csv::<PermissionEntry, _>(
            &self.config.permissions_path(),
            PERMISSION_HEADER,
            |entry| under_completed(&entry.path).then_some(entry),
        )?;
        debug!("Kept {kept} of {read} records from completed roots");
        Ok((folders, files))
    }

    fn normalize_extracts(
        &self,
        checkpoint: &mut CheckpointManager,
        started: DateTime<Utc>,
        stats: &mut RunStats,
    ) -> Result<()> {
        checkpoint.begin(&self.config, started, false, (0, 0));
        let rules = FlagRules::from_config(&self.config);
        let mut writer = RecordWriter::create(&self.config.raw_data_path(), RECORD_HEADER)?;
        for extract in &self.config.extracts {
            let totals = normalize::normalize_extract(extract, &rules, &mut writer)?;
            stats.folders_processed += totals.folders;
            stats.files_processed += totals.files;
            stats.malformed_rows += totals.malformed;
            checkpoint.record(totals.folders, totals.files, None);
            checkpoint.mark_complete(extract);
        }
        writer.finish()?;

        let entries: Vec<PermissionEntry> = match &self.config.permission_extract {
            Some(path) => output::read_permissions(path)?,
            None => Vec::new(),
        };
        output::write_csv_atomic(&self.config.permissions_path(), PERMISSION_HEADER, &entries)?;
        checkpoint.save()
    }

    /// Back-fill explicit-permission flags, then record that the raw data
    /// is complete. Until then a checkpoint is never reused as-is.
    fn backfill_stage(&self, checkpoint: &mut CheckpointManager, stats: &mut RunStats) -> Result<()> {
        self.backfill_raw_data(stats)?;
        checkpoint.mark_backfilled();
        checkpoint.save()
    }

    fn backfill_raw_data(&self, stats: &mut RunStats) -> Result<()> {
        let permissions = self.config.permissions_path();
        if !permissions.is_file() {
            return Ok(());
        }
        let explicit = ExplicitPaths::load(&permissions)?;
        stats.permission_entries = explicit.entry_count();
        if explicit.is_empty() {
            debug!("No explicit permissions, skipping back-fill");
            return Ok(());
        }
        stats.backfilled = backfill(&self.config.raw_data_path(), &explicit)?;
        Ok(())
    }

    fn classify_stage(&self, keywords: &KeywordMap, stats: &mut RunStats) -> Result<()> {
        let raw = self.config.raw_data_path();
        if !raw.is_file() {
            return Err(Error::Stage {
                stage: "classify",
                message: format!("no scan data at {}", raw.display()),
            });
        }
        let records = output::read_records(&raw)?;
        let results = classify(&records, keywords, self.config.tie_policy);

        output::write_csv_atomic(
            &self.config.classified_path(),
            CLASSIFICATION_HEADER,
            results.iter().map(ClassificationRow::from),
        )?;

        let issues = collect_issues(&records, &results, &self.config.thresholds);
        output::write_csv_atomic(&self.config.issues_path(), ISSUE_HEADER, &issues)?;

        let summary = summarize(&records, &results, &issues, Utc::now());
        output::write_atomic(&self.config.summary_path(), &serde_json::to_vec_pretty(&summary)?)?;

        stats.classified = results.iter().filter(|r| r.is_classified()).count() as u64;
        stats.unclassified = results.len() as u64 - stats.classified;
        stats.tied = results.iter().filter(|r| r.is_tied()).count() as u64;
        stats.issues = issues.len() as u64;
        stats.backfilled = summary.explicit_permission_items;
        if stats.items_processed() == 0 {
            stats.folders_processed = summary.total_folders;
            stats.files_processed = summary.total_files;
        }
        info!(
            "Wrote {} classifications and {} issues to {}",
            results.len(),
            issues.len(),
            self.config.output_dir.display()
        );
        Ok(())
    }
}

fn log_progress(message: &ScanProgress) {
    match message {
        ScanProgress::RootStarted { root, index, total } => {
            info!("[{}/{}] Scanning {}", index + 1, total, root.display());
        }
        ScanProgress::Update {
            folders_found,
            files_found,
            current_path,
        } => debug!("{folders_found} folders, {files_found} files: {current_path}"),
        ScanProgress::Checkpointed { folders, files } => {
            info!("Checkpoint: {folders} folders, {files} files");
        }
        ScanProgress::RootCompleted {
            root,
            folders,
            files,
        } => info!("Finished {}: {folders} folders, {files} files", root.display()),
        ScanProgress::Skipped { .. } | ScanProgress::Complete { .. } => {}
    }
}
