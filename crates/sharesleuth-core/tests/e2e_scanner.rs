/// End-to-end scanner tests against real temporary directory trees.
///
/// ACLs come from a map-backed source so explicit-permission behaviour is
/// identical on every platform.
mod common;

use common::{build_share, config, MapAcl};
use sharesleuth_core::checkpoint::CheckpointManager;
use sharesleuth_core::model::{AccessLevel, ItemType};
use sharesleuth_core::output::{read_permissions, read_records};
use sharesleuth_core::permissions::{AccessEntry, AccessRights};
use sharesleuth_core::scanner::progress::ScanProgress;
use sharesleuth_core::scanner::{start_scan, ScanJob};
use sharesleuth_core::ScanConfig;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn run_scan(config: &ScanConfig, acl: MapAcl) -> (sharesleuth_core::scanner::ScanOutcome, Vec<ScanProgress>) {
    fs::create_dir_all(&config.output_dir).unwrap();
    let mut checkpoint = CheckpointManager::load(config);
    checkpoint.begin(config, chrono::Utc::now(), false, (0, 0));
    let job = ScanJob::from_config(config, Arc::new(acl), checkpoint, false);
    let mut messages = Vec::new();
    let outcome = start_scan(job)
        .expect("failed to spawn scanner")
        .wait_with(|m| messages.push(m.clone()))
        .expect("scan failed");
    (outcome, messages)
}

/// Every folder (root included) and file gets exactly one record, folders
/// first.
#[test]
fn scan_writes_one_record_per_item() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);

    let (outcome, messages) = run_scan(&cfg, MapAcl::default());
    assert_eq!(outcome.counts.folders, 4, "share, Finance, HR, Payroll");
    assert_eq!(outcome.counts.files, 4);
    assert_eq!(outcome.counts.skipped, 0);

    let records = read_records(&cfg.raw_data_path()).unwrap();
    assert_eq!(records.len(), 8);
    let first_file = records.iter().position(|r| r.item_type == ItemType::File).unwrap();
    assert!(
        records[first_file..].iter().all(|r| r.item_type == ItemType::File),
        "folders pass must precede files pass"
    );

    let mut paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 8, "no duplicate paths");

    assert!(matches!(messages.first(), Some(ScanProgress::RootStarted { .. })));
    assert!(matches!(messages.last(), Some(ScanProgress::Complete { .. })));
    assert!(messages
        .iter()
        .any(|m| matches!(m, ScanProgress::RootCompleted { folders: 4, files: 4, .. })));
}

/// File counts are immediate children only; size and count flags use
/// strict comparisons.
#[test]
fn records_carry_counts_and_flags() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);
    run_scan(&cfg, MapAcl::default());

    let records = read_records(&cfg.raw_data_path()).unwrap();
    let by_name = |name: &str| records.iter().find(|r| r.name == name).unwrap();

    let share = by_name("share");
    assert_eq!(share.file_count_in_folder, 1);
    assert!(!share.is_too_many_files, "1 is not more than 1");

    let finance = by_name("Finance");
    assert_eq!(finance.file_count_in_folder, 2);
    assert!(finance.is_too_many_files);
    assert_eq!(finance.size_bytes, 0);

    assert_eq!(by_name("HR").file_count_in_folder, 0);

    assert!(!by_name("budget.xlsx").is_large_file, "200 <= 250");
    let big = by_name("staff.xlsx");
    assert!(big.is_large_file);
    assert_eq!(big.size_bytes, 300);
    assert_eq!(big.extension, ".xlsx");
    assert!(big.last_modified.is_some());
}

/// Explicit entries are reported per the differ rules and excluded
/// identities are dropped.
#[test]
fn explicit_permissions_are_extracted() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);

    let finance = root.join("Finance");
    let acl = MapAcl::default()
        .with(
            &finance,
            vec![
                AccessEntry::allow("CONTOSO\\Finance Team", AccessRights::MODIFY, false),
                AccessEntry::allow("NT AUTHORITY\\SYSTEM", AccessRights::FULL_CONTROL, false),
                AccessEntry::deny("CONTOSO\\Interns", AccessRights::READ, false),
            ],
        )
        .with(
            &finance.join("report.docx"),
            vec![
                AccessEntry::allow("CONTOSO\\Finance Team", AccessRights::MODIFY, true),
                AccessEntry::allow("CONTOSO\\auditor", AccessRights::READ, false),
            ],
        )
        .with(
            &finance.join("budget.xlsx"),
            vec![AccessEntry::allow("CONTOSO\\Finance Team", AccessRights::READ, false)],
        );

    let (outcome, _) = run_scan(&cfg, acl);
    let entries = read_permissions(&cfg.permissions_path()).unwrap();
    assert_eq!(outcome.counts.permission_entries, 2);
    assert_eq!(entries.len(), 2);

    let folder = entries.iter().find(|e| e.path.ends_with("Finance")).unwrap();
    assert_eq!(folder.account, "CONTOSO\\Finance Team");
    assert_eq!(folder.access_level, AccessLevel::ReadWrite);

    let file = entries.iter().find(|e| e.path.ends_with("report.docx")).unwrap();
    assert_eq!(file.account, "CONTOSO\\auditor");
    assert_eq!(file.access_level, AccessLevel::Read);

    assert!(
        !entries.iter().any(|e| e.path.ends_with("budget.xlsx")),
        "READ is not wider than the parent's MODIFY"
    );
}

/// An unreadable ACL keeps the record and is counted separately.
#[test]
fn acl_failures_keep_the_record() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);

    let locked = root.join("readme.txt");
    let (outcome, _) = run_scan(&cfg, MapAcl::default().failing(&locked));
    assert_eq!(outcome.counts.acl_failures, 1);
    assert_eq!(outcome.counts.skipped, 0);

    let records = read_records(&cfg.raw_data_path()).unwrap();
    assert!(records.iter().any(|r| r.name == "readme.txt"));
}

/// Missing roots are skipped, not fatal, and the checkpoint records every
/// root as complete.
#[test]
fn missing_root_is_skipped_and_checkpoint_completes() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let gone = tmp.path().join("gone");
    let cfg = config(tmp.path(), vec![root.clone(), gone.clone()]);

    let (outcome, messages) = run_scan(&cfg, MapAcl::default());
    assert_eq!(outcome.counts.skipped, 1);
    assert!(messages
        .iter()
        .any(|m| matches!(m, ScanProgress::Skipped { .. })));

    assert!(outcome.checkpoint.is_complete(&root));
    assert!(outcome.checkpoint.is_complete(&gone));

    let saved = CheckpointManager::load(&cfg);
    assert_eq!(saved.state().completed_paths.len(), 2);
    assert_eq!(saved.state().files_processed, 4);
}

/// With the files pass disabled only folders are written.
#[test]
fn folders_only_scan() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let mut cfg = config(tmp.path(), vec![root]);
    cfg.scan_files = false;

    let (outcome, _) = run_scan(&cfg, MapAcl::default());
    assert_eq!(outcome.counts.files, 0);
    let records = read_records(&cfg.raw_data_path()).unwrap();
    assert!(records.iter().all(|r| r.item_type == ItemType::Folder));
    assert_eq!(records.len(), 4);
}

/// The checkpoint cadence counts individual items, so a small cadence saves
/// many times within a single batch.
#[test]
fn checkpoint_cadence_is_independent_of_batching() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    for i in 0..12 {
        fs::create_dir_all(root.join(format!("dept-{i:02}"))).unwrap();
    }
    let mut cfg = config(tmp.path(), vec![root]);
    cfg.checkpoint_every.folders = 2;
    cfg.checkpoint_every.files = 1_000;

    let (outcome, messages) = run_scan(&cfg, MapAcl::default());
    assert_eq!(outcome.counts.folders, 13);

    let saves: Vec<u64> = messages
        .iter()
        .filter_map(|m| match m {
            ScanProgress::Checkpointed { folders, .. } => Some(*folders),
            _ => None,
        })
        .collect();
    assert_eq!(saves, vec![2, 4, 6, 8, 10, 12]);

    let checkpoint = CheckpointManager::load(&cfg);
    assert_eq!(checkpoint.state().folders_processed, 13);
}
