/// End-to-end pipeline tests: scan → back-fill → classify → analyse,
/// checkpoint reuse and resume, and the extract path.
mod common;

use common::{build_share, config, write_keywords, MapAcl};
use sharesleuth_core::checkpoint::{CheckpointManager, CheckpointState};
use sharesleuth_core::model::{ScanRecord, TiePolicy};
use sharesleuth_core::output::{read_records, rewrite_csv, RECORD_HEADER};
use sharesleuth_core::permissions::{AccessEntry, AccessRights};
use sharesleuth_core::pipeline::Pipeline;
use sharesleuth_core::{Error, ScanConfig};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn pipeline(config: ScanConfig) -> Pipeline {
    Pipeline::with_acl_source(config, Arc::new(MapAcl::default()))
}

/// `Path → Department` from classified.csv.
fn departments(config: &ScanConfig) -> HashMap<String, String> {
    let mut reader = csv::Reader::from_path(config.classified_path()).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "Path",
            "Type",
            "Depth",
            "Department",
            "Score",
            "Confidence",
            "TiedDepartments",
            "MatchedKeywords",
            "CompetingScores"
        ]
    );
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[0].to_owned(), r[3].to_owned())
        })
        .collect()
}

/// A first run scans and classifies; a second run reuses the scan and
/// produces byte-identical classification output.
#[test]
fn second_run_reuses_scan_and_matches() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);

    let first = pipeline(cfg.clone()).run().unwrap();
    assert!(!first.scan_reused);
    assert_eq!(first.folders_processed, 4);
    assert_eq!(first.files_processed, 4);
    let classified_once = fs::read(cfg.classified_path()).unwrap();

    let depts = departments(&cfg);
    let finance = root.join("Finance").to_string_lossy().into_owned();
    let payroll = root.join("HR").join("Payroll").to_string_lossy().into_owned();
    assert_eq!(depts[&finance], "Finance");
    assert_eq!(depts[&payroll], "HR");

    let second = pipeline(cfg.clone()).run().unwrap();
    assert!(second.scan_reused, "fresh complete checkpoint must be reused");
    assert_eq!(second.folders_processed, 4);
    assert_eq!(fs::read(cfg.classified_path()).unwrap(), classified_once);

    let summary: serde_json::Value =
        serde_json::from_slice(&fs::read(cfg.summary_path()).unwrap()).unwrap();
    assert_eq!(summary["totalFiles"], 4);
    assert_eq!(summary["totalBytes"], 1_000);
    assert!(cfg.issues_path().is_file());
}

/// `forceRescan` ignores a reusable checkpoint.
#[test]
fn force_rescan_scans_again() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let mut cfg = config(tmp.path(), vec![root]);

    pipeline(cfg.clone()).run().unwrap();
    cfg.force_rescan = true;
    let stats = pipeline(cfg).run().unwrap();
    assert!(!stats.scan_reused);
    assert!(!stats.resumed);
}

/// An interrupted two-root scan resumes the unfinished root only, without
/// duplicating rows, and classifies exactly like a clean run.
#[test]
fn interrupted_scan_resumes_without_duplicates() {
    let tmp = TempDir::new().unwrap();
    let root_a = tmp.path().join("share");
    let root_b = tmp.path().join("archive");
    build_share(&root_a);
    fs::create_dir_all(root_b.join("Budget 2019")).unwrap();
    common::write_bytes(&root_b.join("Budget 2019").join("old.csv"), 10);
    let cfg = config(tmp.path(), vec![root_a.clone(), root_b.clone()]);

    pipeline(cfg.clone()).run().unwrap();
    let clean_records = read_records(&cfg.raw_data_path()).unwrap().len();
    let clean = departments(&cfg);

    // Simulate an interruption while the second root was being written.
    let mut state: CheckpointState =
        serde_json::from_slice(&fs::read(cfg.checkpoint_path()).unwrap()).unwrap();
    state.completed_paths.retain(|p| p == &root_a);
    fs::write(cfg.checkpoint_path(), serde_json::to_vec(&state).unwrap()).unwrap();

    let stats = pipeline(cfg.clone()).run().unwrap();
    assert!(stats.resumed);
    assert!(!stats.scan_reused);

    let records = read_records(&cfg.raw_data_path()).unwrap();
    assert_eq!(records.len(), clean_records);
    assert_eq!(departments(&cfg), clean);

    let checkpoint = CheckpointManager::load(&cfg);
    assert!(checkpoint.is_complete(&root_a));
    assert!(checkpoint.is_complete(&root_b));

    let third = pipeline(cfg).run().unwrap();
    assert!(third.scan_reused);
}

/// Explicit permissions found by the scan are back-filled onto the path and
/// every ancestor.
#[test]
fn backfill_marks_explicit_paths_and_ancestors() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);

    let payroll = root.join("HR").join("Payroll");
    let acl = MapAcl::default().with(
        &payroll,
        vec![AccessEntry::allow("CONTOSO\\HR Admins", AccessRights::FULL_CONTROL, false)],
    );
    let stats = Pipeline::with_acl_source(cfg.clone(), Arc::new(acl)).run().unwrap();
    assert_eq!(stats.permission_entries, 1);
    assert_eq!(stats.backfilled, 3, "share, HR, Payroll");

    let records = read_records(&cfg.raw_data_path()).unwrap();
    let flagged: Vec<&str> = records
        .iter()
        .filter(|r| r.has_explicit_permissions)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(flagged.len(), 3);
    assert!(flagged.contains(&"share"));
    assert!(flagged.contains(&"HR"));
    assert!(flagged.contains(&"Payroll"));
}

/// A run that stopped after its final checkpoint save but before back-fill
/// leaves raw data without explicit-permission flags; the next run reuses
/// the scan and restores them.
#[test]
fn reuse_restores_missing_backfill() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let cfg = config(tmp.path(), vec![root.clone()]);

    let payroll = root.join("HR").join("Payroll");
    let acl = MapAcl::default().with(
        &payroll,
        vec![AccessEntry::allow("CONTOSO\\HR Admins", AccessRights::FULL_CONTROL, false)],
    );
    Pipeline::with_acl_source(cfg.clone(), Arc::new(acl)).run().unwrap();
    let state: CheckpointState =
        serde_json::from_slice(&fs::read(cfg.checkpoint_path()).unwrap()).unwrap();
    assert!(state.backfilled);

    // Roll the outputs back to the moment before back-fill.
    rewrite_csv::<ScanRecord, _>(&cfg.raw_data_path(), RECORD_HEADER, |mut record| {
        record.has_explicit_permissions = false;
        Some(record)
    })
    .unwrap();
    let mut state = state;
    state.backfilled = false;
    fs::write(cfg.checkpoint_path(), serde_json::to_vec(&state).unwrap()).unwrap();

    let stats = pipeline(cfg.clone()).run().unwrap();
    assert!(stats.scan_reused);
    assert_eq!(stats.backfilled, 3);

    let records = read_records(&cfg.raw_data_path()).unwrap();
    assert_eq!(records.iter().filter(|r| r.has_explicit_permissions).count(), 3);
    assert!(CheckpointManager::load(&cfg).state().backfilled);
}

/// Disk-usage extracts replace the live scan; the permission extract drives
/// the back-fill.
#[test]
fn extracts_are_normalized_and_classified() {
    let tmp = TempDir::new().unwrap();
    let extract = tmp.path().join("export.csv");
    fs::write(
        &extract,
        "#TYPE export\n\
         FullName,Size,LastModified\n\
         C:\\Share\\,0,2024-01-01 00:00:00\n\
         C:\\Share\\Finance\\,0,2024-01-01 00:00:00\n\
         C:\\Share\\Finance\\q1 report.xlsx,1024,2024-01-02 09:30:00\n\
         C:\\Share\\Finance\\setup.exe,10,\n\
         C:\\Share\\HR\\,0,\n\
         broken\n",
    )
    .unwrap();
    let perms = tmp.path().join("perms.csv");
    fs::write(
        &perms,
        "Path,Account,AccessLevel,AccessControlType\n\
         C:\\Share\\Finance\\q1 report.xlsx,CONTOSO\\cfo,Read/Write,Allow\n",
    )
    .unwrap();

    let mut cfg = ScanConfig::new(sharesleuth_core::config::Thresholds {
        max_path_length: 30,
        max_file_size: 512,
        max_files_per_folder: 1,
    });
    cfg.extracts = vec![extract];
    cfg.permission_extract = Some(perms);
    cfg.output_dir = tmp.path().join("out");
    let keywords = tmp.path().join("keywords.csv");
    write_keywords(&keywords);
    cfg.keyword_file = Some(keywords);
    cfg.tie_policy = TiePolicy::FirstAlphabetical;

    let stats = pipeline(cfg.clone()).run().unwrap();
    assert_eq!(stats.folders_processed, 3);
    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.malformed_rows, 1);
    assert_eq!(stats.backfilled, 3);

    let records = read_records(&cfg.raw_data_path()).unwrap();
    let finance = records.iter().find(|r| r.name == "Finance").unwrap();
    assert_eq!(finance.file_count_in_folder, 2);
    assert!(finance.is_too_many_files);
    assert!(finance.has_explicit_permissions);
    let hr = records.iter().find(|r| r.name == "HR").unwrap();
    assert!(!hr.has_explicit_permissions);
    let report = records.iter().find(|r| r.name == "q1 report.xlsx").unwrap();
    assert!(report.is_large_file);
    assert!(report.is_too_long_path);

    let depts = departments(&cfg);
    assert_eq!(depts["C:\\Share\\Finance\\"], "Finance");
    assert_eq!(depts["C:\\Share\\HR\\"], "HR");

    let issues = fs::read_to_string(cfg.issues_path()).unwrap();
    assert!(issues.starts_with("IssueType,Path,Name,Type,Department,Details"));
    assert!(issues.contains("Unsafe Extension,C:\\Share\\Finance\\setup.exe,setup.exe,File,Finance,"));

    let again = pipeline(cfg).run().unwrap();
    assert!(again.scan_reused);
}

/// Keyword problems stop the run before any scan output is produced.
#[test]
fn missing_keyword_file_is_fatal_before_scanning() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    build_share(&root);
    let mut cfg = config(tmp.path(), vec![root]);
    cfg.keyword_file = Some(tmp.path().join("nope.csv"));

    let err = pipeline(cfg.clone()).run().unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err}");
    assert!(!cfg.raw_data_path().exists());
}

/// Classification without scan data is a stage error.
#[test]
fn classify_requires_scan_data() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("share");
    fs::create_dir_all(&root).unwrap();
    let cfg = config(tmp.path(), vec![root]);

    let err = pipeline(cfg).classify().unwrap_err();
    assert!(matches!(err, Error::Stage { stage: "classify", .. }));
}
