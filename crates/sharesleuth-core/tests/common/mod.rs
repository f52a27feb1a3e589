//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use sharesleuth_core::config::{ScanConfig, Thresholds};
use sharesleuth_core::permissions::{AccessEntry, AccessRights, AclSnapshot};
use sharesleuth_core::platform::AclSource;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// ACL source backed by a map. Unlisted paths carry inherited entries only.
#[derive(Default)]
pub struct MapAcl {
    pub acls: HashMap<PathBuf, AclSnapshot>,
    pub failing: HashSet<PathBuf>,
}

impl MapAcl {
    pub fn with(mut self, path: &Path, entries: Vec<AccessEntry>) -> Self {
        self.acls.insert(path.to_path_buf(), AclSnapshot::new(entries));
        self
    }

    pub fn failing(mut self, path: &Path) -> Self {
        self.failing.insert(path.to_path_buf());
        self
    }
}

impl AclSource for MapAcl {
    fn query(&self, path: &Path) -> io::Result<Option<AclSnapshot>> {
        if self.failing.contains(path) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"));
        }
        Ok(Some(self.acls.get(path).cloned().unwrap_or_else(|| {
            AclSnapshot::new(vec![
                AccessEntry::allow("BUILTIN\\Users", AccessRights::READ_AND_EXECUTE, true),
                AccessEntry::allow("NT AUTHORITY\\SYSTEM", AccessRights::FULL_CONTROL, true),
            ])
        })))
    }
}

pub fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

/// ```text
/// share/
///   Finance/
///     report.docx   (100 bytes)
///     budget.xlsx   (200 bytes)
///   HR/
///     Payroll/
///       staff.xlsx  (300 bytes)
///   readme.txt      (400 bytes)
/// ```
pub fn build_share(root: &Path) {
    let finance = root.join("Finance");
    let payroll = root.join("HR").join("Payroll");
    fs::create_dir_all(&finance).unwrap();
    fs::create_dir_all(&payroll).unwrap();
    write_bytes(&finance.join("report.docx"), 100);
    write_bytes(&finance.join("budget.xlsx"), 200);
    write_bytes(&payroll.join("staff.xlsx"), 300);
    write_bytes(&root.join("readme.txt"), 400);
}

pub fn write_keywords(path: &Path) {
    fs::write(
        path,
        "Department,Keywords\n\
         Finance,\"finance,budget,report\"\n\
         HR,\"hr,payroll,staff\"\n",
    )
    .unwrap();
}

/// Config with generous thresholds, output outside every root.
pub fn config(base: &Path, roots: Vec<PathBuf>) -> ScanConfig {
    let mut config = ScanConfig::new(Thresholds {
        max_path_length: 4_000,
        max_file_size: 250,
        max_files_per_folder: 1,
    });
    config.root_paths = roots;
    config.output_dir = base.join("out");
    config.concurrency = 2;
    let keywords = base.join("keywords.csv");
    write_keywords(&keywords);
    config.keyword_file = Some(keywords);
    config
}
