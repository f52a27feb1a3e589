/// Run-level counters, passed explicitly from stage to stage.
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub folders_processed: u64,
    pub files_processed: u64,
    /// Items the scanner could not read at all.
    pub skipped: u64,
    /// Items kept in the inventory whose ACL could not be read.
    pub acl_failures: u64,
    pub malformed_rows: u64,
    pub permission_entries: u64,
    /// Records carrying `HasExplicitPermissions` after back-fill.
    pub backfilled: u64,
    pub classified: u64,
    pub unclassified: u64,
    pub tied: u64,
    pub issues: u64,
    /// Prior scan output was fresh and reused as-is.
    pub scan_reused: bool,
    /// An interrupted scan was continued rather than restarted.
    pub resumed: bool,
}

impl RunStats {
    pub fn items_processed(&self) -> u64 {
        self.folders_processed + self.files_processed
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scan_mode = match (self.scan_reused, self.resumed) {
            (true, _) => "reused",
            (false, true) => "resumed",
            (false, false) => "full",
        };
        writeln!(f, "Scan:            {scan_mode}")?;
        writeln!(
            f,
            "Processed:       {} folders, {} files",
            self.folders_processed, self.files_processed
        )?;
        writeln!(
            f,
            "Skipped:         {} inaccessible, {} ACL failures, {} malformed rows",
            self.skipped, self.acl_failures, self.malformed_rows
        )?;
        writeln!(
            f,
            "Permissions:     {} explicit entries, {} records flagged",
            self.permission_entries, self.backfilled
        )?;
        writeln!(
            f,
            "Classification:  {} classified, {} unclassified, {} tied",
            self.classified, self.unclassified, self.tied
        )?;
        write!(f, "Issues:          {}", self.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_names_scan_mode() {
        let stats = RunStats {
            folders_processed: 2,
            files_processed: 5,
            resumed: true,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("resumed"));
        assert!(text.contains("2 folders, 5 files"));
        assert_eq!(stats.items_processed(), 7);
    }
}
