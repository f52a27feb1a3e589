/// Explicit-permission back-fill.
///
/// A record is marked when its path is one of the explicit paths or an
/// ancestor of one, so planners can see which folders hide explicit grants
/// further down.
use super::paths::{ancestor_keys, path_key};
use crate::error::Result;
use crate::model::{PermissionEntry, ScanRecord};
use crate::output::{read_rows, rewrite_csv, RECORD_HEADER};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Keys of every explicit path plus all of their ancestors.
#[derive(Debug, Default, Clone)]
pub struct ExplicitPaths {
    covered: HashSet<String>,
    explicit: usize,
    entries: u64,
}

impl ExplicitPaths {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys: Vec<String> = paths.into_iter().map(|p| path_key(p.as_ref())).collect();
        keys.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        keys.dedup();

        let mut covered = HashSet::with_capacity(keys.len() * 2);
        let explicit = keys.len();
        for key in keys {
            if covered.contains(&key) {
                continue;
            }
            for ancestor in ancestor_keys(&key) {
                // Ancestors of an already-covered key are covered too.
                if !covered.insert(ancestor.to_owned()) {
                    break;
                }
            }
            covered.insert(key);
        }
        Self {
            covered,
            explicit,
            entries: 0,
        }
    }

    /// Collect the distinct paths of a permissions CSV.
    pub fn load(permissions_csv: &Path) -> Result<Self> {
        let mut paths = HashSet::new();
        let mut entries = 0u64;
        for entry in read_rows::<PermissionEntry>(permissions_csv)? {
            paths.insert(entry?.path);
            entries += 1;
        }
        Ok(Self {
            entries,
            ..Self::from_paths(paths)
        })
    }

    /// Permission rows read by [`ExplicitPaths::load`].
    pub fn entry_count(&self) -> u64 {
        self.entries
    }

    /// Number of distinct explicit paths.
    pub fn explicit_count(&self) -> usize {
        self.explicit
    }

    pub fn is_empty(&self) -> bool {
        self.explicit == 0
    }

    /// Equal to, or an ancestor of, some explicit path.
    pub fn covers(&self, path: &str) -> bool {
        self.covered.contains(&path_key(path))
    }
}

/// Rewrite `raw_csv` with `HasExplicitPermissions` set for covered records.
/// Returns the number of records that carry the flag afterwards.
pub fn backfill(raw_csv: &Path, explicit: &ExplicitPaths) -> Result<u64> {
    let mut flagged = 0u64;
    let (_, read) = rewrite_csv::<ScanRecord, _>(raw_csv, RECORD_HEADER, |mut record| {
        if explicit.covers(&record.path) {
            record.has_explicit_permissions = true;
        }
        if record.has_explicit_permissions {
            flagged += 1;
        }
        Some(record)
    })?;
    info!(
        "Back-fill: {} of {} records under {} explicit paths",
        flagged,
        read,
        explicit.explicit_count()
    );
    Ok(flagged)
}
