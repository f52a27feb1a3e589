/// Migration-blocker flags.
///
/// [`evaluate`] is pure: it looks only at the record's own fields and the
/// configured [`FlagRules`], never at the filesystem.
use crate::config::{ScanConfig, Thresholds};
use crate::model::ScanRecord;
use std::collections::HashSet;

/// The five blocker flags computed for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub has_unsupported_chars: bool,
    pub is_unsafe_extension: bool,
    pub is_large_file: bool,
    pub is_too_many_files: bool,
    pub is_too_long_path: bool,
}

impl Flags {
    /// Copy the flags onto a record.
    pub fn apply(self, record: &mut ScanRecord) {
        record.has_unsupported_chars = self.has_unsupported_chars;
        record.is_unsafe_extension = self.is_unsafe_extension;
        record.is_large_file = self.is_large_file;
        record.is_too_many_files = self.is_too_many_files;
        record.is_too_long_path = self.is_too_long_path;
    }
}

/// Thresholds plus the extension and character deny-lists, pre-normalised.
#[derive(Debug, Clone)]
pub struct FlagRules {
    pub thresholds: Thresholds,
    /// Lowercase, always with a leading dot.
    unsafe_extensions: HashSet<String>,
    unsupported_chars: Vec<char>,
}

impl FlagRules {
    pub fn new<E, S>(thresholds: Thresholds, unsafe_extensions: E, unsupported_chars: &[char]) -> Self
    where
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unsafe_extensions = unsafe_extensions
            .into_iter()
            .filter_map(|ext| {
                let ext = ext.as_ref().trim().to_lowercase();
                match ext.as_str() {
                    "" | "." => None,
                    e if e.starts_with('.') => Some(ext),
                    _ => Some(format!(".{ext}")),
                }
            })
            .collect();
        Self {
            thresholds,
            unsafe_extensions,
            unsupported_chars: unsupported_chars.to_vec(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.thresholds,
            &config.unsafe_extensions,
            &config.unsupported_characters,
        )
    }

    pub fn is_unsafe_extension(&self, extension: &str) -> bool {
        !extension.is_empty() && self.unsafe_extensions.contains(&extension.to_lowercase())
    }

    /// Forbidden character, trailing space/period, or a C0 control character
    /// other than tab, LF and CR.
    pub fn has_unsupported_chars(&self, name: &str) -> bool {
        if is_drive_designator(name) {
            return false;
        }
        if name.ends_with(' ') || name.ends_with('.') {
            return true;
        }
        name.chars().any(|c| {
            self.unsupported_chars.contains(&c)
                || (c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r'))
        })
    }
}

/// `C:` style names given to drive roots are not real leaf names.
fn is_drive_designator(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() == 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

/// Compute all blocker flags for `record`.
pub fn evaluate(record: &ScanRecord, rules: &FlagRules) -> Flags {
    let t = &rules.thresholds;
    let is_folder = record.is_folder();
    Flags {
        has_unsupported_chars: rules.has_unsupported_chars(&record.name),
        is_unsafe_extension: !is_folder && rules.is_unsafe_extension(&record.extension),
        is_large_file: !is_folder && record.size_bytes > t.max_file_size,
        is_too_many_files: is_folder && record.file_count_in_folder > t.max_files_per_folder,
        is_too_long_path: record.path_length > t.max_path_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;

    fn rules() -> FlagRules {
        FlagRules::new(
            Thresholds {
                max_path_length: 20,
                max_file_size: 1_000,
                max_files_per_folder: 3,
            },
            ["exe", ".PS1"],
            &['*', ':', '?', '|'],
        )
    }

    fn record(path: &str, name: &str, ext: &str, item_type: ItemType) -> ScanRecord {
        ScanRecord {
            path: path.into(),
            name: name.into(),
            extension: ext.into(),
            size_bytes: 0,
            created: None,
            last_modified: None,
            item_type,
            path_length: path.chars().count(),
            has_unsupported_chars: false,
            is_unsafe_extension: false,
            is_large_file: false,
            is_too_many_files: false,
            is_too_long_path: false,
            has_explicit_permissions: false,
            file_count_in_folder: 0,
        }
    }

    #[test]
    fn path_length_boundary_is_strict() {
        let r = rules();
        let exact = record("C:\\aaaaaaaaaaaaaaaaa", "a", "", ItemType::File);
        assert_eq!(exact.path_length, 20);
        assert!(!evaluate(&exact, &r).is_too_long_path);

        let over = record("C:\\aaaaaaaaaaaaaaaaaa", "a", "", ItemType::File);
        assert!(evaluate(&over, &r).is_too_long_path);
    }

    /// Path length counts characters, not UTF-8 bytes.
    #[test]
    fn path_length_counts_chars() {
        let r = rules();
        let rec = record("C:\\ééééééééééééééééé", "é", "", ItemType::File);
        assert_eq!(rec.path_length, 20);
        assert!(!evaluate(&rec, &r).is_too_long_path);
    }

    #[test]
    fn large_file_is_strict_and_files_only() {
        let r = rules();
        let mut f = record("C:\\x.bin", "x.bin", ".bin", ItemType::File);
        f.size_bytes = 1_000;
        assert!(!evaluate(&f, &r).is_large_file);
        f.size_bytes = 1_001;
        assert!(evaluate(&f, &r).is_large_file);

        let mut d = record("C:\\dir", "dir", "", ItemType::Folder);
        d.size_bytes = 10_000;
        assert!(!evaluate(&d, &r).is_large_file);
    }

    #[test]
    fn too_many_files_only_for_folders() {
        let r = rules();
        let mut d = record("C:\\dir", "dir", "", ItemType::Folder);
        d.file_count_in_folder = 3;
        assert!(!evaluate(&d, &r).is_too_many_files);
        d.file_count_in_folder = 4;
        assert!(evaluate(&d, &r).is_too_many_files);
    }

    #[test]
    fn unsafe_extension_is_case_insensitive() {
        let r = rules();
        let f = record("C:\\run.EXE", "run.EXE", ".EXE", ItemType::File);
        assert!(evaluate(&f, &r).is_unsafe_extension);
        let s = record("C:\\a.ps1", "a.ps1", ".ps1", ItemType::File);
        assert!(evaluate(&s, &r).is_unsafe_extension);
        let d = record("C:\\x.exe", "x.exe", "", ItemType::Folder);
        assert!(!evaluate(&d, &r).is_unsafe_extension);
    }

    #[test]
    fn unsupported_characters() {
        let r = rules();
        assert!(r.has_unsupported_chars("what?.txt"));
        assert!(r.has_unsupported_chars("trailing "));
        assert!(r.has_unsupported_chars("trailing."));
        assert!(r.has_unsupported_chars("bell\u{7}"));
        assert!(!r.has_unsupported_chars("tab\there"));
        assert!(!r.has_unsupported_chars("plain name.docx"));
        assert!(!r.has_unsupported_chars("C:"));
    }
}
