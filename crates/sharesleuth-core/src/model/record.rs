/// The canonical scan record — one row per file or folder.
///
/// Field order matches the canonical CSV header, so `csv` + `serde` produce
/// exactly `Path,Name,Extension,SizeBytes,Created,LastModified,Type,...`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a record describes a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    File,
    Folder,
}

impl ItemType {
    /// Human-readable label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Folder => "Folder",
        }
    }

    #[inline]
    pub fn is_folder(self) -> bool {
        matches!(self, Self::Folder)
    }
}

/// A single file or folder as it appears in the canonical record stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanRecord {
    /// Absolute path with OS-native separators. Unique within a scan.
    pub path: String,

    /// Leaf name (final path segment, trailing separators removed).
    pub name: String,

    /// Extension including the leading dot. Empty for folders.
    pub extension: String,

    /// Logical size in bytes. Always 0 for folders.
    #[serde(deserialize_with = "crate::output::size::deserialize")]
    pub size_bytes: u64,

    #[serde(with = "crate::output::timestamp")]
    pub created: Option<DateTime<Utc>>,

    #[serde(with = "crate::output::timestamp")]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(rename = "Type")]
    pub item_type: ItemType,

    /// Character count (not byte count) of `path`.
    pub path_length: usize,

    #[serde(with = "crate::output::true_false")]
    pub has_unsupported_chars: bool,

    #[serde(with = "crate::output::true_false")]
    pub is_unsafe_extension: bool,

    #[serde(with = "crate::output::true_false")]
    pub is_large_file: bool,

    #[serde(with = "crate::output::true_false")]
    pub is_too_many_files: bool,

    #[serde(with = "crate::output::true_false")]
    pub is_too_long_path: bool,

    /// Back-filled once permission data is known; false until then.
    #[serde(with = "crate::output::true_false")]
    pub has_explicit_permissions: bool,

    /// Immediate file children (not descendants). Always 0 for files.
    #[serde(default)]
    pub file_count_in_folder: u64,
}

impl ScanRecord {
    #[inline]
    pub fn is_folder(&self) -> bool {
        self.item_type.is_folder()
    }

    /// `true` if any migration-blocker flag is raised.
    pub fn has_blocker(&self) -> bool {
        self.has_unsupported_chars
            || self.is_unsafe_extension
            || self.is_large_file
            || self.is_too_many_files
            || self.is_too_long_path
    }
}
