/// Explicit permission rows written to the permissions CSV.
use serde::{Deserialize, Serialize};

/// Coarse access level reported for an explicit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessLevel {
    Read,
    #[serde(rename = "Read/Write")]
    ReadWrite,
}

impl AccessLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::ReadWrite => "Read/Write",
        }
    }
}

/// Only `Allow` entries are ever emitted; `Deny` exists so that extracts
/// produced by other tools still parse and can be filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessControlType {
    Allow,
    Deny,
}

/// One explicit, non-inherited Allow entry on a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionEntry {
    pub path: String,
    pub account: String,
    pub access_level: AccessLevel,
    pub access_control_type: AccessControlType,
}
