/// Explicit-permission differ ("AccessEnum" semantics).
///
/// Given a path's ACL and its parent's, decide whether the path's explicit
/// entries belong in the permission report:
///
/// - **Directories** report any non-inherited entry. Administrators care
///   where delegation starts.
/// - **Files** report only when a non-inherited entry widens access beyond
///   the parent's explicit entries: an account the parent does not list, or
///   a strict superset of the parent's rights for that account.
///
/// Eligible paths emit one [`PermissionEntry`] per non-inherited Allow entry
/// whose account is not excluded.
pub mod accounts;
pub mod rights;

pub use accounts::is_excluded_account;
pub use rights::AccessRights;

use crate::model::{AccessControlType, AccessLevel, PermissionEntry};
use std::collections::HashMap;

/// One access-control entry as read from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessEntry {
    pub account: String,
    pub rights: AccessRights,
    pub control: AccessControlType,
    /// Set when the entry was propagated from an ancestor.
    pub inherited: bool,
}

impl AccessEntry {
    pub fn allow(account: impl Into<String>, rights: AccessRights, inherited: bool) -> Self {
        Self {
            account: account.into(),
            rights,
            control: AccessControlType::Allow,
            inherited,
        }
    }

    pub fn deny(account: impl Into<String>, rights: AccessRights, inherited: bool) -> Self {
        Self {
            account: account.into(),
            rights,
            control: AccessControlType::Deny,
            inherited,
        }
    }

    #[inline]
    fn is_explicit_allow(&self) -> bool {
        !self.inherited && self.control == AccessControlType::Allow
    }
}

/// The DACL of one path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclSnapshot {
    pub entries: Vec<AccessEntry>,
}

impl AclSnapshot {
    pub fn new(entries: Vec<AccessEntry>) -> Self {
        Self { entries }
    }

    /// Entries defined directly on the path, of any type.
    pub fn explicit(&self) -> impl Iterator<Item = &AccessEntry> {
        self.entries.iter().filter(|e| !e.inherited)
    }

    /// Union of explicit Allow rights per lowercased account.
    fn explicit_allow_by_account(&self) -> HashMap<String, AccessRights> {
        let mut map: HashMap<String, AccessRights> = HashMap::new();
        for entry in self.entries.iter().filter(|e| e.is_explicit_allow()) {
            *map.entry(entry.account.to_lowercase()).or_default() |= entry.rights;
        }
        map
    }
}

/// Map a rights set to the coarse report level.
pub fn access_level(rights: AccessRights) -> AccessLevel {
    if rights.can_write() {
        AccessLevel::ReadWrite
    } else {
        AccessLevel::Read
    }
}

/// Decide whether `acl` should surface in the permission report.
///
/// `parent` is `None` when the parent could not be resolved or read; such
/// nodes are eligible whenever they carry any explicit entry.
pub fn is_eligible(acl: &AclSnapshot, parent: Option<&AclSnapshot>, is_dir: bool) -> bool {
    if acl.explicit().next().is_none() {
        return false;
    }
    if is_dir {
        return true;
    }
    let Some(parent) = parent else {
        return true;
    };

    let parent_rights = parent.explicit_allow_by_account();
    acl.entries
        .iter()
        .filter(|e| e.is_explicit_allow())
        .any(|entry| match parent_rights.get(&entry.account.to_lowercase()) {
            None => true,
            Some(&inherited) => entry.rights.is_strict_superset_of(inherited),
        })
}

/// Compute the permission rows for `path`. Empty when not eligible.
pub fn explicit_entries(
    path: &str,
    acl: &AclSnapshot,
    parent: Option<&AclSnapshot>,
    is_dir: bool,
) -> Vec<PermissionEntry> {
    if !is_eligible(acl, parent, is_dir) {
        return Vec::new();
    }
    acl.entries
        .iter()
        .filter(|e| e.is_explicit_allow() && !is_excluded_account(&e.account))
        .map(|e| PermissionEntry {
            path: path.to_owned(),
            account: e.account.clone(),
            access_level: access_level(e.rights),
            access_control_type: AccessControlType::Allow,
        })
        .collect()
}
