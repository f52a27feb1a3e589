/// Platform-specific functionality — DACL reading and elevation checks.
///
/// The scanner only sees the [`AclSource`] trait. On Windows
/// [`SystemAcl`] reads real DACLs; elsewhere it reports "no ACL data",
/// which leaves every record's permission flag unset.
#[cfg(windows)]
mod windows;

use crate::permissions::AclSnapshot;
use std::io;
use std::path::Path;

/// Something that can produce the DACL of a path.
pub trait AclSource: Send + Sync {
    /// `Ok(None)` means the platform has no ACL concept for this path.
    /// `Err` is an access failure and is treated as a transient item error.
    fn query(&self, path: &Path) -> io::Result<Option<AclSnapshot>>;
}

/// The operating system's own ACLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAcl;

impl AclSource for SystemAcl {
    #[cfg(windows)]
    fn query(&self, path: &Path) -> io::Result<Option<AclSnapshot>> {
        windows::read_dacl(path).map(Some)
    }

    #[cfg(not(windows))]
    fn query(&self, _path: &Path) -> io::Result<Option<AclSnapshot>> {
        Ok(None)
    }
}

/// Whether the process holds an elevated token.
///
/// Reading ACLs on restricted folders generally requires elevation, so the
/// pipeline logs this once at startup.
pub fn is_elevated() -> bool {
    #[cfg(windows)]
    {
        windows::is_elevated()
    }
    #[cfg(not(windows))]
    {
        false
    }
}
