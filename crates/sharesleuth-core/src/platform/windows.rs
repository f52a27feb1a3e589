/// DACL reading and token elevation through the Win32 security APIs.
use crate::permissions::{AccessEntry, AccessRights, AclSnapshot};
use crate::model::AccessControlType;
use std::io;
use std::path::Path;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, LocalFree, ERROR_SUCCESS, HANDLE, HLOCAL, PSID};
use windows::Win32::Security::Authorization::{
    ConvertSidToStringSidW, GetNamedSecurityInfoW, SE_FILE_OBJECT,
};
use windows::Win32::Security::{
    GetAce, GetTokenInformation, LookupAccountSidW, TokenElevation, ACCESS_ALLOWED_ACE, ACE_HEADER,
    ACL, DACL_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR, SID_NAME_USE, TOKEN_ELEVATION,
    TOKEN_QUERY,
};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

// ACE header constants from winnt.h.
const ACCESS_ALLOWED_ACE_TYPE: u8 = 0;
const ACCESS_DENIED_ACE_TYPE: u8 = 1;
const INHERITED_ACE: u8 = 0x10;

/// Check whether the current process is running with elevated (admin) privileges.
pub fn is_elevated() -> bool {
    unsafe {
        let mut token_handle = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token_handle).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut return_length = 0u32;
        let result = GetTokenInformation(
            token_handle,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut return_length,
        );
        let _ = CloseHandle(token_handle);

        result.is_ok() && elevation.TokenIsElevated != 0
    }
}

/// Frees a security descriptor allocated by `GetNamedSecurityInfoW`.
struct LocalDescriptor(PSECURITY_DESCRIPTOR);

impl Drop for LocalDescriptor {
    fn drop(&mut self) {
        if !self.0 .0.is_null() {
            unsafe {
                let _ = LocalFree(HLOCAL(self.0 .0));
            }
        }
    }
}

/// Read the DACL of `path`. Only allow and deny ACEs are returned; object and
/// callback ACEs do not occur on NTFS file objects.
pub fn read_dacl(path: &Path) -> io::Result<AclSnapshot> {
    let wide: Vec<u16> = path
        .as_os_str()
        .to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    let mut dacl: *mut ACL = std::ptr::null_mut();
    let mut descriptor = PSECURITY_DESCRIPTOR::default();
    let status = unsafe {
        GetNamedSecurityInfoW(
            PCWSTR(wide.as_ptr()),
            SE_FILE_OBJECT,
            DACL_SECURITY_INFORMATION,
            None,
            None,
            Some(&mut dacl as *mut *mut ACL),
            None,
            &mut descriptor,
        )
    };
    if status != ERROR_SUCCESS {
        return Err(io::Error::from_raw_os_error(status.0 as i32));
    }
    let _guard = LocalDescriptor(descriptor);

    // A null DACL grants everyone full access; nothing is explicit.
    if dacl.is_null() {
        return Ok(AclSnapshot::default());
    }

    let count = unsafe { (*dacl).AceCount } as u32;
    let mut entries = Vec::with_capacity(count as usize);
    for index in 0..count {
        let mut ace_ptr: *mut std::ffi::c_void = std::ptr::null_mut();
        if unsafe { GetAce(dacl, index, &mut ace_ptr) }.is_err() || ace_ptr.is_null() {
            continue;
        }
        let header = unsafe { &*(ace_ptr as *const ACE_HEADER) };
        let control = match header.AceType {
            ACCESS_ALLOWED_ACE_TYPE => AccessControlType::Allow,
            ACCESS_DENIED_ACE_TYPE => AccessControlType::Deny,
            _ => continue,
        };
        // Allowed and denied ACEs share the same layout.
        let ace = unsafe { &*(ace_ptr as *const ACCESS_ALLOWED_ACE) };
        let sid = PSID(&ace.SidStart as *const u32 as *mut _);
        entries.push(AccessEntry {
            account: account_name(sid),
            rights: AccessRights::from_windows_mask(ace.Mask),
            control,
            inherited: header.AceFlags & INHERITED_ACE != 0,
        });
    }

    Ok(AclSnapshot::new(entries))
}

/// Resolve a SID to `DOMAIN\name`, falling back to its string form for
/// orphaned SIDs.
fn account_name(sid: PSID) -> String {
    let mut name = [0u16; 256];
    let mut domain = [0u16; 256];
    let mut name_len = name.len() as u32;
    let mut domain_len = domain.len() as u32;
    let mut use_kind = SID_NAME_USE::default();

    let resolved = unsafe {
        LookupAccountSidW(
            PCWSTR::null(),
            sid,
            PWSTR(name.as_mut_ptr()),
            &mut name_len,
            PWSTR(domain.as_mut_ptr()),
            &mut domain_len,
            &mut use_kind,
        )
    };

    if resolved.is_ok() {
        let name = String::from_utf16_lossy(&name[..name_len as usize]);
        let domain = String::from_utf16_lossy(&domain[..domain_len as usize]);
        return if domain.is_empty() {
            name
        } else {
            format!("{domain}\\{name}")
        };
    }

    let mut text = PWSTR::null();
    if unsafe { ConvertSidToStringSidW(sid, &mut text) }.is_ok() {
        let value = unsafe { text.to_string() }.unwrap_or_default();
        unsafe {
            let _ = LocalFree(HLOCAL(text.0 as *mut _));
        }
        return value;
    }
    String::from("S-1-unknown")
}
