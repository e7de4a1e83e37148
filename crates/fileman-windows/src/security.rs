// advapi32 owner lookup: GetFileSecurityW -> GetSecurityDescriptorOwner -> LookupAccountSidW
//
// Each step copies its result into an owned buffer so the chain can be run
// through fileman_platform::security::resolve_account_owner.

use std::ffi::c_void;
use std::io;
use std::path::Path;
use std::ptr;

use fileman_platform::security::{AccountName, SecurityDescriptorApi};
use windows::Win32::Foundation::{BOOL, ERROR_INSUFFICIENT_BUFFER};
use windows::Win32::Security::OWNER_SECURITY_INFORMATION;

/// Initial name/domain buffer size in UTF-16 units; retried larger on demand.
const ACCOUNT_NAME_CAPACITY: u32 = 256;

// FFI bindings (kept raw so each call reports its own BOOL/GetLastError)
#[link(name = "advapi32")]
extern "system" {
    fn GetFileSecurityW(
        lpFileName: *const u16,
        RequestedInformation: u32,
        pSecurityDescriptor: *mut c_void,
        nLength: u32,
        lpnLengthNeeded: *mut u32,
    ) -> BOOL;
    fn GetSecurityDescriptorOwner(
        pSecurityDescriptor: *const c_void,
        pOwner: *mut *mut c_void,
        lpbOwnerDefaulted: *mut BOOL,
    ) -> BOOL;
    fn IsValidSid(pSid: *const c_void) -> BOOL;
    fn GetLengthSid(pSid: *const c_void) -> u32;
    fn LookupAccountSidW(
        lpSystemName: *const u16,
        Sid: *const c_void,
        Name: *mut u16,
        cchName: *mut u32,
        ReferencedDomainName: *mut u16,
        cchReferencedDomainName: *mut u32,
        peUse: *mut i32,
    ) -> BOOL;
}

fn to_wide(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn from_wide(buf: &[u16], len: u32) -> String {
    let len = (len as usize).min(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

fn is_insufficient_buffer(err: &io::Error) -> bool {
    err.raw_os_error() == Some(ERROR_INSUFFICIENT_BUFFER.0 as i32)
}

pub struct Win32SecurityApi;

impl SecurityDescriptorApi for Win32SecurityApi {
    fn file_security(&self, path: &Path) -> io::Result<Vec<u8>> {
        let wide = to_wide(path);
        let mut needed: u32 = 0;

        // Size probe: expected to fail with ERROR_INSUFFICIENT_BUFFER
        let ok = unsafe {
            GetFileSecurityW(
                wide.as_ptr(),
                OWNER_SECURITY_INFORMATION.0,
                ptr::null_mut(),
                0,
                &mut needed,
            )
        };
        if !ok.as_bool() {
            let err = io::Error::last_os_error();
            if !is_insufficient_buffer(&err) {
                return Err(err);
            }
        }
        if needed == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "GetFileSecurityW reported an empty security descriptor",
            ));
        }

        let mut buf = vec![0u8; needed as usize];
        let ok = unsafe {
            GetFileSecurityW(
                wide.as_ptr(),
                OWNER_SECURITY_INFORMATION.0,
                buf.as_mut_ptr().cast(),
                needed,
                &mut needed,
            )
        };
        if !ok.as_bool() {
            return Err(io::Error::last_os_error());
        }
        Ok(buf)
    }

    fn owner_sid(&self, descriptor: &[u8]) -> io::Result<Vec<u8>> {
        let mut owner: *mut c_void = ptr::null_mut();
        let mut defaulted = BOOL(0);

        let ok = unsafe {
            GetSecurityDescriptorOwner(descriptor.as_ptr().cast(), &mut owner, &mut defaulted)
        };
        if !ok.as_bool() {
            return Err(io::Error::last_os_error());
        }
        if owner.is_null() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "security descriptor has no owner",
            ));
        }

        // owner points into `descriptor`, which outlives this block
        unsafe {
            if !IsValidSid(owner).as_bool() {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid owner sid"));
            }
            let len = GetLengthSid(owner) as usize;
            Ok(std::slice::from_raw_parts(owner as *const u8, len).to_vec())
        }
    }

    fn account_name(&self, sid: &[u8]) -> io::Result<AccountName> {
        let mut name_len = ACCOUNT_NAME_CAPACITY;
        let mut domain_len = ACCOUNT_NAME_CAPACITY;

        loop {
            let mut name = vec![0u16; name_len as usize];
            let mut domain = vec![0u16; domain_len as usize];
            let mut sid_use: i32 = 0;

            let ok = unsafe {
                LookupAccountSidW(
                    ptr::null(),
                    sid.as_ptr().cast(),
                    name.as_mut_ptr(),
                    &mut name_len,
                    domain.as_mut_ptr(),
                    &mut domain_len,
                    &mut sid_use,
                )
            };

            if ok.as_bool() {
                // On success the lengths exclude the terminating null
                return Ok(AccountName {
                    domain: from_wide(&domain, domain_len),
                    name: from_wide(&name, name_len),
                });
            }

            let err = io::Error::last_os_error();
            let grew = name_len as usize > name.len() || domain_len as usize > domain.len();
            if !is_insufficient_buffer(&err) || !grew {
                return Err(err);
            }
            tracing::debug!(
                "LookupAccountSidW needs name={} domain={} units, retrying",
                name_len,
                domain_len
            );
        }
    }
}
