//! File copy strategies.
//!
//! Every strategy copies content and restores access and modification times
//! on the destination. [`AclCopier`] additionally carries the discretionary
//! ACL across where the platform has one; on other platforms it behaves
//! exactly like [`PlainCopier`].

use std::fs;
use std::io;
use std::path::Path;

use filetime::FileTime;

/// Copies one file to a destination path, overwriting it.
pub trait FileCopier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Copy `source` to `dest`, returning the number of bytes copied.
    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64>;
}

/// Content and timestamp copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCopier;

impl FileCopier for PlainCopier {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64> {
        copy_with_times(source, dest)
    }
}

/// Content, timestamp and access-control copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AclCopier;

impl AclCopier {
    /// Check whether this platform exposes discretionary ACLs.
    pub fn is_supported() -> bool {
        cfg!(windows)
    }
}

impl FileCopier for AclCopier {
    fn name(&self) -> &'static str {
        "acl"
    }

    #[cfg(windows)]
    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64> {
        let dacl = match acl::read_dacl(source) {
            Ok(dacl) => Some(dacl),
            Err(err) => {
                tracing::debug!(path = %source.display(), error = %err, "ACL unavailable, copying without it");
                None
            }
        };

        let bytes = copy_with_times(source, dest)?;

        if let Some(dacl) = dacl {
            if let Err(err) = acl::write_dacl(dest, &dacl) {
                tracing::debug!(path = %dest.display(), error = %err, "Failed to apply ACL");
            }
        }

        Ok(bytes)
    }

    #[cfg(not(windows))]
    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64> {
        copy_with_times(source, dest)
    }
}

/// Pick the richest copy strategy the platform supports.
pub fn select_copier(preserve_acl: bool) -> Box<dyn FileCopier> {
    if preserve_acl && AclCopier::is_supported() {
        Box::new(AclCopier)
    } else {
        Box::new(PlainCopier)
    }
}

fn copy_with_times(source: &Path, dest: &Path) -> io::Result<u64> {
    let metadata = fs::metadata(source)?;
    let bytes = fs::copy(source, dest)?;

    filetime::set_file_times(
        dest,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )?;

    Ok(bytes)
}

#[cfg(windows)]
mod acl {
    use std::io;
    use std::iter;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use windows::Win32::Security::{
        DACL_SECURITY_INFORMATION, GetFileSecurityW, PSECURITY_DESCRIPTOR, SetFileSecurityW,
    };
    use windows::core::PCWSTR;

    fn wide(path: &Path) -> Vec<u16> {
        path.as_os_str()
            .encode_wide()
            .chain(iter::once(0))
            .collect()
    }

    /// Read the self-relative security descriptor holding the DACL.
    pub(super) fn read_dacl(path: &Path) -> io::Result<Vec<u8>> {
        let name = wide(path);
        let mut needed = 0u32;

        // SAFETY: `name` is NUL-terminated and outlives both calls; the second
        // call writes at most `needed` bytes into `buffer`.
        unsafe {
            let _ = GetFileSecurityW(
                PCWSTR(name.as_ptr()),
                DACL_SECURITY_INFORMATION.0,
                PSECURITY_DESCRIPTOR(std::ptr::null_mut()),
                0,
                &mut needed,
            );
            if needed == 0 {
                return Err(io::Error::last_os_error());
            }

            let mut buffer = vec![0u8; needed as usize];
            GetFileSecurityW(
                PCWSTR(name.as_ptr()),
                DACL_SECURITY_INFORMATION.0,
                PSECURITY_DESCRIPTOR(buffer.as_mut_ptr().cast()),
                needed,
                &mut needed,
            )
            .ok()?;

            Ok(buffer)
        }
    }

    /// Apply a DACL read by [`read_dacl`] to another file.
    pub(super) fn write_dacl(path: &Path, descriptor: &[u8]) -> io::Result<()> {
        let name = wide(path);
        let mut descriptor = descriptor.to_vec();

        // SAFETY: `descriptor` holds a valid self-relative descriptor produced
        // by GetFileSecurityW and lives until the call returns.
        unsafe {
            SetFileSecurityW(
                PCWSTR(name.as_ptr()),
                DACL_SECURITY_INFORMATION,
                PSECURITY_DESCRIPTOR(descriptor.as_mut_ptr().cast()),
            )
            .ok()?;
        }

        Ok(())
    }
}
