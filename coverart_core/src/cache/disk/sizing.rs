//! Disk cache size policy
//!
//! The budget is a share of the free space on the volume holding the cache,
//! clamped between a floor and a ceiling.

use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How large the generic disk cache may grow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCacheSizing {
    /// Share of available space, in `(0, 1]`
    pub percent: f64,
    /// Lower bound in bytes
    pub min_bytes: u64,
    /// Upper bound in bytes
    pub max_bytes: u64,
}

impl Default for DiskCacheSizing {
    fn default() -> Self {
        Self {
            percent: 0.02,
            min_bytes: 10 * 1024 * 1024,  // 10MB
            max_bytes: 250 * 1024 * 1024, // 250MB
        }
    }
}

impl DiskCacheSizing {
    /// A fixed budget regardless of free space
    pub fn fixed(bytes: u64) -> Self {
        Self {
            percent: 1.0,
            min_bytes: bytes,
            max_bytes: bytes,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.percent > 0.0 && self.percent <= 1.0) {
            return Err(ValidationError::invalid_configuration(&format!(
                "disk cache percent must be within (0, 1], got {}",
                self.percent
            ))
            .into());
        }
        if self.min_bytes > self.max_bytes {
            return Err(ValidationError::invalid_configuration(&format!(
                "disk cache min_bytes ({}) exceeds max_bytes ({})",
                self.min_bytes, self.max_bytes
            ))
            .into());
        }
        Ok(())
    }

    /// Budget for a cache rooted at `dir`
    ///
    /// Falls back to the ceiling when free space can't be queried.
    pub fn resolve(&self, dir: &Path) -> u64 {
        match available_space(dir) {
            Some(available) => self.clamp(available),
            None => {
                log::debug!(
                    "Free space unknown for {}, using ceiling of {} bytes",
                    dir.display(),
                    self.max_bytes
                );
                self.max_bytes
            }
        }
    }

    fn clamp(&self, available: u64) -> u64 {
        let share = (available as f64 * self.percent) as u64;
        share.clamp(self.min_bytes, self.max_bytes)
    }
}

/// Bytes available to unprivileged users on the volume holding `path`
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
pub fn available_space(path: &Path) -> Option<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat = std::mem::MaybeUninit::<libc::statvfs>::uninit();

    // SAFETY: c_path is NUL-terminated and stat points to writable storage
    // of the right layout.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: statvfs returned 0, so the struct was filled in.
    let stat = unsafe { stat.assume_init() };

    Some((stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64))
}

#[cfg(not(unix))]
pub fn available_space(_path: &Path) -> Option<u64> {
    None
}
