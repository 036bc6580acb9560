// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-platform adapters and build-time selection of the native one.
//!
//! | Adapter | Platforms | Native interface |
//! |---|---|---|
//! | [`SysctlProvider`] | FreeBSD, DragonFly, NetBSD, OpenBSD, macOS | `sysctl` / `sysctlbyname` |
//! | [`SolarisProvider`] | Solaris, illumos | `processor_info`, `getloadavg`, `kstat` |
//! | [`PstatProvider`] | HP-UX | `pstat_getdynamic`, `pstat_getprocessor` |
//! | [`ProcfsProvider`] | Linux, Android | `/proc`, `/sys` |
//!
//! Each adapter is generic over a *source* trait that issues the actual
//! system calls. The adapter holds the validation and derivation rules; the
//! source only copies kernel data out. Sources for other operating systems
//! are not compiled, so the adapters are tested against in-memory sources.

pub mod bsd;
pub mod hpux;
#[cfg(unix)]
pub mod linux;
pub mod solaris;

pub use bsd::{BsdFlavor, RawLoadAvg, SysctlKey, SysctlProvider, SysctlSource};
pub use hpux::{PstDynamic, PstProcessor, PstatProvider, PstatSource};
#[cfg(unix)]
pub use linux::ProcfsProvider;
pub use solaris::{RawProcessor, SolarisProvider, SolarisSource};

use crate::{CpuProvider, ProviderConfig, QueryError};

/// Returns the adapter for the operating system this crate was built for.
pub fn native(config: &ProviderConfig) -> Result<Box<dyn CpuProvider>, QueryError> {
    select(config)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn select(config: &ProviderConfig) -> Result<Box<dyn CpuProvider>, QueryError> {
    tracing::debug!(
        "using procfs provider (proc: {}, sys: {})",
        config.proc_root.display(),
        config.sys_root.display(),
    );
    Ok(Box::new(ProcfsProvider::new(
        config.proc_root.clone(),
        config.sys_root.clone(),
    )))
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos",
    target_os = "ios",
))]
fn select(_config: &ProviderConfig) -> Result<Box<dyn CpuProvider>, QueryError> {
    tracing::debug!("using sysctl provider");
    Ok(Box::new(SysctlProvider::native()))
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
fn select(config: &ProviderConfig) -> Result<Box<dyn CpuProvider>, QueryError> {
    tracing::debug!("using solaris provider (kstat fallback: {})", config.kstat_fallback);
    Ok(Box::new(SolarisProvider::native(config.kstat_fallback)))
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos",
    target_os = "ios",
    target_os = "solaris",
    target_os = "illumos",
)))]
fn select(_config: &ProviderConfig) -> Result<Box<dyn CpuProvider>, QueryError> {
    Err(QueryError::Unsupported {
        operation: "native provider",
        platform: std::env::consts::OS,
    })
}

/// Machine hardware name from `uname(2)`.
#[cfg(unix)]
pub(crate) fn uname_machine() -> Result<String, QueryError> {
    // SAFETY: `utsname` is plain old data; uname fills it on success.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } < 0 {
        return Err(QueryError::last_os_error("uname()"));
    }
    Ok(c_chars_to_string(&uts.machine))
}

/// Converts a NUL-terminated C character array to a `String`, stopping at the
/// first NUL or the end of the buffer, whichever comes first.
pub(crate) fn c_chars_to_string(buf: &[std::ffi::c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_chars_stop_at_nul() {
        let buf: Vec<std::ffi::c_char> = b"sparcv9\0junk"
            .iter()
            .map(|&b| b as std::ffi::c_char)
            .collect();
        assert_eq!(c_chars_to_string(&buf), "sparcv9");
    }

    #[test]
    fn test_c_chars_without_nul() {
        let buf: Vec<std::ffi::c_char> = b"i86pc".iter().map(|&b| b as std::ffi::c_char).collect();
        assert_eq!(c_chars_to_string(&buf), "i86pc");
    }

    #[cfg(unix)]
    #[test]
    fn test_uname_machine() {
        let m = uname_machine().unwrap();
        assert!(!m.is_empty());
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_native_is_procfs() {
        let p = native(&ProviderConfig::default()).unwrap();
        assert_eq!(p.platform(), "linux");
    }
}
