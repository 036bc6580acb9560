// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! BSD-family and macOS adapter over `sysctl`.
//!
//! Every query reads one `hw.*` or `vm.*` variable. OpenBSD has no
//! `sysctlbyname`, so its native source addresses the same variables by
//! numeric MIB instead.
//!
//! # Platform differences
//! - `architecture` is `hw.machine_arch`, except on macOS (`hw.machine`) and
//!   OpenBSD, which has no architecture MIB and reports `hw.model`.
//! - `machine` is `hw.machine`, except on OpenBSD, where it is `hw.model`
//!   like the other two strings.
//! - Clock speed is host-wide: `hw.clockrate` (MHz), `hw.cpuspeed` on
//!   OpenBSD, `hw.cpufrequency` (Hz) on macOS.
//! - Only macOS (`hw.activecpu`) and OpenBSD (`hw.ncpuonline`) report an
//!   online processor count.

use crate::{Capabilities, Capability, CpuProvider, LoadAverage, QueryError};

/// The `sysctl` variables this adapter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysctlKey {
    Ncpu,
    ActiveCpu,
    Model,
    Machine,
    MachineArch,
    /// Clock speed in MHz.
    ClockRate,
    /// Clock speed in Hz (macOS).
    CpuFrequency,
}

impl SysctlKey {
    /// The `sysctlbyname` name of this variable.
    pub fn name(&self, flavor: BsdFlavor) -> &'static str {
        match self {
            Self::Ncpu => "hw.ncpu",
            Self::ActiveCpu if flavor == BsdFlavor::OpenBsd => "hw.ncpuonline",
            Self::ActiveCpu => "hw.activecpu",
            Self::Model => "hw.model",
            Self::Machine => "hw.machine",
            Self::MachineArch => "hw.machine_arch",
            Self::ClockRate if flavor == BsdFlavor::OpenBsd => "hw.cpuspeed",
            Self::ClockRate => "hw.clockrate",
            Self::CpuFrequency => "hw.cpufrequency",
        }
    }
}

/// Which member of the family the adapter is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsdFlavor {
    FreeBsd,
    DragonFly,
    NetBsd,
    OpenBsd,
    MacOs,
}

impl BsdFlavor {
    /// The flavor this crate was compiled for, if any.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "freebsd" => Some(Self::FreeBsd),
            "dragonfly" => Some(Self::DragonFly),
            "netbsd" => Some(Self::NetBsd),
            "openbsd" => Some(Self::OpenBsd),
            "macos" | "ios" => Some(Self::MacOs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeBsd => "freebsd",
            Self::DragonFly => "dragonfly",
            Self::NetBsd => "netbsd",
            Self::OpenBsd => "openbsd",
            Self::MacOs => "macos",
        }
    }
}

/// Contents of `vm.loadavg` (`struct loadavg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLoadAvg {
    pub ldavg: [u32; 3],
    pub fscale: i64,
}

/// Reads `sysctl` variables.
///
/// `Ok(None)` means the variable does not exist on this system; any other
/// failure is an error.
pub trait SysctlSource: Send + Sync {
    fn integer(&self, key: SysctlKey) -> Result<Option<i64>, QueryError>;

    fn string(&self, key: SysctlKey) -> Result<Option<String>, QueryError>;

    fn loadavg(&self) -> Result<RawLoadAvg, QueryError>;
}

/// Processor adapter for the BSD family and macOS.
#[derive(Debug)]
pub struct SysctlProvider<S> {
    source: S,
    flavor: BsdFlavor,
}

impl<S: SysctlSource> SysctlProvider<S> {
    pub fn new(source: S, flavor: BsdFlavor) -> Self {
        Self { source, flavor }
    }

    fn required_integer(&self, key: SysctlKey) -> Result<i64, QueryError> {
        tracing::debug!("sysctl {}", key.name(self.flavor));
        self.source
            .integer(key)?
            .ok_or_else(|| QueryError::not_found(key.name(self.flavor)))
    }

    fn required_string(&self, key: SysctlKey) -> Result<String, QueryError> {
        tracing::debug!("sysctl {}", key.name(self.flavor));
        self.source
            .string(key)?
            .ok_or_else(|| QueryError::not_found(key.name(self.flavor)))
    }

    fn count(&self, key: SysctlKey) -> Result<u32, QueryError> {
        let n = self.required_integer(key)?;
        u32::try_from(n).map_err(|_| QueryError::Parse {
            path: key.name(self.flavor).to_string(),
            detail: format!("processor count {n} out of range"),
        })
    }
}

impl<S: SysctlSource> CpuProvider for SysctlProvider<S> {
    fn platform(&self) -> &'static str {
        self.flavor.as_str()
    }

    fn capabilities(&self) -> Capabilities {
        match self.flavor {
            BsdFlavor::MacOs | BsdFlavor::OpenBsd => Capabilities::NONE.with(Capability::ActiveCpuCount),
            _ => Capabilities::NONE,
        }
    }

    fn num_cpu(&self) -> Result<u32, QueryError> {
        self.count(SysctlKey::Ncpu)
    }

    fn num_active_cpu(&self) -> Result<u32, QueryError> {
        if !self.supports(Capability::ActiveCpuCount) {
            return self.num_cpu();
        }
        self.count(SysctlKey::ActiveCpu)
    }

    fn model(&self) -> Result<String, QueryError> {
        self.required_string(SysctlKey::Model)
    }

    fn architecture(&self) -> Result<String, QueryError> {
        let key = match self.flavor {
            BsdFlavor::MacOs => SysctlKey::Machine,
            BsdFlavor::OpenBsd => SysctlKey::Model,
            _ => SysctlKey::MachineArch,
        };
        self.required_string(key)
    }

    fn machine(&self) -> Result<String, QueryError> {
        let key = match self.flavor {
            BsdFlavor::OpenBsd => SysctlKey::Model,
            _ => SysctlKey::Machine,
        };
        self.required_string(key)
    }

    /// The clock rate is host-wide, so every valid index reports the same
    /// value.
    fn frequency(&self, index: u32) -> Result<u32, QueryError> {
        let total = self.num_cpu()?;
        if index >= total {
            return Err(QueryError::invalid_cpu(
                index,
                format!("host has {total} processors"),
            ));
        }

        let mhz = match self.flavor {
            BsdFlavor::MacOs => self.required_integer(SysctlKey::CpuFrequency)? / 1_000_000,
            _ => self.required_integer(SysctlKey::ClockRate)?,
        };

        if mhz <= 0 {
            return Err(QueryError::invalid_cpu(index, "clock rate reported as 0"));
        }
        u32::try_from(mhz).map_err(|_| QueryError::Parse {
            path: "clock rate".to_string(),
            detail: format!("{mhz} MHz out of range"),
        })
    }

    fn load_average(&self) -> Result<LoadAverage, QueryError> {
        tracing::debug!("sysctl vm.loadavg");
        let raw = self.source.loadavg()?;
        let scale = u64::try_from(raw.fscale).unwrap_or(0);
        LoadAverage::from_fixed_point(raw.ldavg.map(u64::from), scale, "vm.loadavg")
    }
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos",
    target_os = "ios",
))]
pub use native::LibcSysctl;

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos",
    target_os = "ios",
))]
impl SysctlProvider<LibcSysctl> {
    /// Adapter over the running kernel.
    pub fn native() -> Self {
        let flavor = BsdFlavor::current().unwrap_or(BsdFlavor::FreeBsd);
        Self::new(LibcSysctl { flavor }, flavor)
    }
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "macos",
    target_os = "ios",
))]
mod native {
    use super::{BsdFlavor, RawLoadAvg, SysctlKey, SysctlSource};
    use crate::QueryError;
    use std::ffi::c_void;

    /// `struct loadavg` from `<sys/resource.h>`.
    #[repr(C)]
    struct LoadAvg {
        ldavg: [u32; 3],
        fscale: libc::c_long,
    }

    /// `sysctl` through libc.
    #[derive(Debug, Clone, Copy)]
    pub struct LibcSysctl {
        pub(super) flavor: BsdFlavor,
    }

    impl LibcSysctl {
        /// Copies the raw bytes of a variable. `Ok(None)` on `ENOENT`.
        fn read(&self, name: &'static str, buf: &mut Vec<u8>) -> Result<Option<usize>, QueryError> {
            let mut len = buf.len();
            let rc = sysctl_raw(name, buf.as_mut_ptr().cast(), &mut len);
            if rc != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::ENOENT) {
                    return Ok(None);
                }
                return Err(QueryError::Os {
                    call: format!("sysctl({name})"),
                    source: err,
                });
            }
            Ok(Some(len))
        }

        /// Reads a variable of unknown size: asks for the size first.
        fn read_vec(&self, key: SysctlKey) -> Result<Option<Vec<u8>>, QueryError> {
            let name = key.name(self.flavor);
            let mut len = 0usize;
            if sysctl_raw(name, std::ptr::null_mut(), &mut len) != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(libc::ENOENT) {
                    return Ok(None);
                }
                return Err(QueryError::Os {
                    call: format!("sysctl({name})"),
                    source: err,
                });
            }
            let mut buf = vec![0u8; len];
            Ok(self.read(name, &mut buf)?.map(|n| {
                buf.truncate(n);
                buf
            }))
        }
    }

    impl SysctlSource for LibcSysctl {
        fn integer(&self, key: SysctlKey) -> Result<Option<i64>, QueryError> {
            let Some(bytes) = self.read_vec(key)? else {
                return Ok(None);
            };
            match bytes.len() {
                4 => Ok(Some(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64)),
                8 => {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(&bytes);
                    Ok(Some(i64::from_ne_bytes(b)))
                }
                n => Err(QueryError::Parse {
                    path: key.name(self.flavor).to_string(),
                    detail: format!("unexpected integer width {n}"),
                }),
            }
        }

        fn string(&self, key: SysctlKey) -> Result<Option<String>, QueryError> {
            Ok(self.read_vec(key)?.map(|bytes| {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                String::from_utf8_lossy(&bytes[..end]).trim().to_string()
            }))
        }

        fn loadavg(&self) -> Result<RawLoadAvg, QueryError> {
            let mut la = LoadAvg {
                ldavg: [0; 3],
                fscale: 0,
            };
            let mut len = std::mem::size_of::<LoadAvg>();
            if sysctl_raw("vm.loadavg", (&mut la as *mut LoadAvg).cast(), &mut len) != 0 {
                return Err(QueryError::last_os_error("sysctl(vm.loadavg)"));
            }
            Ok(RawLoadAvg {
                ldavg: la.ldavg,
                fscale: la.fscale as i64,
            })
        }
    }

    #[cfg(not(target_os = "openbsd"))]
    fn sysctl_raw(name: &'static str, out: *mut c_void, len: &mut usize) -> libc::c_int {
        let Ok(cname) = std::ffi::CString::new(name) else {
            return -1;
        };
        // SAFETY: `out` is null (size query) or points to `*len` writable bytes.
        unsafe { libc::sysctlbyname(cname.as_ptr(), out, len, std::ptr::null_mut(), 0) }
    }

    #[cfg(target_os = "openbsd")]
    fn sysctl_raw(name: &'static str, out: *mut c_void, len: &mut usize) -> libc::c_int {
        const CTL_VM: libc::c_int = 2;
        const CTL_HW: libc::c_int = 6;
        const VM_LOADAVG: libc::c_int = 2;
        const HW_MACHINE: libc::c_int = 1;
        const HW_MODEL: libc::c_int = 2;
        const HW_NCPU: libc::c_int = 3;
        const HW_CPUSPEED: libc::c_int = 12;
        const HW_NCPUONLINE: libc::c_int = 25;

        let mib: [libc::c_int; 2] = match name {
            "hw.machine" => [CTL_HW, HW_MACHINE],
            "hw.model" => [CTL_HW, HW_MODEL],
            "hw.ncpu" => [CTL_HW, HW_NCPU],
            "hw.cpuspeed" => [CTL_HW, HW_CPUSPEED],
            "hw.ncpuonline" => [CTL_HW, HW_NCPUONLINE],
            "vm.loadavg" => [CTL_VM, VM_LOADAVG],
            _ => {
                // SAFETY: errno is thread-local.
                unsafe { *libc::__errno() = libc::ENOENT };
                return -1;
            }
        };
        // SAFETY: `out` is null (size query) or points to `*len` writable bytes.
        unsafe {
            libc::sysctl(
                mib.as_ptr(),
                mib.len() as libc::c_uint,
                out,
                len,
                std::ptr::null_mut(),
                0,
            )
        }
    }
}
