// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Solaris and illumos adapter over `processor_info(2)`, `getloadavg(3C)` and
//! `kstat(3KSTAT)`.
//!
//! Processor numbering starts at 0 on most systems and at 1 on some, so
//! host-wide strings read from "the first processor" probe index 0 and then
//! index 1.
//!
//! When `getloadavg` is unavailable the load average is read from the
//! `unix:0:system_misc` kernel statistics (`avenrun_1min`, `avenrun_5min`,
//! `avenrun_15min`), which hold fixed-point values scaled by `FSCALE`.

use crate::{Capabilities, Capability, CpuProvider, LoadAverage, ProcessorState, QueryError};

// Processor states from <sys/processor.h>.
const P_OFFLINE: i32 = 1;
const P_ONLINE: i32 = 2;
const P_POWEROFF: i32 = 5;
const P_NOINTR: i32 = 6;

/// `FSCALE` from <sys/param.h> (`1 << FSHIFT`, `FSHIFT` = 8).
pub const FSCALE: u64 = 1 << 8;

/// The fields of `processor_info_t` this adapter uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProcessor {
    /// `pi_state`, one of the `P_*` constants.
    pub state: i32,
    pub processor_type: String,
    pub fpu_type: String,
    /// `pi_clock`, in MHz.
    pub clock_mhz: i32,
}

/// Issues the native Solaris calls.
pub trait SolarisSource: Send + Sync {
    /// `processor_info(id)`. `Ok(None)` if the kernel rejects the id.
    fn processor_info(&self, id: u32) -> Result<Option<RawProcessor>, QueryError>;

    /// `sysconf(_SC_NPROCESSORS_ONLN)`.
    fn online_count(&self) -> Result<u32, QueryError>;

    /// `sysconf(_SC_NPROCESSORS_CONF)`.
    fn configured_count(&self) -> Result<u32, QueryError>;

    fn uname_machine(&self) -> Result<String, QueryError>;

    fn getloadavg(&self) -> Result<[f64; 3], QueryError>;

    /// Raw `avenrun_{1,5,15}min` from `unix:0:system_misc`.
    ///
    /// The kstat handle must be opened, read and closed within this call.
    fn kstat_avenrun(&self) -> Result<[u32; 3], QueryError>;
}

/// Processor adapter for Solaris and illumos.
#[derive(Debug)]
pub struct SolarisProvider<S> {
    source: S,
    kstat_fallback: bool,
}

impl<S: SolarisSource> SolarisProvider<S> {
    pub fn new(source: S, kstat_fallback: bool) -> Self {
        Self {
            source,
            kstat_fallback,
        }
    }

    /// Reads processor 0, or processor 1 on systems that number from 1.
    fn first_processor(&self) -> Result<RawProcessor, QueryError> {
        if let Some(p) = self.source.processor_info(0)? {
            return Ok(p);
        }
        tracing::warn!("processor_info(0) failed, probing processor 1");
        self.source
            .processor_info(1)?
            .ok_or_else(|| QueryError::not_found("processor 0 or 1"))
    }

    fn processor_record(&self, index: u32) -> Result<RawProcessor, QueryError> {
        tracing::debug!("processor_info({index})");
        self.source
            .processor_info(index)?
            .ok_or_else(|| QueryError::invalid_cpu(index, "processor_info() failed"))
    }
}

fn map_state(code: i32) -> ProcessorState {
    match code {
        P_ONLINE | P_NOINTR => ProcessorState::Online,
        P_OFFLINE => ProcessorState::Offline,
        P_POWEROFF => ProcessorState::PoweredOff,
        _ => ProcessorState::Unknown,
    }
}

impl<S: SolarisSource> CpuProvider for SolarisProvider<S> {
    fn platform(&self) -> &'static str {
        "solaris"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with(Capability::ProcessorState)
            .with(Capability::ActiveCpuCount)
            .with(Capability::FpuType)
    }

    fn num_cpu(&self) -> Result<u32, QueryError> {
        self.source.configured_count()
    }

    fn num_active_cpu(&self) -> Result<u32, QueryError> {
        self.source.online_count()
    }

    /// Identical to [`CpuProvider::machine`]: the kernel exposes the
    /// hardware class (e.g. `sun4u`), not the exact model.
    fn model(&self) -> Result<String, QueryError> {
        self.source.uname_machine()
    }

    fn architecture(&self) -> Result<String, QueryError> {
        Ok(self.first_processor()?.processor_type)
    }

    fn machine(&self) -> Result<String, QueryError> {
        self.source.uname_machine()
    }

    fn frequency(&self, index: u32) -> Result<u32, QueryError> {
        let p = self.processor_record(index)?;
        if !map_state(p.state).is_online() {
            return Err(QueryError::invalid_cpu(
                index,
                format!("processor is {}", map_state(p.state)),
            ));
        }
        if p.clock_mhz <= 0 {
            return Err(QueryError::invalid_cpu(index, "clock speed reported as 0"));
        }
        Ok(p.clock_mhz as u32)
    }

    fn state(&self, index: u32) -> Result<ProcessorState, QueryError> {
        Ok(map_state(self.processor_record(index)?.state))
    }

    fn load_average(&self) -> Result<LoadAverage, QueryError> {
        match self.source.getloadavg() {
            Ok(values) => LoadAverage::from_array(values, "getloadavg()"),
            Err(e) if self.kstat_fallback => {
                tracing::warn!("{e}; reading unix:0:system_misc");
                let raw = self.source.kstat_avenrun()?;
                LoadAverage::from_fixed_point(raw.map(u64::from), FSCALE, "unix:0:system_misc")
            }
            Err(e) => Err(e),
        }
    }

    fn fpu_type(&self) -> Result<String, QueryError> {
        Ok(self.first_processor()?.fpu_type)
    }
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub use native::SolarisNative;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
impl SolarisProvider<SolarisNative> {
    /// Adapter over the running kernel.
    pub fn native(kstat_fallback: bool) -> Self {
        Self::new(SolarisNative, kstat_fallback)
    }
}

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
mod native {
    use super::{RawProcessor, SolarisSource};
    use crate::platform::c_chars_to_string;
    use crate::QueryError;
    use std::ffi::{c_char, c_double, c_int, c_void, CStr};

    const PI_TYPELEN: usize = 16;
    const PI_FPUTYPE: usize = 32;
    const KSTAT_STRLEN: usize = 31;

    #[repr(C)]
    struct ProcessorInfoT {
        pi_state: c_int,
        pi_processor_type: [c_char; PI_TYPELEN],
        pi_fputypes: [c_char; PI_FPUTYPE],
        pi_clock: c_int,
    }

    #[repr(C)]
    struct KstatCtl {
        _private: [u8; 0],
    }

    #[repr(C)]
    struct Kstat {
        _private: [u8; 0],
    }

    #[repr(C)]
    #[derive(Clone, Copy)]
    #[allow(dead_code)]
    union KstatValue {
        c: [c_char; 16],
        i32: i32,
        ui32: u32,
        i64: i64,
        ui64: u64,
    }

    #[repr(C)]
    #[allow(dead_code)]
    struct KstatNamed {
        name: [c_char; KSTAT_STRLEN],
        data_type: u8,
        value: KstatValue,
    }

    extern "C" {
        fn processor_info(processorid: c_int, infop: *mut ProcessorInfoT) -> c_int;
        fn getloadavg(loadavg: *mut c_double, nelem: c_int) -> c_int;
    }

    #[link(name = "kstat")]
    extern "C" {
        fn kstat_open() -> *mut KstatCtl;
        fn kstat_close(kc: *mut KstatCtl) -> c_int;
        fn kstat_lookup(
            kc: *mut KstatCtl,
            module: *const c_char,
            instance: c_int,
            name: *const c_char,
        ) -> *mut Kstat;
        fn kstat_read(kc: *mut KstatCtl, ksp: *mut Kstat, buf: *mut c_void) -> c_int;
        fn kstat_data_lookup(ksp: *mut Kstat, name: *const c_char) -> *mut c_void;
    }

    /// Open kstat chain, closed on drop.
    struct KstatHandle(*mut KstatCtl);

    impl KstatHandle {
        fn open() -> Result<Self, QueryError> {
            // SAFETY: no preconditions; null signals failure.
            let kc = unsafe { kstat_open() };
            if kc.is_null() {
                return Err(QueryError::last_os_error("kstat_open()"));
            }
            Ok(Self(kc))
        }

        fn read_named(
            &self,
            module: &CStr,
            instance: c_int,
            name: &CStr,
            stats: [&CStr; 3],
        ) -> Result<[u32; 3], QueryError> {
            // SAFETY: the chain is open for the lifetime of `self`.
            let ksp = unsafe { kstat_lookup(self.0, module.as_ptr(), instance, name.as_ptr()) };
            if ksp.is_null() {
                return Err(QueryError::last_os_error("kstat_lookup()"));
            }
            if unsafe { kstat_read(self.0, ksp, std::ptr::null_mut()) } == -1 {
                return Err(QueryError::last_os_error("kstat_read()"));
            }

            let mut out = [0u32; 3];
            for (slot, stat) in out.iter_mut().zip(stats) {
                let kn = unsafe { kstat_data_lookup(ksp, stat.as_ptr()) } as *const KstatNamed;
                if kn.is_null() {
                    return Err(QueryError::not_found(format!(
                        "kstat {}",
                        stat.to_string_lossy()
                    )));
                }
                // SAFETY: avenrun_* are KSTAT_DATA_UINT32 entries of the record
                // just read.
                *slot = unsafe { (*kn).value.ui32 };
            }
            Ok(out)
        }
    }

    impl Drop for KstatHandle {
        fn drop(&mut self) {
            // SAFETY: opened by kstat_open and closed exactly once.
            unsafe { kstat_close(self.0) };
        }
    }

    fn sysconf_count(name: c_int, call: &str) -> Result<u32, QueryError> {
        // SAFETY: sysconf has no memory preconditions.
        let n = unsafe { libc::sysconf(name) };
        if n < 0 {
            return Err(QueryError::last_os_error(call));
        }
        Ok(n as u32)
    }

    /// The running Solaris kernel.
    #[derive(Debug, Clone, Copy)]
    pub struct SolarisNative;

    impl SolarisSource for SolarisNative {
        fn processor_info(&self, id: u32) -> Result<Option<RawProcessor>, QueryError> {
            // SAFETY: `processor_info_t` is plain old data.
            let mut pi: ProcessorInfoT = unsafe { std::mem::zeroed() };
            if unsafe { processor_info(id as c_int, &mut pi) } != 0 {
                return Ok(None);
            }
            Ok(Some(RawProcessor {
                state: pi.pi_state,
                processor_type: c_chars_to_string(&pi.pi_processor_type),
                fpu_type: c_chars_to_string(&pi.pi_fputypes),
                clock_mhz: pi.pi_clock,
            }))
        }

        fn online_count(&self) -> Result<u32, QueryError> {
            sysconf_count(libc::_SC_NPROCESSORS_ONLN, "sysconf(_SC_NPROCESSORS_ONLN)")
        }

        fn configured_count(&self) -> Result<u32, QueryError> {
            sysconf_count(libc::_SC_NPROCESSORS_CONF, "sysconf(_SC_NPROCESSORS_CONF)")
        }

        fn uname_machine(&self) -> Result<String, QueryError> {
            crate::platform::uname_machine()
        }

        fn getloadavg(&self) -> Result<[f64; 3], QueryError> {
            let mut avgs = [0f64; 3];
            // SAFETY: the buffer holds exactly three doubles.
            if unsafe { getloadavg(avgs.as_mut_ptr(), 3) } < 3 {
                return Err(QueryError::last_os_error("getloadavg()"));
            }
            Ok(avgs)
        }

        fn kstat_avenrun(&self) -> Result<[u32; 3], QueryError> {
            let handle = KstatHandle::open()?;
            handle.read_named(
                c"unix",
                0,
                c"system_misc",
                [c"avenrun_1min", c"avenrun_5min", c"avenrun_15min"],
            )
        }
    }
}
