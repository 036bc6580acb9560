// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! HP-UX adapter over `pstat(2)`.
//!
//! Reads host-wide counts and load from `struct pst_dynamic` and per-processor
//! clock and load from `struct pst_processor`.
//!
//! `pstat_getprocessor` does not fail for an out-of-range index; it hands
//! back a zeroed record. The adapter therefore validates indices against
//! `psd_max_proc_cnt` and treats a computed clock speed of 0 as an invalid
//! index.
//!
//! Disabled processors keep their slot, so online processors need not be
//! the first `psd_proc_cnt` indices. Per-processor load walks every slot up
//! to `psd_max_proc_cnt` and leaves out the disabled ones.
//!
//! No Rust toolchain targets HP-UX, so this crate ships no native
//! [`PstatSource`]. Embedders supply one (typically over a small C shim).

use crate::{
    Capabilities, Capability, CpuProvider, LoadAverage, ProcessorLoads, QueryError,
};

// `sysconf(_SC_CPU_VERSION)` values from <unistd.h>.
const CPU_PA_RISC1_0: i64 = 0x20B;
const CPU_HP_MC68020: i64 = 0x20C;
const CPU_HP_MC68030: i64 = 0x20D;
const CPU_HP_MC68040: i64 = 0x20E;
const CPU_PA_RISC1_1: i64 = 0x210;
const CPU_PA_RISC1_2: i64 = 0x211;
const CPU_PA_RISC2_0: i64 = 0x214;
const CPU_IA64_ARCHREV_0: i64 = 0x300;

/// The fields of `struct pst_dynamic` this adapter uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PstDynamic {
    /// `psd_max_proc_cnt`: processors configured.
    pub max_proc_cnt: i64,
    /// `psd_proc_cnt`: processors active.
    pub proc_cnt: i64,
    pub avg_1_min: f64,
    pub avg_5_min: f64,
    pub avg_15_min: f64,
}

/// The fields of `struct pst_processor` this adapter uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PstProcessor {
    /// `psp_processor_state == PSP_SPU_ENABLED`.
    pub enabled: bool,
    /// `psp_iticksperclktick`: interval timer ticks per clock tick.
    pub iticksperclktick: u64,
    pub avg_1_min: f64,
    pub avg_5_min: f64,
    pub avg_15_min: f64,
}

/// Issues the native HP-UX calls.
pub trait PstatSource: Send + Sync {
    /// `pstat_getdynamic(&psd, sizeof(psd), 1, 0)`.
    fn dynamic(&self) -> Result<PstDynamic, QueryError>;

    /// `pstat_getprocessor(&psp, sizeof(psp), 1, index)`. `Ok(None)` when
    /// no record was returned.
    fn processor(&self, index: u32) -> Result<Option<PstProcessor>, QueryError>;

    /// `sysconf(_SC_CLK_TCK)`.
    fn clock_ticks_per_second(&self) -> Result<u64, QueryError>;

    /// `sysconf(_SC_CPU_VERSION)`.
    fn cpu_version(&self) -> Result<i64, QueryError>;

    fn uname_machine(&self) -> Result<String, QueryError>;
}

/// Processor adapter for HP-UX.
#[derive(Debug)]
pub struct PstatProvider<S> {
    source: S,
}

impl<S: PstatSource> PstatProvider<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn dynamic(&self) -> Result<PstDynamic, QueryError> {
        tracing::debug!("pstat_getdynamic()");
        self.source.dynamic()
    }

    fn check_index(&self, index: u32) -> Result<(), QueryError> {
        let total = self.num_cpu()?;
        if index >= total {
            return Err(QueryError::invalid_cpu(
                index,
                format!("host has {total} processors"),
            ));
        }
        Ok(())
    }

    fn processor_record(&self, index: u32) -> Result<PstProcessor, QueryError> {
        tracing::debug!("pstat_getprocessor({index})");
        self.source
            .processor(index)?
            .ok_or_else(|| QueryError::invalid_cpu(index, "pstat_getprocessor() returned no record"))
    }

    /// Record of an existing, enabled processor.
    fn enabled_record(&self, index: u32) -> Result<PstProcessor, QueryError> {
        self.check_index(index)?;
        let record = self.processor_record(index)?;
        if !record.enabled {
            return Err(QueryError::invalid_cpu(index, "processor is disabled"));
        }
        Ok(record)
    }
}

fn count(value: i64, field: &str) -> Result<u32, QueryError> {
    u32::try_from(value).map_err(|_| QueryError::Parse {
        path: format!("pst_dynamic.{field}"),
        detail: format!("processor count {value} out of range"),
    })
}

fn architecture_name(version: i64) -> Option<&'static str> {
    Some(match version {
        CPU_HP_MC68020 => "Motorola MC68020",
        CPU_HP_MC68030 => "Motorola MC68030",
        CPU_HP_MC68040 => "Motorola MC68040",
        CPU_PA_RISC1_0 => "HP PA-RISC 1.0",
        CPU_PA_RISC1_1 => "HP PA-RISC 1.1",
        CPU_PA_RISC1_2 => "HP PA-RISC 1.2",
        CPU_PA_RISC2_0 => "HP PA-RISC 2.0",
        CPU_IA64_ARCHREV_0 => "Intel Itanium",
        _ => return None,
    })
}

/// `(ticks_per_clock_tick * clock_ticks_per_second) / 1_000_000`.
fn clock_mhz(iticksperclktick: u64, clk_tck: u64) -> u64 {
    iticksperclktick.saturating_mul(clk_tck) / 1_000_000
}

impl<S: PstatSource> CpuProvider for PstatProvider<S> {
    fn platform(&self) -> &'static str {
        "hpux"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with(Capability::PerCpuLoad)
            .with(Capability::ActiveCpuCount)
    }

    fn num_cpu(&self) -> Result<u32, QueryError> {
        count(self.dynamic()?.max_proc_cnt, "psd_max_proc_cnt")
    }

    fn num_active_cpu(&self) -> Result<u32, QueryError> {
        count(self.dynamic()?.proc_cnt, "psd_proc_cnt")
    }

    /// Identical to [`CpuProvider::architecture`]; pstat has no model field.
    fn model(&self) -> Result<String, QueryError> {
        self.architecture()
    }

    fn architecture(&self) -> Result<String, QueryError> {
        let version = self.source.cpu_version()?;
        architecture_name(version)
            .map(str::to_string)
            .ok_or_else(|| QueryError::not_found(format!("architecture for CPU version {version:#x}")))
    }

    fn machine(&self) -> Result<String, QueryError> {
        self.source.uname_machine()
    }

    fn frequency(&self, index: u32) -> Result<u32, QueryError> {
        let record = self.enabled_record(index)?;
        let clk_tck = self.source.clock_ticks_per_second()?;
        let mhz = clock_mhz(record.iticksperclktick, clk_tck);
        if mhz == 0 {
            return Err(QueryError::invalid_cpu(index, "computed clock speed is 0"));
        }
        u32::try_from(mhz).map_err(|_| QueryError::Parse {
            path: "pst_processor.psp_iticksperclktick".to_string(),
            detail: format!("{mhz} MHz out of range"),
        })
    }

    fn load_average(&self) -> Result<LoadAverage, QueryError> {
        let d = self.dynamic()?;
        LoadAverage::from_array([d.avg_1_min, d.avg_5_min, d.avg_15_min], "pst_dynamic")
    }

    fn per_processor_load_average(&self) -> Result<ProcessorLoads<'_>, QueryError> {
        let slots = self.num_cpu()?;
        Ok(ProcessorLoads::sparse(slots, move |index| {
            tracing::debug!("pstat_getprocessor({index})");
            match self.source.processor(index)? {
                Some(p) if p.enabled => {
                    LoadAverage::from_array([p.avg_1_min, p.avg_5_min, p.avg_15_min], "pst_processor")
                        .map(Some)
                }
                _ => {
                    tracing::debug!("skipping disabled processor {index}");
                    Ok(None)
                }
            }
        }))
    }

    fn processor_load_average(&self, index: u32) -> Result<LoadAverage, QueryError> {
        let p = self.enabled_record(index)?;
        LoadAverage::from_array([p.avg_1_min, p.avg_5_min, p.avg_15_min], "pst_processor")
    }
}
