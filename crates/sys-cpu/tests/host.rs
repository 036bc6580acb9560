// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: queries against the running host.
//!
//! These go through the native adapter, so they only assert properties
//! that hold on any machine. Queries a host may legitimately fail (for
//! example a VM with no clock speed exposed) are allowed to return an
//! error, but never a zero value.

use sys_cpu::{Capability, CpuProvider, HostCpuSummary, ProviderConfig, QueryError};

// ── Helpers ────────────────────────────────────────────────────

/// Native adapter, or `None` on an OS this crate has no adapter for.
fn host() -> Option<Box<dyn CpuProvider>> {
    match sys_cpu::native(&ProviderConfig::default()) {
        Ok(p) => Some(p),
        Err(e) => {
            assert!(e.is_unsupported(), "unexpected error: {e}");
            None
        }
    }
}

// ── Counts ─────────────────────────────────────────────────────

#[test]
fn counts_are_consistent() {
    let Some(cpu) = host() else { return };
    let total = cpu.num_cpu().unwrap();
    let active = cpu.num_active_cpu().unwrap();
    assert!(total >= 1);
    assert!(active >= 1);
    assert!(active <= total, "{active} online of {total}");
}

// ── Frequency ──────────────────────────────────────────────────

#[test]
fn frequency_is_positive_or_error() {
    let Some(cpu) = host() else { return };
    match cpu.frequency(sys_cpu::DEFAULT_CPU) {
        Ok(mhz) => assert!(mhz > 0),
        Err(e) => assert!(!e.is_unsupported(), "frequency must be implemented: {e}"),
    }
}

#[test]
fn out_of_range_index_is_rejected() {
    let Some(cpu) = host() else { return };
    let total = cpu.num_cpu().unwrap();
    assert!(matches!(
        cpu.frequency(total),
        Err(QueryError::InvalidCpu { .. })
    ));
    assert!(matches!(
        cpu.frequency(u32::MAX),
        Err(QueryError::InvalidCpu { .. })
    ));
    assert!(cpu.processor(total).is_err());
}

// ── Identity strings ───────────────────────────────────────────

#[test]
fn identity_strings_are_stable() {
    let Some(cpu) = host() else { return };
    let first = (cpu.model().ok(), cpu.architecture().ok(), cpu.machine().ok());
    let second = (cpu.model().ok(), cpu.architecture().ok(), cpu.machine().ok());
    assert_eq!(first, second);
    let machine = cpu.machine().unwrap();
    assert!(!machine.is_empty());
}

// ── Load ───────────────────────────────────────────────────────

#[test]
fn load_average_is_non_negative() {
    let Some(cpu) = host() else { return };
    for _ in 0..2 {
        let load = cpu.load_average().unwrap();
        assert!(load.as_array().iter().all(|v| *v >= 0.0 && v.is_finite()));
    }
}

#[test]
fn per_cpu_load_follows_capability() {
    let Some(cpu) = host() else { return };
    let result = cpu.per_processor_load_average();
    if cpu.supports(Capability::PerCpuLoad) {
        let active = cpu.num_active_cpu().unwrap();
        let loads: Vec<_> = result.unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(loads.len() as u32, active);
    } else {
        assert!(result.unwrap_err().is_unsupported());
        assert!(cpu.processor_load_average(0).unwrap_err().is_unsupported());
    }
}

// ── State and processors ───────────────────────────────────────

#[test]
fn state_follows_capability() {
    let Some(cpu) = host() else { return };
    let state = cpu.state(0);
    if cpu.supports(Capability::ProcessorState) {
        assert!(state.is_ok());
    } else {
        assert!(state.unwrap_err().is_unsupported());
    }
}

#[test]
fn processors_cover_every_index() {
    let Some(cpu) = host() else { return };
    let total = cpu.num_cpu().unwrap();
    // Frequency may be unavailable on virtual hosts; skip rather than fail.
    let Ok(all) = cpu.processors() else { return };
    assert_eq!(all.len() as u32, total);
    for (i, p) in all.iter().enumerate() {
        assert_eq!(p.index as usize, i);
        if let Some(mhz) = p.frequency_mhz {
            assert!(mhz > 0);
        }
    }
}

#[test]
fn summary_matches_individual_queries() {
    let Some(cpu) = host() else { return };
    let s = HostCpuSummary::capture(cpu.as_ref()).unwrap();
    assert_eq!(s.total, cpu.num_cpu().unwrap());
    assert_eq!(s.platform, cpu.platform());
    assert!(s.summary().starts_with("CPU: "));
}
