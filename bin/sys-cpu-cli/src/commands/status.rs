// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `syscpu status` command: display a summary of the host's processors.
//!
//! Optional sections (per-processor state, per-processor load, FPU) are
//! shown only when the adapter advertises the capability.

use sys_cpu::{Capability, CpuProvider, HostCpuSummary};

pub fn execute(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    let summary = HostCpuSummary::capture(cpu)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              syscpu · Processor Status               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Identity ───────────────────────────────────────────────
    println!("  Identity");
    println!("   Platform:     {}", summary.platform);
    println!("   Model:        {}", summary.model);
    println!("   Architecture: {}", summary.architecture);
    println!("   Machine:      {}", summary.machine);
    if cpu.supports(Capability::FpuType) {
        match cpu.fpu_type() {
            Ok(fpu) => println!("   FPU:          {fpu}"),
            Err(e) => tracing::warn!("fpu type unavailable: {e}"),
        }
    }
    println!();

    // ── Processors ─────────────────────────────────────────────
    println!("  Processors");
    println!("   Configured:   {}", summary.total);
    println!("   Online:       {}", summary.active);
    for i in 0..summary.total {
        println!("   cpu{:<3}        {}", i, processor_line(cpu, i));
    }
    println!();

    // ── Load ───────────────────────────────────────────────────
    println!("  Load");
    let bar = load_bar(summary.load_per_cpu());
    println!("   1/5/15 min:   {}  {bar}", summary.load);
    println!(
        "   Per online:   {:.2}",
        summary.load_per_cpu(),
    );
    if cpu.supports(Capability::PerCpuLoad) {
        for item in cpu.per_processor_load_average()? {
            let item = item?;
            println!("   cpu{:<3}        {}", item.index, item.load);
        }
    }
    println!();
    println!("  Capabilities:  {}", cpu.capabilities());
    println!();
    println!("{}", summary.summary());

    Ok(())
}

/// State and clock of one processor, tolerating per-processor failures so a
/// single bad entry does not hide the rest of the screen.
fn processor_line(cpu: &dyn CpuProvider, index: u32) -> String {
    match cpu.processor(index) {
        Ok(p) => {
            let state = p.state.map_or("", |s| s.as_str());
            match p.frequency_mhz {
                Some(mhz) => format!("{state:<10} {mhz} MHz").trim().to_string(),
                None => state.to_string(),
            }
        }
        Err(e) => {
            tracing::debug!("cpu {index}: {e}");
            format!("unavailable ({e})")
        }
    }
}

/// Creates a visual load bar (0.0-1.0 load per online processor).
fn load_bar(ratio: f64) -> String {
    let filled = (ratio * 20.0).round().max(0.0) as usize;
    let filled = filled.min(20);
    let empty = 20 - filled;
    let symbol = if ratio >= 0.9 {
        "#"
    } else if ratio >= 0.7 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(empty))
}
