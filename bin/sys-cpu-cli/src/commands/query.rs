// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-value subcommands: one provider query, one line of output.

use super::emit;
use anyhow::Context;
use sys_cpu::{CpuProvider, ProcessorInfo, ProcessorLoad};

pub fn num_cpu(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.num_cpu()?, json)
}

pub fn num_active(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.num_active_cpu()?, json)
}

pub fn model(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.model()?, json)
}

pub fn architecture(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.architecture()?, json)
}

pub fn machine(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.machine()?, json)
}

pub fn frequency(cpu: &dyn CpuProvider, index: u32, json: bool) -> anyhow::Result<()> {
    let mhz = cpu
        .frequency(index)
        .with_context(|| format!("cannot read clock speed of cpu {index}"))?;
    if json {
        emit(&mhz, true)
    } else {
        println!("{mhz} MHz");
        Ok(())
    }
}

pub fn state(cpu: &dyn CpuProvider, index: u32, json: bool) -> anyhow::Result<()> {
    let state = cpu
        .state(index)
        .with_context(|| format!("cannot read state of cpu {index}"))?;
    emit(&state, json)
}

pub fn load(
    cpu: &dyn CpuProvider,
    per_cpu: bool,
    index: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(index) = index {
        let load = cpu
            .processor_load_average(index)
            .with_context(|| format!("cannot read load of cpu {index}"))?;
        return emit(&load, json);
    }

    if !per_cpu {
        return emit(&cpu.load_average()?, json);
    }

    let loads = cpu
        .per_processor_load_average()?
        .collect::<Result<Vec<ProcessorLoad>, _>>()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&loads)?);
    } else {
        for l in &loads {
            println!("cpu{:<3} {}", l.index, l.load);
        }
    }
    Ok(())
}

pub fn processors(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    let all = cpu.processors()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    println!("{:<5} {:<10} {:>10}  {}", "CPU", "State", "Clock", "Type");
    println!("{}", "-".repeat(50));
    for p in &all {
        println!("{}", processor_row(p));
    }
    Ok(())
}

fn processor_row(p: &ProcessorInfo) -> String {
    let state = p.state.map_or("-", |s| s.as_str());
    let clock = p
        .frequency_mhz
        .map_or_else(|| "-".to_string(), |mhz| format!("{mhz} MHz"));
    format!("{:<5} {:<10} {:>10}  {}", p.index, state, clock, p.processor_type)
}

pub fn capabilities(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.capabilities(), json)
}

pub fn fpu(cpu: &dyn CpuProvider, json: bool) -> anyhow::Result<()> {
    emit(&cpu.fpu_type()?, json)
}
