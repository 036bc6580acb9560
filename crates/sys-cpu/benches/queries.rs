// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for native processor queries.
//!
//! Every query is a fresh kernel round trip, so these measure the cost of
//! the underlying system call plus conversion.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use sys_cpu::{CpuProvider, HostCpuSummary};

fn bench_counts(c: &mut Criterion) {
    let Ok(cpu) = sys_cpu::provider() else { return };
    c.bench_function("num_cpu", |b| b.iter(|| black_box(cpu.num_cpu())));
    c.bench_function("num_active_cpu", |b| {
        b.iter(|| black_box(cpu.num_active_cpu()))
    });
}

fn bench_load(c: &mut Criterion) {
    let Ok(cpu) = sys_cpu::provider() else { return };
    c.bench_function("load_average", |b| b.iter(|| black_box(cpu.load_average())));
}

fn bench_frequency(c: &mut Criterion) {
    let Ok(cpu) = sys_cpu::provider() else { return };
    c.bench_function("frequency_cpu0", |b| {
        b.iter(|| black_box(cpu.frequency(black_box(0))))
    });
}

fn bench_summary(c: &mut Criterion) {
    let Ok(cpu) = sys_cpu::provider() else { return };
    c.bench_function("summary_capture", |b| {
        b.iter(|| black_box(HostCpuSummary::capture(cpu.as_ref())))
    });
}

criterion_group!(benches, bench_counts, bench_load, bench_frequency, bench_summary);
criterion_main!(benches);
