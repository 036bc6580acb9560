// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Linux adapter over procfs and sysfs.
//!
//! Reads CPU state from:
//! - `<sys>/devices/system/cpu/cpu*/` for processor count, per-processor
//!   online state and cpufreq clock speed.
//! - `<sys>/devices/system/cpu/online` and `present` for range lists.
//! - `<proc>/cpuinfo` for the model name and a `cpu MHz` fallback.
//! - `<proc>/loadavg` for the load average.
//!
//! Both roots come from [`ProviderConfig`](crate::ProviderConfig) so the
//! adapter can read a container host's mounts or a test fixture.

use crate::{Capabilities, Capability, CpuProvider, LoadAverage, ProcessorState, QueryError};
use std::path::{Path, PathBuf};

/// Processor adapter for Linux.
#[derive(Debug, Clone)]
pub struct ProcfsProvider {
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl ProcfsProvider {
    pub fn new(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    fn cpu_base(&self) -> PathBuf {
        self.sys_root.join("devices/system/cpu")
    }

    fn cpu_dir(&self, index: u32) -> PathBuf {
        self.cpu_base().join(format!("cpu{index}"))
    }

    fn cpuinfo(&self) -> Result<String, QueryError> {
        read_file(&self.proc_root.join("cpuinfo"))
    }

    /// Fails with `InvalidCpu` unless `cpu<index>` exists.
    fn check_index(&self, index: u32) -> Result<(), QueryError> {
        if self.cpu_dir(index).is_dir() {
            Ok(())
        } else {
            let total = self.num_cpu()?;
            Err(QueryError::invalid_cpu(
                index,
                format!("host has {total} processors"),
            ))
        }
    }

    /// Reads the first readable cpufreq value (kHz) and converts it to MHz.
    fn cpufreq_mhz(&self, index: u32) -> Result<Option<u32>, QueryError> {
        let dir = self.cpu_dir(index).join("cpufreq");
        for name in ["scaling_cur_freq", "cpuinfo_cur_freq", "cpuinfo_max_freq"] {
            let path = dir.join(name);
            let Ok(content) = read_file(&path) else {
                continue;
            };
            let Ok(khz) = content.parse::<u64>() else {
                continue;
            };
            tracing::debug!("{}: {khz} kHz", path.display());
            let mhz = u32::try_from(khz / 1000).map_err(|_| QueryError::Parse {
                path: path.display().to_string(),
                detail: format!("{khz} kHz out of range"),
            })?;
            return Ok(Some(mhz));
        }
        Ok(None)
    }

    /// Clock speed from the `cpu MHz` line of the block for `index`.
    fn cpuinfo_mhz(&self, index: u32) -> Result<u32, QueryError> {
        let path = self.proc_root.join("cpuinfo");
        let cpuinfo = read_file(&path)?;
        let value = cpuinfo_block(&cpuinfo, index)
            .and_then(|block| cpuinfo_value(block, "cpu MHz"))
            .ok_or_else(|| QueryError::not_found(format!("clock speed of cpu{index}")))?;
        let mhz: f64 = value.parse().map_err(|_| QueryError::Parse {
            path: path.display().to_string(),
            detail: format!("expected MHz value, got '{value}'"),
        })?;
        if !mhz.is_finite() || mhz < 0.0 || mhz > f64::from(u32::MAX) {
            return Err(QueryError::Parse {
                path: path.display().to_string(),
                detail: format!("{value} MHz out of range"),
            });
        }
        Ok(mhz.round() as u32)
    }
}

impl CpuProvider for ProcfsProvider {
    fn platform(&self) -> &'static str {
        "linux"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with(Capability::ProcessorState)
            .with(Capability::ActiveCpuCount)
    }

    /// Counts `cpuN` directories, falling back to the `present` range list.
    fn num_cpu(&self) -> Result<u32, QueryError> {
        let base = self.cpu_base();
        if let Ok(entries) = std::fs::read_dir(&base) {
            let count = entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    let name = e.file_name();
                    let name = name.to_string_lossy();
                    name.strip_prefix("cpu")
                        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                })
                .count();
            if count > 0 {
                return Ok(count as u32);
            }
        }

        tracing::warn!("no cpu directories under {}, using present list", base.display());
        read_range_count(&base.join("present"))
    }

    fn num_active_cpu(&self) -> Result<u32, QueryError> {
        read_range_count(&self.cpu_base().join("online"))
    }

    fn model(&self) -> Result<String, QueryError> {
        // `Processor` is the 32-bit ARM header, `cpu` the PowerPC one.
        let cpuinfo = self.cpuinfo()?;
        ["model name", "Processor", "cpu model", "uarch", "cpu"]
            .iter()
            .find_map(|key| cpuinfo_value(&cpuinfo, key))
            .ok_or_else(|| QueryError::not_found("model name in cpuinfo"))
    }

    fn architecture(&self) -> Result<String, QueryError> {
        super::uname_machine()
    }

    /// Identical to [`CpuProvider::architecture`]; Linux reports a single
    /// machine name.
    fn machine(&self) -> Result<String, QueryError> {
        super::uname_machine()
    }

    /// Offline processors have no clock and are rejected as invalid.
    fn frequency(&self, index: u32) -> Result<u32, QueryError> {
        let state = self.state(index)?;
        if !state.is_online() {
            return Err(QueryError::invalid_cpu(index, format!("processor is {state}")));
        }

        let mhz = match self.cpufreq_mhz(index)? {
            Some(mhz) => mhz,
            None => {
                tracing::warn!("cpufreq unavailable for cpu{index}, reading cpuinfo");
                self.cpuinfo_mhz(index)?
            }
        };

        if mhz == 0 {
            return Err(QueryError::invalid_cpu(index, "clock speed reported as 0"));
        }
        Ok(mhz)
    }

    fn state(&self, index: u32) -> Result<ProcessorState, QueryError> {
        self.check_index(index)?;

        // The boot processor usually cannot be hotplugged and has no
        // `online` file.
        let path = self.cpu_dir(index).join("online");
        if !path.exists() {
            return Ok(ProcessorState::Online);
        }
        Ok(match read_file(&path)?.as_str() {
            "1" => ProcessorState::Online,
            "0" => ProcessorState::Offline,
            _ => ProcessorState::Unknown,
        })
    }

    fn load_average(&self) -> Result<LoadAverage, QueryError> {
        let path = self.proc_root.join("loadavg");
        let content = read_file(&path)?;
        parse_loadavg(&content, &path)
    }
}

/// Reads a procfs/sysfs file and returns its trimmed content.
fn read_file(path: &Path) -> Result<String, QueryError> {
    if !path.exists() {
        return Err(QueryError::not_found(path.display().to_string()));
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| QueryError::Read {
            path: path.display().to_string(),
            source: e,
        })
}

fn read_range_count(path: &Path) -> Result<u32, QueryError> {
    let content = read_file(path)?;
    parse_cpu_range(&content).ok_or_else(|| QueryError::Parse {
        path: path.display().to_string(),
        detail: format!("expected CPU range list, got '{content}'"),
    })
}

/// Parses a CPU range string like `"0-3"` → 4, `"0"` → 1, `"0,2-3"` → 3.
fn parse_cpu_range(s: &str) -> Option<u32> {
    let mut total = 0u32;
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s.trim().parse().ok()?;
            let end: u32 = end_s.trim().parse().ok()?;
            if end < start {
                return None;
            }
            total = total.checked_add((end - start).checked_add(1)?)?;
        } else {
            let _: u32 = part.parse().ok()?;
            total = total.checked_add(1)?;
        }
    }
    if total > 0 {
        Some(total)
    } else {
        None
    }
}

/// Format: `"0.35 0.28 0.22 1/234 5678"`.
fn parse_loadavg(content: &str, path: &Path) -> Result<LoadAverage, QueryError> {
    let fields: Vec<f64> = content
        .split_whitespace()
        .take(3)
        .map(|s| s.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| QueryError::Parse {
            path: path.display().to_string(),
            detail: format!("expected three load averages, got '{content}'"),
        })?;
    match fields[..] {
        [one, five, fifteen] => LoadAverage::from_array([one, five, fifteen], &path.display().to_string()),
        _ => Err(QueryError::Parse {
            path: path.display().to_string(),
            detail: format!("expected three load averages, got '{content}'"),
        }),
    }
}

/// Returns the value of the first `key : value` line in `text`.
///
/// Keys match exactly, so `Processor` (ARM header) and `processor` (index
/// line) stay distinct.
fn cpuinfo_value(text: &str, key: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        let v = v.trim();
        (k.trim() == key && !v.is_empty()).then(|| v.to_string())
    })
}

/// Finds the cpuinfo block whose `processor` line names `index`.
///
/// Offline processors are left out of cpuinfo, so blocks are matched by
/// their `processor` line rather than their position. A file with a single
/// block and no `processor` lines answers for every processor.
fn cpuinfo_block(cpuinfo: &str, index: u32) -> Option<&str> {
    let blocks: Vec<&str> = cpuinfo
        .split("\n\n")
        .filter(|b| !b.trim().is_empty())
        .collect();

    let numbered = blocks
        .iter()
        .find(|b| cpuinfo_value(b, "processor").and_then(|v| v.parse::<u32>().ok()) == Some(index))
        .copied();
    if let Some(block) = numbered {
        return Some(block);
    }

    match blocks[..] {
        [only] if cpuinfo_value(only, "processor").is_none() => Some(only),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO_X86: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
cpu MHz\t\t: 2394.454

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
cpu MHz\t\t: 1200.000

processor\t: 2
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
cpu MHz\t\t: 2400.000

processor\t: 3
model name\t: Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz
cpu MHz\t\t: 2400.000
";

    /// Builds a fake `/proc` + `/sys` tree under the temp directory.
    /// The caller is responsible for cleanup.
    fn fixture(name: &str, cpus: u32, online: &str) -> PathBuf {
        let root = std::env::temp_dir().join("sys_cpu_test").join(name);
        let _ = std::fs::remove_dir_all(&root);
        let base = root.join("sys/devices/system/cpu");
        for i in 0..cpus {
            std::fs::create_dir_all(base.join(format!("cpu{i}"))).unwrap();
        }
        std::fs::create_dir_all(base.join("cpufreq")).unwrap();
        std::fs::write(base.join("online"), format!("{online}\n")).unwrap();
        std::fs::write(base.join("present"), format!("0-{}\n", cpus - 1)).unwrap();
        std::fs::create_dir_all(root.join("proc")).unwrap();
        std::fs::write(root.join("proc/cpuinfo"), CPUINFO_X86).unwrap();
        std::fs::write(root.join("proc/loadavg"), "0.35 0.28 0.22 1/234 5678\n").unwrap();
        root
    }

    fn provider(root: &Path) -> ProcfsProvider {
        ProcfsProvider::new(root.join("proc"), root.join("sys"))
    }

    #[test]
    fn test_parse_cpu_range() {
        assert_eq!(parse_cpu_range("0-3"), Some(4));
        assert_eq!(parse_cpu_range("0"), Some(1));
        assert_eq!(parse_cpu_range("0,2-3"), Some(3));
        assert_eq!(parse_cpu_range("0-1,3-5"), Some(5));
        assert_eq!(parse_cpu_range(""), None);
        assert_eq!(parse_cpu_range("abc"), None);
        assert_eq!(parse_cpu_range("3-1"), None);
        assert_eq!(parse_cpu_range("0-4294967295"), None);
        assert_eq!(parse_cpu_range("1-4294967295,0"), None);
    }

    #[test]
    fn test_parse_loadavg() {
        let la = parse_loadavg("0.35 0.28 0.22 1/234 5678", Path::new("loadavg")).unwrap();
        assert_eq!(la.as_array(), [0.35, 0.28, 0.22]);
        assert!(parse_loadavg("0.35 0.28", Path::new("loadavg")).is_err());
        assert!(parse_loadavg("a b c", Path::new("loadavg")).is_err());
    }

    #[test]
    fn test_cpuinfo_value() {
        assert_eq!(
            cpuinfo_value(CPUINFO_X86, "model name").as_deref(),
            Some("Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz"),
        );
        assert_eq!(cpuinfo_value(CPUINFO_X86, "Processor"), None);
        assert_eq!(cpuinfo_value(CPUINFO_X86, "bogomips"), None);
    }

    #[test]
    fn test_cpuinfo_block_matches_processor_line() {
        let sparse = "processor\t: 0\ncpu MHz\t\t: 2000.000\n\nprocessor\t: 2\ncpu MHz\t\t: 3000.000\n";
        let mhz = |i| cpuinfo_block(sparse, i).and_then(|b| cpuinfo_value(b, "cpu MHz"));
        assert_eq!(mhz(0).as_deref(), Some("2000.000"));
        assert_eq!(mhz(2).as_deref(), Some("3000.000"));
        assert_eq!(mhz(1), None);
        assert_eq!(mhz(3), None);

        let single = "cpu MHz\t\t: 1500.000\nHardware\t: BCM2835\n";
        assert!(cpuinfo_block(single, 3).is_some());
    }

    #[test]
    fn test_counts() {
        let root = fixture("counts", 4, "0-1,3");
        let p = provider(&root);
        assert_eq!(p.num_cpu().unwrap(), 4);
        assert_eq!(p.num_active_cpu().unwrap(), 3);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_model_and_load() {
        let root = fixture("model", 2, "0-1");
        let p = provider(&root);
        assert_eq!(p.model().unwrap(), "Intel(R) Xeon(R) CPU E5-2680 v4 @ 2.40GHz");
        let la = p.load_average().unwrap();
        assert!((la.one - 0.35).abs() < 1e-9);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_model_powerpc_cpu_line() {
        let root = fixture("model_ppc", 1, "0");
        std::fs::write(
            root.join("proc/cpuinfo"),
            "processor\t: 0\ncpu\t\t: POWER9 (architected), altivec supported\nclock\t\t: 2166.000000MHz\n",
        )
        .unwrap();
        let p = provider(&root);
        assert_eq!(p.model().unwrap(), "POWER9 (architected), altivec supported");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_frequency_prefers_cpufreq() {
        let root = fixture("freq_cpufreq", 2, "0-1");
        let dir = root.join("sys/devices/system/cpu/cpu0/cpufreq");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("scaling_cur_freq"), "1800000\n").unwrap();

        let p = provider(&root);
        assert_eq!(p.frequency(0).unwrap(), 1800);
        // cpu1 has no cpufreq directory and falls back to cpuinfo.
        assert_eq!(p.frequency(1).unwrap(), 1200);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_frequency_out_of_range() {
        let root = fixture("freq_range", 4, "0-3");
        let p = provider(&root);
        for i in 0..4 {
            assert!(p.frequency(i).unwrap() > 0);
        }
        assert!(matches!(p.frequency(4), Err(QueryError::InvalidCpu { index: 4, .. })));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_frequency_offline_middle_cpu() {
        let root = fixture("freq_offline", 3, "0,2");
        let base = root.join("sys/devices/system/cpu");
        std::fs::write(base.join("cpu1/online"), "0\n").unwrap();
        std::fs::write(
            root.join("proc/cpuinfo"),
            "processor\t: 0\ncpu MHz\t\t: 2000.000\n\nprocessor\t: 2\ncpu MHz\t\t: 3000.000\n",
        )
        .unwrap();

        let p = provider(&root);
        assert_eq!(p.state(1).unwrap(), ProcessorState::Offline);
        assert!(matches!(p.frequency(1), Err(QueryError::InvalidCpu { index: 1, .. })));
        assert_eq!(p.frequency(0).unwrap(), 2000);
        assert_eq!(p.frequency(2).unwrap(), 3000);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_frequency_out_of_range_khz() {
        let root = fixture("freq_huge", 1, "0");
        let dir = root.join("sys/devices/system/cpu/cpu0/cpufreq");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("scaling_cur_freq"), "18446744073709551615\n").unwrap();

        let p = provider(&root);
        assert!(matches!(p.frequency(0), Err(QueryError::Parse { .. })));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_frequency_zero_is_invalid() {
        let root = fixture("freq_zero", 1, "0");
        let dir = root.join("sys/devices/system/cpu/cpu0/cpufreq");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("scaling_cur_freq"), "0\n").unwrap();

        let p = provider(&root);
        assert!(matches!(p.frequency(0), Err(QueryError::InvalidCpu { .. })));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_state() {
        let root = fixture("state", 3, "0,2");
        let base = root.join("sys/devices/system/cpu");
        std::fs::write(base.join("cpu1/online"), "0\n").unwrap();
        std::fs::write(base.join("cpu2/online"), "1\n").unwrap();

        let p = provider(&root);
        assert_eq!(p.state(0).unwrap(), ProcessorState::Online);
        assert_eq!(p.state(1).unwrap(), ProcessorState::Offline);
        assert_eq!(p.state(2).unwrap(), ProcessorState::Online);
        assert!(matches!(p.state(3), Err(QueryError::InvalidCpu { .. })));

        let info = p.processor(1).unwrap();
        assert_eq!(info.frequency_mhz, None);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_no_per_cpu_load() {
        let p = ProcfsProvider::new("/proc", "/sys");
        assert!(!p.supports(Capability::PerCpuLoad));
        assert!(p.per_processor_load_average().unwrap_err().is_unsupported());
    }

    #[test]
    fn test_missing_loadavg() {
        let p = ProcfsProvider::new("/nonexistent/proc", "/nonexistent/sys");
        assert!(matches!(p.load_average(), Err(QueryError::NotFound { .. })));
    }
}
