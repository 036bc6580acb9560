// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Value snapshots returned by the provider.
//!
//! All of these are computed fresh on each query and never mutated
//! afterwards.

use crate::QueryError;
use std::fmt;

/// 1, 5 and 15 minute system load average.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverage {
    pub fn new(one: f64, five: f64, fifteen: f64) -> Self {
        Self { one, five, fifteen }
    }

    /// Converts kernel fixed-point averages to floating point.
    ///
    /// `scale` is the divisor the kernel reports alongside the raw values
    /// (`fscale` in `struct loadavg`, `FSCALE` for kstat `avenrun_*`).
    pub fn from_fixed_point(raw: [u64; 3], scale: u64, source: &str) -> Result<Self, QueryError> {
        if scale == 0 {
            return Err(QueryError::Parse {
                path: source.to_string(),
                detail: "fixed-point scale factor is zero".to_string(),
            });
        }
        let scale = scale as f64;
        Ok(Self {
            one: raw[0] as f64 / scale,
            five: raw[1] as f64 / scale,
            fifteen: raw[2] as f64 / scale,
        })
    }

    /// Builds a load average from a `[1m, 5m, 15m]` array, rejecting
    /// negative or non-finite values.
    pub fn from_array(values: [f64; 3], source: &str) -> Result<Self, QueryError> {
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(QueryError::Parse {
                path: source.to_string(),
                detail: format!("load average {bad} is not a non-negative number"),
            });
        }
        Ok(Self::new(values[0], values[1], values[2]))
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.one, self.five, self.fifteen]
    }

    /// Returns `true` if all three averages are below 1.0.
    pub fn is_idle(&self) -> bool {
        self.as_array().iter().all(|v| *v < 1.0)
    }
}

impl fmt::Display for LoadAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {:.2} {:.2}", self.one, self.five, self.fifteen)
    }
}

/// Online state of one logical processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorState {
    Online,
    Offline,
    #[serde(rename = "poweroff")]
    PoweredOff,
    Unknown,
}

impl ProcessorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::PoweredOff => "poweroff",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of one logical processor.
///
/// Fields the platform cannot provide for this processor are `None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessorInfo {
    /// Zero-based logical processor index.
    pub index: u32,
    pub state: Option<ProcessorState>,
    /// Clock speed in MHz.
    pub frequency_mhz: Option<u32>,
    /// Architecture or model string of this processor.
    pub processor_type: String,
}

/// One item of the per-processor load sequence.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ProcessorLoad {
    pub index: u32,
    pub load: LoadAverage,
}
