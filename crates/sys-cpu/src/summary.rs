// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aggregated host-wide processor summary.
//!
//! A [`HostCpuSummary`] gathers the host-level queries of a [`CpuProvider`]
//! into one struct for display or serialization.

use crate::{Capability, CpuProvider, LoadAverage, QueryError};

/// A point-in-time reading of the host-level processor attributes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HostCpuSummary {
    /// Platform family of the adapter that produced this summary.
    pub platform: &'static str,
    /// Configured logical CPUs.
    pub total: u32,
    /// Online logical CPUs.
    pub active: u32,
    pub model: String,
    pub architecture: String,
    pub machine: String,
    /// Host load average.
    pub load: LoadAverage,
    /// Optional operations the adapter implements.
    pub capabilities: Vec<&'static str>,
}

impl HostCpuSummary {
    /// Captures a new summary by issuing each host-level query once.
    ///
    /// Counts and load are required. String queries that come back
    /// `NotFound` are recorded as `"unknown"` rather than failing the
    /// whole capture.
    pub fn capture(provider: &dyn CpuProvider) -> Result<Self, QueryError> {
        let total = provider.num_cpu()?;
        let active = if provider.supports(Capability::ActiveCpuCount) {
            provider.num_active_cpu()?
        } else {
            total
        };

        Ok(Self {
            platform: provider.platform(),
            total,
            active,
            model: or_unknown(provider.model())?,
            architecture: or_unknown(provider.architecture())?,
            machine: or_unknown(provider.machine())?,
            load: provider.load_average()?,
            capabilities: provider.capabilities().iter().map(|c| c.as_str()).collect(),
        })
    }

    /// Returns a summary string suitable for logging or CLI display.
    ///
    /// # Example output
    /// ```text
    /// CPU: 4/4 online, Intel(R) Core(TM) i5 (x86_64, x86_64), load 0.52 0.41 0.30
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "CPU: {}/{} online, {} ({}, {}), load {}",
            self.active, self.total, self.model, self.architecture, self.machine, self.load,
        )
    }

    /// Load average over the last minute divided by online processors.
    pub fn load_per_cpu(&self) -> f64 {
        if self.active == 0 {
            return 0.0;
        }
        self.load.one / f64::from(self.active)
    }
}

fn or_unknown(value: Result<String, QueryError>) -> Result<String, QueryError> {
    match value {
        Ok(s) => Ok(s),
        Err(QueryError::NotFound { what }) => {
            tracing::debug!("{what} not found, reporting as unknown");
            Ok("unknown".to_string())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capabilities;

    struct TwoWay {
        model_missing: bool,
    }

    impl CpuProvider for TwoWay {
        fn platform(&self) -> &'static str {
            "test"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::NONE.with(Capability::ActiveCpuCount)
        }
        fn num_cpu(&self) -> Result<u32, QueryError> {
            Ok(2)
        }
        fn num_active_cpu(&self) -> Result<u32, QueryError> {
            Ok(1)
        }
        fn model(&self) -> Result<String, QueryError> {
            if self.model_missing {
                Err(QueryError::not_found("model name"))
            } else {
                Ok("UltraSPARC-IIi".into())
            }
        }
        fn architecture(&self) -> Result<String, QueryError> {
            Ok("sparcv9".into())
        }
        fn machine(&self) -> Result<String, QueryError> {
            Ok("sun4u".into())
        }
        fn frequency(&self, _index: u32) -> Result<u32, QueryError> {
            Ok(440)
        }
        fn load_average(&self) -> Result<LoadAverage, QueryError> {
            Ok(LoadAverage::new(0.5, 0.25, 0.125))
        }
    }

    #[test]
    fn test_capture() {
        let s = HostCpuSummary::capture(&TwoWay { model_missing: false }).unwrap();
        assert_eq!(s.total, 2);
        assert_eq!(s.active, 1);
        assert_eq!(s.model, "UltraSPARC-IIi");
        assert_eq!(s.capabilities, vec!["active-cpu-count"]);
        assert!((s.load_per_cpu() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_model_is_unknown() {
        let s = HostCpuSummary::capture(&TwoWay { model_missing: true }).unwrap();
        assert_eq!(s.model, "unknown");
    }

    #[test]
    fn test_summary_format() {
        let s = HostCpuSummary::capture(&TwoWay { model_missing: false }).unwrap();
        let text = s.summary();
        assert!(text.contains("1/2 online"));
        assert!(text.contains("(sparcv9, sun4u)"));
        assert!(text.contains("load 0.50 0.25 0.12") || text.contains("load 0.50 0.25 0.13"));
    }

    #[test]
    fn test_serializes() {
        let s = HostCpuSummary::capture(&TwoWay { model_missing: false }).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["machine"], "sun4u");
        assert_eq!(json["load"]["one"], 0.5);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn test_capture_on_linux() {
        let p = crate::native(&crate::ProviderConfig::default()).unwrap();
        let s = HostCpuSummary::capture(p.as_ref()).unwrap();
        assert!(s.total >= 1);
        assert!(s.active <= s.total);
    }
}
