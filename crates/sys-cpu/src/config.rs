// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Provider configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! proc_root = "/proc"
//! sys_root = "/sys"
//! kstat_fallback = true
//! ```
//!
//! Every key is optional.

use crate::QueryError;
use std::path::{Path, PathBuf};

/// Configuration for the native provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Mount point of procfs (Linux adapter only).
    pub proc_root: PathBuf,
    /// Mount point of sysfs (Linux adapter only).
    pub sys_root: PathBuf,
    /// Whether the Solaris adapter may read kernel statistics when
    /// `getloadavg` fails.
    pub kstat_fallback: bool,
}

impl ProviderConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, QueryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, QueryError> {
        toml::from_str(toml_str).map_err(|e| QueryError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, QueryError> {
        toml::to_string_pretty(self)
            .map_err(|e| QueryError::Config(format!("TOML serialise error: {e}")))
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            kstat_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = ProviderConfig::default();
        assert_eq!(c.proc_root, PathBuf::from("/proc"));
        assert_eq!(c.sys_root, PathBuf::from("/sys"));
        assert!(c.kstat_fallback);
    }

    #[test]
    fn test_from_toml_partial() {
        let c = ProviderConfig::from_toml("proc_root = \"/host/proc\"\n").unwrap();
        assert_eq!(c.proc_root, PathBuf::from("/host/proc"));
        assert_eq!(c.sys_root, PathBuf::from("/sys"));
        assert!(c.kstat_fallback);
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
proc_root = "/tmp/p"
sys_root = "/tmp/s"
kstat_fallback = false
"#;
        let c = ProviderConfig::from_toml(toml).unwrap();
        assert_eq!(c.sys_root, PathBuf::from("/tmp/s"));
        assert!(!c.kstat_fallback);
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = ProviderConfig {
            kstat_fallback: false,
            ..Default::default()
        };
        let back = ProviderConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_bad_toml() {
        let result = ProviderConfig::from_toml("kstat_fallback = \"maybe\"");
        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ProviderConfig::from_file(Path::new("/nonexistent/sys-cpu.toml"));
        assert!(matches!(result, Err(QueryError::Config(_))));
    }
}
