// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error type for CPU queries.

/// Errors that can occur when querying processor information.
///
/// Every failing query produces exactly one of these; nothing is retried and
/// no failure state survives the call that raised it.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A native system call reported failure.
    #[error("error calling {call}: {source}")]
    Os {
        call: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a procfs or sysfs file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A value returned by the system could not be interpreted.
    #[error("failed to parse value from {path}: {detail}")]
    Parse { path: String, detail: String },

    /// The processor index does not name an existing (or online) processor.
    #[error("invalid CPU number {index}: {detail}")]
    InvalidCpu { index: u32, detail: String },

    /// A named record or field is absent on this system.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The operation is not provided on this platform.
    #[error("{operation} is not supported on {platform}")]
    Unsupported {
        operation: &'static str,
        platform: &'static str,
    },

    /// Provider configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl QueryError {
    /// Captures `errno` for a native call that just failed.
    pub fn last_os_error(call: impl Into<String>) -> Self {
        Self::Os {
            call: call.into(),
            source: std::io::Error::last_os_error(),
        }
    }

    pub(crate) fn invalid_cpu(index: u32, detail: impl Into<String>) -> Self {
        Self::InvalidCpu {
            index,
            detail: detail.into(),
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Returns `true` if the error reports a missing capability rather than
    /// a failed query.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
