// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # sys-cpu
//!
//! Processor inventory and load queries behind one interface, backed by
//! whatever the host kernel exposes: `sysctl` on the BSDs and macOS,
//! `processor_info`/`kstat` on Solaris, `pstat` on HP-UX and procfs on
//! Linux.
//!
//! # Queries
//! - **Counts**: configured and online logical CPUs.
//! - **Identity**: model, architecture and machine class strings.
//! - **Per processor**: clock speed and, where the platform tracks it,
//!   online state.
//! - **Load**: host load average and, on HP-UX, per-processor load.
//!
//! Every query goes to the kernel on each call; nothing is cached. Optional
//! operations are advertised through [`Capabilities`] and return
//! [`QueryError::Unsupported`] elsewhere.
//!
//! # Example
//! ```no_run
//! use sys_cpu::{Capability, CpuProvider};
//!
//! let cpu = sys_cpu::provider().expect("no processor adapter for this OS");
//! println!("{} x {}", cpu.num_cpu().unwrap(), cpu.model().unwrap());
//! if cpu.supports(Capability::ProcessorState) {
//!     println!("cpu0 is {}", cpu.state(0).unwrap());
//! }
//! ```

mod config;
mod error;
pub mod platform;
mod provider;
mod summary;
mod types;

pub use config::ProviderConfig;
pub use error::QueryError;
pub use platform::native;
pub use provider::{Capabilities, Capability, CpuProvider, ProcessorLoads, DEFAULT_CPU};
pub use summary::HostCpuSummary;
pub use types::{LoadAverage, ProcessorInfo, ProcessorLoad, ProcessorState};

/// Returns the native adapter with default settings.
///
/// This is a convenience wrapper around [`platform::native()`].
pub fn provider() -> Result<Box<dyn CpuProvider>, QueryError> {
    native(&ProviderConfig::default())
}
