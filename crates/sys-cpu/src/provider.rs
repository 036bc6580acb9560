// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`CpuProvider`] trait and its capability set.

use crate::{LoadAverage, ProcessorInfo, ProcessorLoad, ProcessorState, QueryError};
use std::fmt;

/// Processor index used when the caller does not name one.
pub const DEFAULT_CPU: u32 = 0;

/// An optional operation that only some platforms provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Capability {
    /// [`CpuProvider::state`] reports per-processor online state.
    ProcessorState,
    /// [`CpuProvider::per_processor_load_average`] and
    /// [`CpuProvider::processor_load_average`] are available.
    PerCpuLoad,
    /// [`CpuProvider::num_active_cpu`] distinguishes online processors
    /// instead of echoing [`CpuProvider::num_cpu`].
    ActiveCpuCount,
    /// [`CpuProvider::fpu_type`] is available.
    FpuType,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ProcessorState,
        Capability::PerCpuLoad,
        Capability::ActiveCpuCount,
        Capability::FpuType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessorState => "processor-state",
            Self::PerCpuLoad => "per-cpu-load",
            Self::ActiveCpuCount => "active-cpu-count",
            Self::FpuType => "fpu-type",
        }
    }

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of optional operations an adapter supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);

    pub fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|c| c.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

impl serde::Serialize for Capabilities {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|c| c.as_str()))
    }
}

/// Hardware-inventory queries about the host's processors.
///
/// One implementation exists per operating system family; each issues the
/// native call for a query, converts the result, and returns. Nothing is
/// cached between calls.
///
/// Optional operations return [`QueryError::Unsupported`] unless the adapter
/// lists the matching [`Capability`]. Check [`CpuProvider::supports`] before
/// relying on them.
pub trait CpuProvider: Send + Sync {
    /// Short name of the platform family this adapter targets.
    fn platform(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn supports(&self, cap: Capability) -> bool {
        self.capabilities().contains(cap)
    }

    /// Number of logical CPUs. Every core counts individually.
    fn num_cpu(&self) -> Result<u32, QueryError>;

    /// Number of online CPUs. Equals [`CpuProvider::num_cpu`] on platforms
    /// without an online/offline distinction.
    fn num_active_cpu(&self) -> Result<u32, QueryError> {
        self.num_cpu()
    }

    /// Host-wide model string (best effort; some platforms only know the
    /// architecture name).
    fn model(&self) -> Result<String, QueryError>;

    fn architecture(&self) -> Result<String, QueryError>;

    /// Hardware class string.
    fn machine(&self) -> Result<String, QueryError>;

    /// Clock speed in MHz of processor `index`. Never returns 0.
    fn frequency(&self, index: u32) -> Result<u32, QueryError>;

    fn state(&self, _index: u32) -> Result<ProcessorState, QueryError> {
        Err(QueryError::Unsupported {
            operation: "state",
            platform: self.platform(),
        })
    }

    /// 1, 5 and 15 minute host load average.
    fn load_average(&self) -> Result<LoadAverage, QueryError>;

    /// Lazily yields one load average per online processor in ascending
    /// index order. Each call re-queries from the start.
    fn per_processor_load_average(&self) -> Result<ProcessorLoads<'_>, QueryError> {
        Err(QueryError::Unsupported {
            operation: "per_processor_load_average",
            platform: self.platform(),
        })
    }

    fn processor_load_average(&self, _index: u32) -> Result<LoadAverage, QueryError> {
        Err(QueryError::Unsupported {
            operation: "processor_load_average",
            platform: self.platform(),
        })
    }

    /// Floating point unit type string.
    fn fpu_type(&self) -> Result<String, QueryError> {
        Err(QueryError::Unsupported {
            operation: "fpu_type",
            platform: self.platform(),
        })
    }

    /// Collects the attributes of processor `index`.
    ///
    /// Processors reported as not online have no frequency.
    fn processor(&self, index: u32) -> Result<ProcessorInfo, QueryError> {
        let total = self.num_cpu()?;
        if index >= total {
            return Err(QueryError::invalid_cpu(
                index,
                format!("host has {total} processors"),
            ));
        }

        let state = if self.supports(Capability::ProcessorState) {
            Some(self.state(index)?)
        } else {
            None
        };

        let frequency_mhz = match state {
            Some(s) if !s.is_online() => None,
            _ => Some(self.frequency(index)?),
        };

        Ok(ProcessorInfo {
            index,
            state,
            frequency_mhz,
            processor_type: self.architecture()?,
        })
    }

    /// Collects [`ProcessorInfo`] for every processor.
    fn processors(&self) -> Result<Vec<ProcessorInfo>, QueryError> {
        (0..self.num_cpu()?).map(|i| self.processor(i)).collect()
    }
}

type FetchLoad<'a> = Box<dyn FnMut(u32) -> Result<Option<LoadAverage>, QueryError> + 'a>;

/// Lazy, finite sequence of per-processor load averages.
///
/// Each step issues one native query for the next processor index. Slots
/// the fetch reports as `None` (disabled or absent processors) are skipped.
/// The sequence ends after the last index or after the first error,
/// whichever comes first. Dropping it early is fine.
pub struct ProcessorLoads<'a> {
    next: u32,
    end: u32,
    fetch: FetchLoad<'a>,
}

impl<'a> ProcessorLoads<'a> {
    /// Creates a sequence over every processor index in `0..count`.
    pub fn new<F>(count: u32, mut fetch: F) -> Self
    where
        F: FnMut(u32) -> Result<LoadAverage, QueryError> + 'a,
    {
        Self::sparse(count, move |index| fetch(index).map(Some))
    }

    /// Creates a sequence over `0..count` that leaves out indices for which
    /// `fetch` returns `Ok(None)`.
    pub fn sparse<F>(count: u32, fetch: F) -> Self
    where
        F: FnMut(u32) -> Result<Option<LoadAverage>, QueryError> + 'a,
    {
        Self {
            next: 0,
            end: count,
            fetch: Box::new(fetch),
        }
    }

    /// Number of processor indices not yet examined.
    pub fn remaining(&self) -> u32 {
        self.end - self.next
    }
}

impl Iterator for ProcessorLoads<'_> {
    type Item = Result<ProcessorLoad, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let index = self.next;
            match (self.fetch)(index) {
                Ok(Some(load)) => {
                    self.next += 1;
                    return Some(Ok(ProcessorLoad { index, load }));
                }
                Ok(None) => self.next += 1,
                Err(e) => {
                    self.next = self.end;
                    return Some(Err(e));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining() as usize))
    }
}

impl std::iter::FusedIterator for ProcessorLoads<'_> {}

impl fmt::Debug for ProcessorLoads<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorLoads")
            .field("next", &self.next)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}
