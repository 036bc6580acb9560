// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI plumbing.

pub mod query;
pub mod status;

use anyhow::Context;
use std::path::Path;
use sys_cpu::{CpuProvider, ProviderConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber. Logs go to stderr so query output on
/// stdout stays machine-readable. `RUST_LOG` overrides `-v`.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Loads the provider configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    match path {
        Some(path) => {
            tracing::info!("loading config from {}", path.display());
            ProviderConfig::from_file(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))
        }
        None => Ok(ProviderConfig::default()),
    }
}

pub fn open_provider(config: &ProviderConfig) -> anyhow::Result<Box<dyn CpuProvider>> {
    let provider = sys_cpu::native(config).context("no processor adapter for this system")?;
    tracing::info!("using {} adapter", provider.platform());
    Ok(provider)
}

/// Prints `value` as JSON or with its `Display` form.
pub(crate) fn emit<T>(value: &T, json: bool) -> anyhow::Result<()>
where
    T: serde::Serialize + std::fmt::Display + ?Sized,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{value}");
    }
    Ok(())
}
