// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # syscpu
//!
//! Command-line interface for the sys-cpu processor queries.
//!
//! ## Usage
//! ```bash
//! # Overview screen
//! syscpu status
//!
//! # Single values
//! syscpu num-cpu
//! syscpu freq --cpu 2
//! syscpu --json load --per-cpu
//!
//! # Point the procfs adapter at a captured tree
//! syscpu --config ./syscpu.toml processors
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "syscpu",
    about = "Query processor counts, identity, clock speed and load",
    version,
    author
)]
struct Cli {
    /// Path to a TOML provider configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display a summary of the host's processors.
    Status,

    /// Number of logical CPUs.
    NumCpu,

    /// Number of online CPUs.
    NumActive,

    /// Processor model string.
    Model,

    /// Processor architecture string.
    Arch,

    /// Hardware class string.
    Machine,

    /// Clock speed in MHz.
    Freq {
        /// Processor index.
        #[arg(long, default_value_t = sys_cpu::DEFAULT_CPU)]
        cpu: u32,
    },

    /// Online state of a processor.
    State {
        /// Processor index.
        #[arg(long, default_value_t = sys_cpu::DEFAULT_CPU)]
        cpu: u32,
    },

    /// 1, 5 and 15 minute load average.
    Load {
        /// One line per online processor.
        #[arg(long, conflicts_with = "cpu")]
        per_cpu: bool,

        /// Load of a single processor.
        #[arg(long)]
        cpu: Option<u32>,
    },

    /// Attributes of every processor.
    Processors,

    /// Optional operations this platform supports.
    Caps,

    /// Floating point unit type.
    Fpu,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;
    let cpu = commands::open_provider(&config)?;
    let cpu = cpu.as_ref();
    let json = cli.json;

    match cli.command {
        Commands::Status => commands::status::execute(cpu, json),
        Commands::NumCpu => commands::query::num_cpu(cpu, json),
        Commands::NumActive => commands::query::num_active(cpu, json),
        Commands::Model => commands::query::model(cpu, json),
        Commands::Arch => commands::query::architecture(cpu, json),
        Commands::Machine => commands::query::machine(cpu, json),
        Commands::Freq { cpu: index } => commands::query::frequency(cpu, index, json),
        Commands::State { cpu: index } => commands::query::state(cpu, index, json),
        Commands::Load { per_cpu, cpu: index } => {
            commands::query::load(cpu, per_cpu, index, json)
        }
        Commands::Processors => commands::query::processors(cpu, json),
        Commands::Caps => commands::query::capabilities(cpu, json),
        Commands::Fpu => commands::query::fpu(cpu, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_freq_default_cpu() {
        let cli = Cli::try_parse_from(["syscpu", "freq"]).unwrap();
        assert!(matches!(cli.command, Commands::Freq { cpu: 0 }));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["syscpu", "load", "--per-cpu", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Load { per_cpu: true, cpu: None }));
    }

    #[test]
    fn test_per_cpu_conflicts_with_cpu() {
        assert!(Cli::try_parse_from(["syscpu", "load", "--per-cpu", "--cpu", "1"]).is_err());
    }
}
