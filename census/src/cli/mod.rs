//! CLI module for llm-census
//!
//! Provides the command-line interface for running inventory scans.

pub mod rekey;
pub mod scan;

use clap::{Parser, Subcommand};

/// LLM census - liveness prober and inventory keeper for Ollama-style endpoints
#[derive(Parser, Debug)]
#[command(name = "llm-census")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    LLM_CENSUS_CONFIG            JSON config file
    LLM_CENSUS_INPUT             Candidate feed (default: input/raw_input.json)
    LLM_CENSUS_OUTPUT            Inventory file (default: data/live_servers.json)
    LLM_CENSUS_CONCURRENCY       Probes in flight (default: 50)
    LLM_CENSUS_TIMEOUT           Per-request timeout in seconds (default: 5)
    LLM_CENSUS_RETRIES           Liveness attempts (default: 2)
    LLM_CENSUS_INTERVAL          Repeat the scan every N seconds
    LLM_CENSUS_LOG_DIR           Also write daily log files here
    LLM_CENSUS_LOG_LEVEL         Log level (default: info)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every candidate in the feed and update the inventory
    Scan(scan::ScanArgs),
    /// Rewrite an inventory file in the keyed format
    Rekey(rekey::RekeyArgs),
}
