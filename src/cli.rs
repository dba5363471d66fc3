//! Command-line interface definition for Sqlgate
//!
//! This module defines the CLI structure using clap's derive API. All
//! substantive configuration comes from the environment; the CLI only
//! selects the command and offers bind-address overrides.

use clap::{Parser, Subcommand};

/// Sqlgate - access-control gateway for a SQL engine
///
/// Validates bearer tokens, relays the OAuth authorization flow, and gates
/// queries behind a read-only classifier and catalog/schema/table
/// allowlists.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Sqlgate
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the gateway server
    Serve {
        /// Override the bind host (SQLGATE_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port (SQLGATE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate the environment configuration and exit
    Check,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
