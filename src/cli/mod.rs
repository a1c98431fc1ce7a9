//! Command-line interface, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

/// Inventory Master - multi-tenant inventory tracking service
#[derive(Parser)]
#[command(name = "inventory-master")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the activity log retention schedule (default)
    #[command(alias = "daemon")]
    Serve,

    /// Delete activity log entries past the retention horizon once, then exit
    PurgeLogs {
        /// Retention horizon in days (defaults to retention.horizon_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["inventory-master"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn purge_logs_accepts_days() {
        let cli = Cli::try_parse_from(["inventory-master", "purge-logs", "--days", "30"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::PurgeLogs { days: Some(30) })
        ));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["inventory-master", "frobnicate"]).is_err());
    }
}
