use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "jevons",
    version,
    about = "Local token usage aggregation and query server"
)]
pub struct CliArgs {
    /// Directory holding events.tsv and the other synced files
    #[arg(long, global = true, env = "JEVONS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory containing per-project session logs
    #[arg(long, global = true, env = "JEVONS_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Seconds between background sync cycles (0 syncs once)
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Log filter, e.g. `debug` or `jevons_store=trace`; overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run the sync scheduler and serve the dashboard API (default)
    Web {
        /// Override the configured port for this run only
        #[arg(long)]
        port: Option<u16>,
        /// Do not open the browser automatically
        #[arg(long)]
        no_open: bool,
    },
    /// Run one sync cycle and print the outcome
    Sync,
    /// Show scheduler heartbeat and last sync status
    Status,
    /// Check source and data directories
    Doctor {
        /// Create missing directories
        #[arg(long)]
        fix: bool,
    },
    /// Print usage cards as JSON
    Total {
        #[arg(long, default_value = "24h")]
        range: String,
        /// Scope path, e.g. /Users/me/dev
        #[arg(long)]
        scope: Option<String>,
    },
    /// Draw an ASCII bar chart of recent buckets
    Graph {
        #[arg(long, default_value = "billable")]
        metric: String,
        #[arg(long, default_value = "24h")]
        range: String,
        /// Number of most recent buckets to draw
        #[arg(long, default_value_t = 80)]
        points: usize,
        /// Bucket width: hour, day or seconds
        #[arg(long, default_value = "900")]
        bucket: String,
        #[arg(long)]
        scope: Option<String>,
    },
}

impl CliArgs {
    pub fn command(&self) -> CliCommand {
        match &self.command {
            Some(command) => command.clone(),
            None => CliCommand::Web {
                port: None,
                no_open: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_web() {
        let args = CliArgs::parse_from(["jevons"]);
        assert!(matches!(
            args.command(),
            CliCommand::Web {
                port: None,
                no_open: false
            }
        ));
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let args = CliArgs::parse_from([
            "jevons",
            "graph",
            "--points",
            "5",
            "--data-dir",
            "/tmp/usage",
        ]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/usage")));
        assert!(matches!(args.command(), CliCommand::Graph { points: 5, .. }));
    }

    #[test]
    fn graph_defaults_to_eighty_quarter_hour_buckets() {
        let args = CliArgs::parse_from(["jevons", "graph"]);
        match args.command() {
            CliCommand::Graph {
                points,
                bucket,
                range,
                metric,
                ..
            } => {
                assert_eq!(points, 80);
                assert_eq!(bucket, "900");
                assert_eq!(range, "24h");
                assert_eq!(metric, "billable");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
