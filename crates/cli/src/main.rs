//! `pcload`: run the row-claim demos and the streaming pipeline against a SQLite file.
mod commands;

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use structopt::StructOpt;

use pcload_datastore::{DatabaseConfig, DatabaseConfigBuilder};
use pcload_stream::Format;

#[derive(Debug, StructOpt)]
#[structopt(name = "pcload", about = "Row claims under contention, and streaming rows out of a table")]
struct Params {
    #[structopt(flatten)]
    database: DatabaseArgs,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
struct DatabaseArgs {
    #[structopt(long, default_value = "pcload.sqlite", parse(from_os_str))]
    database: PathBuf,

    #[structopt(long, default_value = "10")]
    max_connections: u32,

    #[structopt(long, default_value = "5000")]
    acquire_timeout_ms: u64,

    #[structopt(long, default_value = "30000")]
    lock_wait_timeout_ms: u64,
}

/// Timings for the two-worker claim demo.
#[derive(Debug, StructOpt)]
struct ScenarioArgs {
    /// Reset the locking table to this many unclaimed rows first.
    #[structopt(long, default_value = "3")]
    rows: i64,

    /// How long the first worker holds its row.
    #[structopt(long, default_value = "15000")]
    first_hold_ms: u64,

    /// How long after the first worker the second one starts.
    #[structopt(long, default_value = "5000")]
    second_start_ms: u64,

    /// Give up after this many attempts when a row is lost to someone else.  Unlimited if absent.
    #[structopt(long)]
    max_attempts: Option<NonZeroU32>,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Create the tables, reset the locking rows, and optionally fill the source table with random text.
    Init {
        #[structopt(long, default_value = "3")]
        locking_rows: i64,

        /// Replace the source table with this many rows of random text.
        #[structopt(long)]
        source_rows: Option<usize>,

        #[structopt(long, default_value = "5000")]
        max_text_len: usize,
    },

    /// Two workers claim rows inside exclusive transactions.
    Locking(ScenarioArgs),

    /// Two workers claim rows with no lock at all, and lose an update.
    NonLocking(ScenarioArgs),

    /// Write the source table to stdout or a file.
    Stream {
        #[structopt(long, default_value = "json")]
        format: Format,

        #[structopt(long, parse(from_os_str))]
        output: Option<PathBuf>,

        #[structopt(long, default_value = "50")]
        display_cap: usize,
    },

    /// Log every abbreviated source row.
    Process {
        #[structopt(long, default_value = "50")]
        display_cap: usize,
    },

    /// Serve the source table over HTTP.
    Serve {
        #[structopt(long, default_value = "127.0.0.1:8080")]
        interface: SocketAddr,

        #[structopt(long, default_value = "64")]
        channel_capacity: usize,

        #[structopt(long, default_value = "50")]
        display_cap: usize,
    },
}

impl DatabaseArgs {
    fn to_config(&self) -> Result<DatabaseConfig> {
        Ok(DatabaseConfigBuilder::default()
            .path(self.database.clone())
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_millis(self.acquire_timeout_ms))
            .lock_wait_timeout(Duration::from_millis(self.lock_wait_timeout_ms))
            .build()?)
    }
}

fn main() -> Result<()> {
    pcload_logging::log_to_stderr();

    let params = Params::from_args();
    let config = params.database.to_config()?;
    commands::run(config, params.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Params {
        Params::from_iter_safe(std::iter::once("pcload").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn database_defaults() {
        let params = parse(&["process"]);
        let config = params.database.to_config().unwrap();
        assert_eq!(config.get_path(), std::path::Path::new("pcload.sqlite"));
        assert_eq!(config.get_max_connections(), 10);
        assert_eq!(config.get_acquire_timeout(), Duration::from_secs(5));
        assert_eq!(config.get_lock_wait_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn global_flags() {
        let params = parse(&[
            "--database",
            "/tmp/x.sqlite",
            "--max-connections",
            "3",
            "--lock-wait-timeout-ms",
            "250",
            "locking",
            "--first-hold-ms",
            "10",
            "--max-attempts",
            "4",
        ]);
        let config = params.database.to_config().unwrap();
        assert_eq!(config.get_max_connections(), 3);
        assert_eq!(config.get_lock_wait_timeout(), Duration::from_millis(250));
        match params.command {
            Command::Locking(args) => {
                assert_eq!(args.first_hold_ms, 10);
                assert_eq!(args.second_start_ms, 5000);
                assert_eq!(args.max_attempts.map(|n| n.get()), Some(4));
            }
            c => panic!("Parsed the wrong command: {:?}", c),
        }
    }

    #[test]
    fn stream_format_is_lenient() {
        match parse(&["stream", "--format", "csv"]).command {
            Command::Stream { format, output, .. } => {
                assert_eq!(format, Format::Csv);
                assert_eq!(output, None);
            }
            c => panic!("Parsed the wrong command: {:?}", c),
        }
        match parse(&["stream", "--format", "yaml"]).command {
            Command::Stream { format, .. } => assert_eq!(format, Format::Json),
            c => panic!("Parsed the wrong command: {:?}", c),
        }
    }

    #[test]
    fn non_locking_is_kebab_case() {
        assert!(matches!(
            parse(&["non-locking"]).command,
            Command::NonLocking(_)
        ));
    }
}
