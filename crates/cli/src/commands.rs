use std::fs::File;
use std::io::Write;
use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use log::*;

use pcload_claim::{run_scenario, RetryPolicy, Strategy, WorkerReport, WorkerSpec};
use pcload_datastore::{fixtures, Database, DatabaseConfig};
use pcload_server::{ServerConfigBuilder, StreamServer};
use pcload_stream::{for_each_record, stream_rows, StreamOptions};

use crate::{Command, ScenarioArgs};

pub fn run(config: DatabaseConfig, command: Command) -> Result<()> {
    let db = Database::open(config)?;

    match command {
        Command::Init {
            locking_rows,
            source_rows,
            max_text_len,
        } => init(&db, locking_rows, source_rows, max_text_len),
        Command::Locking(args) => scenario(&db, Strategy::Locking, &args),
        Command::NonLocking(args) => scenario(&db, Strategy::NonLocking, &args),
        Command::Stream {
            format,
            output,
            display_cap,
        } => {
            let options = StreamOptions {
                display_cap,
                ..Default::default()
            };
            let conn = db.acquire()?;
            let summary = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Unable to create {}", path.display()))?;
                    stream_rows(&conn, file, format, &options)?
                }
                None => {
                    let stdout = std::io::stdout();
                    let summary = stream_rows(&conn, stdout.lock(), format, &options)?;
                    writeln!(stdout.lock())?;
                    summary
                }
            };
            info!("Wrote {} records", summary.records);
            Ok(())
        }
        Command::Process { display_cap } => {
            let options = StreamOptions {
                display_cap,
                ..Default::default()
            };
            for_each_record(&*db.acquire()?, &options, |record| {
                info!("{}: {}", record.id, record.text);
            })?;
            Ok(())
        }
        Command::Serve {
            interface,
            channel_capacity,
            display_cap,
        } => {
            let config = ServerConfigBuilder::default()
                .interface(interface)
                .channel_capacity(channel_capacity)
                .display_cap(display_cap)
                .build()?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(StreamServer::new(config, db).serve())
        }
    }
}

fn init(db: &Database, locking_rows: i64, source_rows: Option<usize>, max_text_len: usize) -> Result<()> {
    db.reset_locking_rows(locking_rows)?;
    info!("Reset the locking table to {} unclaimed rows", locking_rows);

    if let Some(count) = source_rows {
        db.clear_source_rows()?;
        let mut rng = rand::thread_rng();
        let inserted = db.insert_source_rows(fixtures::random_source_rows(&mut rng, 1, count, max_text_len))?;
        info!("Inserted {} random source rows", inserted);
    }

    info!("The source table holds {} rows", db.count_source_rows()?);
    Ok(())
}

fn scenario_specs(args: &ScenarioArgs) -> Vec<WorkerSpec> {
    vec![
        WorkerSpec::new(
            "first-thread",
            Duration::ZERO,
            Duration::from_millis(args.first_hold_ms),
        ),
        WorkerSpec::new(
            "second-thread",
            Duration::from_millis(args.second_start_ms),
            Duration::ZERO,
        ),
    ]
}

fn retry_policy(max_attempts: Option<NonZeroU32>) -> RetryPolicy {
    max_attempts.map_or(RetryPolicy::Unbounded, RetryPolicy::Limited)
}

fn scenario(db: &Database, strategy: Strategy, args: &ScenarioArgs) -> Result<()> {
    db.reset_locking_rows(args.rows)?;

    let reports = run_scenario(
        db,
        strategy,
        retry_policy(args.max_attempts),
        &scenario_specs(args),
    )?;
    for WorkerReport { worker, outcome } in &reports {
        match outcome {
            Ok(claim) => info!(
                "{} claimed row {} after {} attempts in {:?}",
                worker, claim.row_id, claim.attempts, claim.elapsed
            ),
            Err(e) => warn!("{} claimed nothing: {}", worker, e),
        }
    }

    for row in db.load_claimable_rows()? {
        info!(
            "Row {}: locked={} owner={}",
            row.id,
            row.locked,
            row.owner.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::Params;
    use structopt::StructOpt;

    fn run_args(dir: &tempfile::TempDir, args: &[&str]) -> Result<()> {
        let path = dir.path().join("database.sqlite");
        let path = path.to_str().unwrap();
        let params = Params::from_iter_safe(
            ["pcload", "--database", path]
                .iter()
                .copied()
                .chain(args.iter().copied()),
        )?;
        run(params.database.to_config()?, params.command)
    }

    #[test]
    fn retry_policy_from_flag() {
        assert_eq!(retry_policy(None), RetryPolicy::Unbounded);
        let two = NonZeroU32::new(2).unwrap();
        assert_eq!(retry_policy(Some(two)), RetryPolicy::Limited(two));
    }

    #[test]
    fn init_then_stream_to_a_file() -> Result<()> {
        let tdir = tempfile::TempDir::new()?;
        run_args(&tdir, &["init", "--source-rows", "25", "--max-text-len", "100"])?;

        let out = tdir.path().join("out.csv");
        run_args(
            &tdir,
            &["stream", "--format", "csv", "--output", out.to_str().unwrap()],
        )?;
        let written = std::fs::read_to_string(&out)?;
        assert_eq!(written.lines().next(), Some("id,text"));
        assert_eq!(written.lines().count(), 26);
        Ok(())
    }

    #[test]
    fn init_then_process() -> Result<()> {
        let tdir = tempfile::TempDir::new()?;
        run_args(&tdir, &["init", "--source-rows", "40"])?;
        run_args(&tdir, &["process", "--display-cap", "8"])?;

        let db = Database::open(DatabaseConfig::at_path(tdir.path().join("database.sqlite")))?;
        assert_eq!(db.count_source_rows()?, 40);
        Ok(())
    }

    #[test]
    fn quick_locking_scenario() -> Result<()> {
        let tdir = tempfile::TempDir::new()?;
        run_args(
            &tdir,
            &["locking", "--first-hold-ms", "100", "--second-start-ms", "20"],
        )?;

        let db = Database::open(DatabaseConfig::at_path(tdir.path().join("database.sqlite")))?;
        let mut owners = db
            .load_claimable_rows()?
            .into_iter()
            .filter_map(|r| r.owner)
            .collect::<Vec<_>>();
        owners.sort();
        assert_eq!(owners, vec!["first-thread", "second-thread"]);
        Ok(())
    }
}
