//! Run several claim workers at once, each on its own named thread.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::*;
use pcload_datastore::Database;

use crate::delay::WorkDelay;
use crate::errors::ClaimError;
use crate::worker::{ClaimWorker, RetryPolicy, Strategy};
use crate::Claim;

/// One worker in a scenario.
#[derive(Clone, Debug)]
pub struct WorkerSpec {
    /// Used as the thread name and as the owner written to claimed rows.
    pub name: String,

    /// How long after the scenario starts this worker begins its claim.
    pub start_after: Duration,

    /// What the worker does while holding its row.
    pub delay: Arc<dyn WorkDelay>,
}

/// What happened to one worker.
#[derive(Debug)]
pub struct WorkerReport {
    pub worker: String,
    pub outcome: Result<Claim, ClaimError>,
}

impl WorkerSpec {
    pub fn new(
        name: impl Into<String>,
        start_after: Duration,
        delay: impl WorkDelay + 'static,
    ) -> WorkerSpec {
        WorkerSpec {
            name: name.into(),
            start_after,
            delay: Arc::new(delay),
        }
    }

    /// The classic pair: one worker starts right away and sits on its row for 15 seconds, the other starts 5 seconds
    /// later and writes immediately.
    ///
    /// Under [Strategy::Locking] the second blocks until the first commits and then takes a different row.  Under
    /// [Strategy::NonLocking] both take the same row and the first overwrites the second.
    pub fn demo_pair() -> Vec<WorkerSpec> {
        vec![
            WorkerSpec::new("first-thread", Duration::ZERO, Duration::from_secs(15)),
            WorkerSpec::new("second-thread", Duration::from_secs(5), Duration::ZERO),
        ]
    }
}

/// Run every worker concurrently and wait for all of them.
///
/// Each worker gets its own thread and checks out its own connections; the only thing they share is the database.
/// Reports come back in the same order as `specs`.
pub fn run_scenario(
    db: &Database,
    strategy: Strategy,
    retry: RetryPolicy,
    specs: &[WorkerSpec],
) -> Result<Vec<WorkerReport>> {
    info!(
        "Running {} workers with the {:?} strategy",
        specs.len(),
        strategy
    );

    crossbeam::scope(|s| -> Result<Vec<WorkerReport>> {
        let mut handles = vec![];
        for spec in specs {
            let worker = ClaimWorker::new(spec.name.clone(), strategy).with_retry(retry);
            let handle = s.builder().name(spec.name.clone()).spawn(move |_| {
                if !spec.start_after.is_zero() {
                    std::thread::sleep(spec.start_after);
                }
                worker.run(db, &spec.delay)
            })?;
            handles.push((spec, handle));
        }

        handles
            .into_iter()
            .map(|(spec, handle)| {
                let outcome = handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("Worker {} panicked", spec.name))?;
                Ok(WorkerReport {
                    worker: spec.name.clone(),
                    outcome,
                })
            })
            .collect()
    })
    .map_err(|_| anyhow::anyhow!("A claim worker panicked"))?
}
