use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use super::pipeline::{CycleOutcome, ScanPipeline};

const IDLE_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("scan thread panicked")]
    Panicked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub cycles: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Handle to the dedicated scan thread. Dropping it without `shutdown` leaves the thread
/// running until its cycle limit.
pub struct ScanWorker {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<WorkerSummary>,
}

impl ScanWorker {
    /// Starts the scan loop. With `cycle_limit` the thread exits by itself after that many
    /// cycles.
    pub fn spawn(pipeline: ScanPipeline, cycle_limit: Option<u64>) -> Result<Self, WorkerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("harvest-scan".into())
            .spawn(move || run_loop(pipeline, &thread_shutdown, cycle_limit))
            .map_err(WorkerError::Spawn)?;
        info!(cycle_limit = ?cycle_limit, "scan_worker_started");
        Ok(Self { shutdown, handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Requests a stop, wakes the thread from its sleep and waits for it.
    pub fn shutdown(self) -> Result<WorkerSummary, WorkerError> {
        self.shutdown.store(true, Ordering::Release);
        self.handle.thread().unpark();
        self.join()
    }

    /// Waits for the thread to exit on its own.
    pub fn join(self) -> Result<WorkerSummary, WorkerError> {
        let summary = self.handle.join().map_err(|_| WorkerError::Panicked)?;
        info!(
            cycles = summary.cycles,
            completed = summary.completed,
            failed = summary.failed,
            "scan_worker_stopped"
        );
        Ok(summary)
    }
}

fn run_loop(mut pipeline: ScanPipeline, shutdown: &AtomicBool, cycle_limit: Option<u64>) -> WorkerSummary {
    let mut summary = WorkerSummary::default();
    let mut last_idle_log: Option<Instant> = None;
    while !shutdown.load(Ordering::Acquire) {
        if cycle_limit.is_some_and(|limit| summary.cycles >= limit) {
            break;
        }
        summary.cycles += 1;
        let delay = match pipeline.run_cycle(Instant::now()) {
            Ok(report) => {
                match report.outcome {
                    CycleOutcome::Completed(_) => summary.completed += 1,
                    CycleOutcome::Skipped(reason) => {
                        let now = Instant::now();
                        if last_idle_log.map_or(true, |at| now.duration_since(at) >= IDLE_LOG_INTERVAL) {
                            info!(reason = ?reason, "scan_idle");
                            last_idle_log = Some(now);
                        }
                    }
                }
                report.next_delay
            }
            Err(err) => {
                summary.failed += 1;
                warn!(error = %err, "scan_cycle_failed");
                pipeline.fallback_delay()
            }
        };
        sleep_unless_shutdown(shutdown, delay);
    }
    summary
}

/// `park_timeout` may wake early; the loop re-parks until the deadline or a shutdown.
fn sleep_unless_shutdown(shutdown: &AtomicBool, delay: Duration) {
    let deadline = Instant::now() + delay;
    loop {
        if shutdown.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}
