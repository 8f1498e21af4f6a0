//! The sweep loop.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use super::registry::{RegistrationId, Registry, Sweepable};
use crate::error::Result;
use crate::metrics::record_sweep;
use crate::policy::{CachePolicy, MIN_SWEEP_INTERVAL};

/// Outcome of one pass over the registered stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stores that were cleaned successfully.
    pub stores: usize,
    /// Entries evicted across those stores.
    pub evicted: usize,
    /// Stores skipped because they were no longer active.
    pub skipped: usize,
    /// Stores whose cleanup failed.
    pub failures: usize,
}

/// Periodically evicts dormant entries from every registered store.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use strata_cache::DormantSweeper;
///
/// # #[tokio::main]
/// # async fn main() {
/// let sweeper = Arc::new(DormantSweeper::new(Duration::from_secs(300)));
/// let handle = sweeper.start();
///
/// // ... build stores with `Arc::clone(&sweeper)` ...
///
/// handle.stop();
/// handle.join().await;
/// # }
/// ```
pub struct DormantSweeper {
    interval: Duration,
    registry: Registry,
    shutdown_tx: watch::Sender<bool>,
}

impl DormantSweeper {
    /// Creates a sweeper. Intervals under one minute are raised to one minute.
    pub fn new(interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            interval: interval.max(MIN_SWEEP_INTERVAL),
            registry: Registry::default(),
            shutdown_tx,
        }
    }

    /// Creates a sweeper running at the policy's sweep interval.
    pub fn from_policy(policy: &CachePolicy) -> Self {
        Self::new(policy.sweep_interval())
    }

    /// Returns the interval between passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Adds a store to the sweep.
    pub fn register(&self, store: Weak<dyn Sweepable>) -> RegistrationId {
        let id = self.registry.register(store);
        debug!(registration = ?id, "Store registered with sweeper");
        id
    }

    /// Removes a store from the sweep. Returns false if it was not registered.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        let removed = self.registry.unregister(id);
        debug!(registration = ?id, removed = removed, "Store unregistered from sweeper");
        removed
    }

    /// Returns the number of registered stores.
    pub fn registered(&self) -> usize {
        self.registry.len()
    }

    /// Evicts dormant entries from every active store, once.
    ///
    /// A store that fails is logged and counted; the others are still swept.
    /// Panics are caught the same way only when the build unwinds. The
    /// workspace release profile sets `panic = "abort"`, so there a panicking
    /// store aborts the process.
    pub fn sweep_once(&self) -> SweepReport {
        let report = self.pass("sweep", |store| store.clean_dormant());
        record_sweep(report.failures);

        debug!(
            stores = report.stores,
            evicted = report.evicted,
            failures = report.failures,
            "Dormant sweep finished"
        );
        report
    }

    /// Evicts every entry from every active store, immediately.
    pub fn flush_all(&self) -> SweepReport {
        let report = self.pass("flush", |store| store.clean_all());

        info!(
            stores = report.stores,
            evicted = report.evicted,
            failures = report.failures,
            "All cache stores flushed"
        );
        report
    }

    fn pass<F>(&self, operation: &str, clean: F) -> SweepReport
    where
        F: Fn(&dyn Sweepable) -> Result<usize>,
    {
        let mut report = SweepReport::default();

        for store in self.registry.snapshot() {
            if !store.is_active() {
                report.skipped += 1;
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| clean(store.as_ref()))) {
                Ok(Ok(evicted)) => {
                    report.stores += 1;
                    report.evicted += evicted;
                },
                Ok(Err(e)) => {
                    report.failures += 1;
                    warn!(store = %store.name(), operation = %operation, error = %e, "Store cleanup failed");
                },
                Err(_) => {
                    report.failures += 1;
                    warn!(store = %store.name(), operation = %operation, "Store cleanup panicked");
                },
            }
        }

        report
    }

    /// Runs the sweep loop until [`stop`](Self::stop) is called.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return;
        }

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting dormant sweeper with interval {:?}", self.interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.sweep_once();
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Dormant sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Signals the loop to stop. Takes effect even before `run` starts.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Returns true once `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Spawns the loop on the current tokio runtime.
    pub fn start(self: &Arc<Self>) -> SweeperHandle {
        let sweeper = Arc::clone(self);
        let task = tokio::spawn(async move { sweeper.run().await });

        SweeperHandle {
            sweeper: Arc::clone(self),
            task: Some(task),
        }
    }
}

/// Handle for a running sweeper. Dropping it stops the loop.
pub struct SweeperHandle {
    sweeper: Arc<DormantSweeper>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop.
    pub fn stop(&self) {
        self.sweeper.stop();
    }

    /// Waits for the loop to exit.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Dormant sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
