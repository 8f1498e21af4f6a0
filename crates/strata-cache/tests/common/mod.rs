#![allow(dead_code)]
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use strata_cache::{CachePolicy, CacheStore, DormantSweeper, Source};
use strata_core::LoadError;
use tokio::sync::Barrier;

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A source that counts its calls and can be told to fail or to report
/// values unmodified.
///
/// Every successful load or reload returns `"v{n}"`, `n` counting all
/// successful calls so far.
#[derive(Default)]
pub struct MockSource {
    pub loads: AtomicUsize,
    pub reloads: AtomicUsize,
    pub modified_checks: AtomicUsize,
    pub produced: AtomicUsize,
    pub failing: AtomicBool,
    pub empty: AtomicBool,
    pub unmodified: AtomicBool,
    pub disposed: Mutex<Vec<String>>,
    pub rendezvous: Option<Barrier>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A source whose loads wait until `parties` loads are in flight.
    pub fn with_rendezvous(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            rendezvous: Some(Barrier::new(parties)),
            ..Self::default()
        })
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn modified_checks(&self) -> usize {
        self.modified_checks.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }

    pub fn set_unmodified(&self, unmodified: bool) {
        self.unmodified.store(unmodified, Ordering::SeqCst);
    }

    pub fn disposed(&self) -> Vec<String> {
        let mut disposed = self.disposed.lock().clone();
        disposed.sort();
        disposed
    }

    async fn answer(&self) -> Result<Option<String>, LoadError> {
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(LoadError::unavailable("backend down"));
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let n = self.produced.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!("v{n}")))
    }
}

#[async_trait]
impl Source<u64, String> for MockSource {
    async fn load(&self, _key: &u64) -> Result<Option<String>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.answer().await
    }

    async fn reload(&self, _key: &u64, _previous: Arc<String>) -> Result<Option<String>, LoadError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.answer().await
    }

    fn is_modified(&self, _key: &u64, _value: &String) -> bool {
        self.modified_checks.fetch_add(1, Ordering::SeqCst);
        !self.unmodified.load(Ordering::SeqCst)
    }

    fn dispose(&self, value: &String) -> Result<(), LoadError> {
        self.disposed.lock().push(value.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Builds and initializes a store over `source`.
pub fn active_store(
    name: &str,
    policy: CachePolicy,
    source: Arc<MockSource>,
    sweeper: &Arc<DormantSweeper>,
) -> Arc<CacheStore<u64, String>> {
    let store = CacheStore::<u64, String>::new(name, policy, source, Arc::clone(sweeper));
    store.initialize().expect("Failed to initialize test store");
    store
}

pub fn sweeper() -> Arc<DormantSweeper> {
    Arc::new(DormantSweeper::new(Duration::from_secs(60)))
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
