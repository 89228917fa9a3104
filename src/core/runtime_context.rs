//! Runtime context providing time, ID generation, jitter, and sleeping.
//!
//! All four concerns sit behind traits so tests can drive the retry loop and
//! signed-URL expiry without touching the wall clock.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Injected clock, ids, jitter, and sleeper for one runner.
#[derive(Clone)]
pub struct RuntimeContext {
    pub time_provider: Arc<dyn TimeProvider>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub jitter: Arc<dyn JitterSource>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self {
            time_provider: Arc::new(RealTimeProvider),
            id_generator: Arc::new(RealIdGenerator),
            jitter: Arc::new(RealJitterSource),
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

pub trait TimeProvider: Send + Sync {
    fn now_timestamp(&self) -> i64;
    fn now_millis(&self) -> i64;
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Source of retry jitter, bounded by a caller-supplied cap.
pub trait JitterSource: Send + Sync {
    fn jitter_millis(&self, cap_millis: u64) -> u64;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

// --- Real implementations ---

pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now_timestamp(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}

pub struct RealIdGenerator;

impl IdGenerator for RealIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

pub struct RealJitterSource;

impl JitterSource for RealJitterSource {
    fn jitter_millis(&self, cap_millis: u64) -> u64 {
        if cap_millis == 0 {
            return 0;
        }
        rand::Rng::gen_range(&mut rand::thread_rng(), 0..=cap_millis)
    }
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// --- Fake implementations ---

pub struct FakeTimeProvider {
    pub fixed_timestamp: i64,
}

impl FakeTimeProvider {
    pub fn new(fixed_timestamp: i64) -> Self {
        Self { fixed_timestamp }
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now_timestamp(&self) -> i64 {
        self.fixed_timestamp
    }

    fn now_millis(&self) -> i64 {
        self.fixed_timestamp.saturating_mul(1000)
    }
}

pub struct FakeIdGenerator {
    pub prefix: String,
    pub counter: AtomicU64,
}

impl FakeIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for FakeIdGenerator {
    fn next_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, id)
    }
}

/// Always returns the same jitter value (clamped to the cap).
pub struct FixedJitterSource {
    pub value_millis: u64,
}

impl JitterSource for FixedJitterSource {
    fn jitter_millis(&self, cap_millis: u64) -> u64 {
        self.value_millis.min(cap_millis)
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: tokio::sync::Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub async fn total_slept(&self) -> Duration {
        self.slept.lock().await.iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().await.push(duration);
    }
}

impl RuntimeContext {
    /// Context wired entirely with fakes, for deterministic tests.
    pub fn fake(fixed_timestamp: i64, id_prefix: &str) -> Self {
        Self {
            time_provider: Arc::new(FakeTimeProvider::new(fixed_timestamp)),
            id_generator: Arc::new(FakeIdGenerator::new(id_prefix)),
            jitter: Arc::new(FixedJitterSource { value_millis: 0 }),
            sleeper: Arc::new(RecordingSleeper::default()),
        }
    }
}
