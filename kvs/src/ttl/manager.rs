use std::sync::Arc;
use std::time::Duration;

/// Wall-clock source in milliseconds since the epoch, injectable so tests
/// control time instead of sleeping through it.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// The real clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Expiration math for a TTL store: turns requested lifetimes into absolute
/// deadlines at commit time and answers liveness questions at read time.
pub struct TtlManager {
    default_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl TtlManager {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Option<Duration>, clock: Arc<dyn Clock>) -> Self {
        TtlManager { default_ttl, clock }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// The absolute deadline for a put: `now + duration`, falling back to the
    /// default TTL when no per-key duration was requested. `None` when
    /// neither is configured, meaning the entry never expires.
    pub fn calculate_expiration(&self, duration: Option<Duration>) -> Option<i64> {
        duration
            .or(self.default_ttl)
            .map(|d| self.clock.now_ms() + d.as_millis() as i64)
    }

    /// An entry with no deadline never expires; otherwise it is expired
    /// exactly when `now >= expires_at`.
    pub fn is_expired(&self, expires_at: Option<i64>) -> bool {
        expires_at.map(|at| self.clock.now_ms() >= at).unwrap_or(false)
    }
}
