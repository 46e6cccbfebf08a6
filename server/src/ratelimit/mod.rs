//! Request rate limiting
//!
//! Sliding fixed-window counters keyed by (client, route class). The
//! service owns no globals: the clock is injected and the counter store
//! sits behind [`CounterStore`] so a shared backend can replace the
//! process-local map without changing call sites. Counters are NOT
//! shared across instances; that relaxation is accepted for
//! single-instance deployments.

mod middleware;

pub use middleware::rate_limit_middleware;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Injected time source
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// Wall-clock time source
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// One named limiter configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimitConfig {
    /// Default API limit: 100 requests / 60 s
    pub const DEFAULT: Self = Self {
        max_requests: 100,
        window_ms: 60_000,
    };

    /// Admin routes: 500 requests / 60 s
    pub const ADMIN: Self = Self {
        max_requests: 500,
        window_ms: 60_000,
    };
}

/// Route class selecting the limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Default,
    Admin,
}

impl RouteClass {
    pub fn from_path(path: &str) -> Self {
        if path.starts_with("/api/admin") {
            Self::Admin
        } else {
            Self::Default
        }
    }
}

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow {
        limit: u32,
        remaining: u32,
        reset_epoch_secs: u64,
    },
    Deny {
        limit: u32,
        retry_after_secs: u64,
        reset_epoch_secs: u64,
    },
}

/// Swappable counter backend
pub trait CounterStore: Send + Sync {
    /// Register one hit and decide
    fn hit(&self, key: &str, config: RateLimitConfig, now_ms: u64) -> Decision;

    /// Drop expired windows; returns how many were removed
    fn sweep(&self, now_ms: u64) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at_ms: u64,
}

/// Process-local counter map
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    windows: DashMap<String, Window>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn hit(&self, key: &str, config: RateLimitConfig, now_ms: u64) -> Decision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window {
                count: 0,
                reset_at_ms: now_ms + config.window_ms,
            });

        if entry.reset_at_ms <= now_ms {
            // Expired window: start fresh
            entry.count = 0;
            entry.reset_at_ms = now_ms + config.window_ms;
        }

        entry.count += 1;
        let reset_epoch_secs = entry.reset_at_ms.div_ceil(1000);

        if entry.count <= config.max_requests {
            Decision::Allow {
                limit: config.max_requests,
                remaining: config.max_requests - entry.count,
                reset_epoch_secs,
            }
        } else {
            let retry_after_secs = (entry.reset_at_ms - now_ms).div_ceil(1000);
            Decision::Deny {
                limit: config.max_requests,
                retry_after_secs,
                reset_epoch_secs,
            }
        }
    }

    fn sweep(&self, now_ms: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at_ms > now_ms);
        before - self.windows.len()
    }
}

/// Rate limiter service
#[derive(Clone)]
pub struct RateLimiterService {
    clock: Arc<dyn Clock>,
    store: Arc<dyn CounterStore>,
}

impl RateLimiterService {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn CounterStore>) -> Self {
        Self { clock, store }
    }

    /// Process-local limiter on the system clock
    pub fn in_memory() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(MemoryCounterStore::new()))
    }

    /// Check one request against the class's window
    pub fn check(&self, client_key: &str, class: RouteClass) -> Decision {
        let config = match class {
            RouteClass::Default => RateLimitConfig::DEFAULT,
            RouteClass::Admin => RateLimitConfig::ADMIN,
        };
        // Separate windows per route class
        let key = format!("{client_key}:{class:?}");
        self.store.hit(&key, config, self.clock.now_millis())
    }

    /// Spawn the background sweep bounding the map's memory
    pub fn spawn_sweeper(&self, interval: Duration, cancel: CancellationToken) {
        let clock = self.clock.clone();
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = store.sweep(clock.now_millis());
                        if removed > 0 {
                            tracing::debug!(removed, "rate limit windows swept");
                        }
                    }
                }
            }
        });
    }
}
