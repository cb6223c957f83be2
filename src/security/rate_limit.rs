//! Sliding-window rate limiting keyed by client identity.
//!
//! Each key owns an ordered queue of the instants at which its requests were
//! admitted. A check evicts everything at least `window` old, then admits and
//! records `now` only while fewer than `limit` entries remain.
//!
//! The table is a [`DashMap`]: the shard write lock is held across
//! read-evict-append, and the clock is read after the lock is taken, so checks
//! for one key are linearized and each queue stays sorted. Distinct keys only
//! contend when they hash to the same shard.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::observability::metrics;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Admitted; `remaining` more requests fit in the current window.
    Allow { remaining: usize },
    /// Rejected; the oldest entry leaves the window after `retry_after`.
    Deny { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

pub struct SlidingWindowLimiter {
    window: Duration,
    limit: usize,
    windows: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, limit: usize) -> Self {
        Self {
            window,
            limit,
            windows: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Check and record a request for `key` at the current instant.
    pub fn admit(&self, key: &str) -> Decision {
        self.check(key, Instant::now)
    }

    /// Check and record a request for `key` at a caller-supplied instant.
    pub fn admit_at(&self, key: &str, now: Instant) -> Decision {
        self.check(key, || now)
    }

    fn check(&self, key: &str, clock: impl FnOnce() -> Instant) -> Decision {
        if self.limit == 0 {
            return Decision::Deny {
                retry_after: self.window,
            };
        }

        let mut timestamps = match self.windows.get_mut(key) {
            Some(entry) => entry,
            None => self.windows.entry(key.to_owned()).or_default(),
        };
        let now = clock();

        evict_expired(&mut timestamps, now, self.window);

        if timestamps.len() < self.limit {
            timestamps.push_back(now);
            Decision::Allow {
                remaining: self.limit - timestamps.len(),
            }
        } else {
            let retry_after = timestamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            Decision::Deny { retry_after }
        }
    }

    /// Drop every key whose window has fully expired at `now`.
    ///
    /// Returns the number of keys removed.
    pub fn reap_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            evict_expired(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Periodically sweep idle keys until shutdown is signalled.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.reap_idle(Instant::now());
                        let remaining = limiter.tracked_keys();
                        metrics::set_rate_limit_keys(remaining);
                        if removed > 0 {
                            tracing::debug!(removed, remaining, "Reaped idle rate limit keys");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Rate limit reaper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}

/// Pop entries whose age is `>= window`: the window is `(now - window, now]`.
fn evict_expired(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
