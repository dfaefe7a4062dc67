//! Core rate limiter implementation.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::RateLimitSettings;

use super::decision::{Decision, RateLimitStatus, Rejection};
use super::state::{ClientState, EpochMillis, HOUR_MS, MINUTE_MS};

/// How often the idle-client sweep may run.
const CLEANUP_INTERVAL_MS: u64 = 60_000;
/// How long a client with an empty history is retained after it was last seen.
const CLIENT_TTL_MS: u64 = 7_200_000;

/// The admission-control engine: per-client sliding windows, cooldown
/// spacing, and lazy cleanup of abandoned client state.
///
/// One mutex guards the whole client map. Every operation is a fast,
/// bounded computation over at most one hour of one client's history, so
/// finer-grained locking buys nothing here. Checks for a single client are
/// thereby linearized; checks for different clients contend only briefly.
pub struct RateLimiter {
    settings: RateLimitSettings,
    inner: Mutex<Inner>,
}

struct Inner {
    clients: HashMap<String, ClientState>,
    last_cleanup: EpochMillis,
}

impl Inner {
    /// Evict clients with empty histories that have been unseen past the
    /// TTL. Gated to at most once per interval, and run inside regular
    /// checks, so memory stays bounded without a background task.
    fn sweep_idle(&mut self, now: EpochMillis) {
        if now.saturating_sub(self.last_cleanup) < CLEANUP_INTERVAL_MS {
            return;
        }
        self.last_cleanup = now;

        let before = self.clients.len();
        self.clients
            .retain(|_, state| !state.idle_expired(now, CLIENT_TTL_MS));
        let evicted = before - self.clients.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.clients.len(), "Evicted idle clients");
        }
    }
}

impl RateLimiter {
    /// Create an engine with the given limits. The settings are expected to
    /// have been validated by the host at construction time.
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            inner: Mutex::new(Inner {
                clients: HashMap::new(),
                last_cleanup: 0,
            }),
        }
    }

    /// Check admission for a request arriving now, by the wall clock.
    pub fn check_now(&self, client_key: &str, message_length: usize) -> Decision {
        self.check(client_key, message_length, epoch_millis())
    }

    /// Check whether one request of `message_length` from `client_key` may
    /// proceed at `now`, recording it if admitted.
    ///
    /// Rules are evaluated in a fixed order and the first match wins:
    /// message length, cooldown, per-minute cap, per-hour cap. Each carries
    /// distinct retry semantics, so the order is part of the contract.
    /// Rejections never touch the client's history.
    pub fn check(&self, client_key: &str, message_length: usize, now: EpochMillis) -> Decision {
        let mut inner = self.inner.lock();

        // Sweeping before the lookup keeps the map borrowed once; the
        // client being checked can never satisfy the TTL predicate at the
        // same instant it is seen.
        inner.sweep_idle(now);

        let state = inner
            .clients
            .entry(client_key.to_owned())
            .or_insert_with(|| {
                debug!(client = client_key, "Creating client state");
                ClientState::new(now)
            });
        state.mark_seen(now);
        state.prune(now);

        let status = self.status_of(state, now);
        trace!(
            client = client_key,
            message_length,
            requests_last_minute = status.requests_last_minute,
            requests_last_hour = status.requests_last_hour,
            cooldown_remaining = status.cooldown_remaining,
            "Checking admission"
        );

        if message_length > self.settings.max_message_length {
            debug!(client = client_key, message_length, "Rejected: message too long");
            return Decision::rejected(
                Rejection::MessageTooLong {
                    max: self.settings.max_message_length,
                },
                status,
            );
        }

        if status.cooldown_remaining > 0 {
            debug!(
                client = client_key,
                remaining_ms = status.cooldown_remaining,
                "Rejected: cooldown active"
            );
            return Decision::rejected(
                Rejection::CooldownActive {
                    remaining_ms: status.cooldown_remaining,
                },
                status,
            );
        }

        if status.requests_last_minute >= self.settings.max_requests_per_minute {
            let retry_after_ms = state.retry_after(now, MINUTE_MS);
            debug!(client = client_key, retry_after_ms, "Rejected: per-minute cap");
            return Decision::rejected(
                Rejection::MinuteCapExceeded {
                    limit: self.settings.max_requests_per_minute,
                    retry_after_ms,
                },
                status,
            );
        }

        if status.requests_last_hour >= self.settings.max_requests_per_hour {
            let retry_after_ms = state.retry_after(now, HOUR_MS);
            debug!(client = client_key, retry_after_ms, "Rejected: per-hour cap");
            return Decision::rejected(
                Rejection::HourCapExceeded {
                    limit: self.settings.max_requests_per_hour,
                    retry_after_ms,
                },
                status,
            );
        }

        state.admit(now, message_length);
        Decision::allowed(self.status_of(state, now))
    }

    /// Forget everything about a client. A no-op for unknown keys.
    pub fn reset(&self, client_key: &str) {
        let removed = self.inner.lock().clients.remove(client_key).is_some();
        if removed {
            debug!(client = client_key, "Client state reset");
        }
    }

    /// Number of clients currently tracked.
    pub fn client_count(&self) -> usize {
        self.inner.lock().clients.len()
    }

    /// Drop all client state. Primarily useful for testing.
    pub fn clear(&self) {
        self.inner.lock().clients.clear();
    }

    fn status_of(&self, state: &ClientState, now: EpochMillis) -> RateLimitStatus {
        RateLimitStatus {
            requests_last_minute: state.count_in_window(now, MINUTE_MS),
            requests_last_hour: state.count_in_window(now, HOUR_MS),
            cooldown_remaining: state.cooldown_remaining(now, self.settings.cooldown_period_ms),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch.
fn epoch_millis() -> EpochMillis {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
