//! Per-client traffic state and sliding-window arithmetic.

/// Milliseconds since the Unix epoch.
pub type EpochMillis = u64;

/// The per-minute counting window.
pub const MINUTE_MS: u64 = 60_000;
/// The per-hour counting window, which is also the history retention horizon.
pub const HOUR_MS: u64 = 3_600_000;

/// A single admitted request. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRecord {
    /// When the request was admitted.
    pub timestamp: EpochMillis,
    /// Length of the message carried by the request.
    pub message_length: usize,
}

/// Mutable traffic state for one client.
///
/// The history holds only admitted requests and is pruned to the trailing
/// one-hour window on every check. `last_request_time` is `None` until the
/// first admission and is cleared again whenever pruning empties the
/// history, so a client returning after a long idle period carries no
/// stale cooldown.
#[derive(Debug, Clone)]
pub struct ClientState {
    history: Vec<RequestRecord>,
    last_request_time: Option<EpochMillis>,
    last_seen: EpochMillis,
}

impl ClientState {
    /// Create empty state for a client first seen at `now`.
    pub fn new(now: EpochMillis) -> Self {
        Self {
            history: Vec::new(),
            last_request_time: None,
            last_seen: now,
        }
    }

    /// Record that the client was observed at `now`, admitted or not.
    pub fn mark_seen(&mut self, now: EpochMillis) {
        self.last_seen = now;
    }

    /// Drop history records that have aged out of the one-hour window.
    ///
    /// Records are kept while `timestamp > now - 1h`. If the history
    /// empties, the cooldown anchor is cleared.
    pub fn prune(&mut self, now: EpochMillis) {
        if self.history.is_empty() {
            return;
        }

        self.history.retain(|record| record.timestamp + HOUR_MS > now);
        if self.history.is_empty() {
            self.last_request_time = None;
        }
    }

    /// Admit a request: anchor the cooldown at `now` and append a record.
    pub fn admit(&mut self, now: EpochMillis, message_length: usize) {
        self.last_request_time = Some(now);
        self.history.push(RequestRecord {
            timestamp: now,
            message_length,
        });
    }

    /// Count records newer than `now - window_ms`.
    pub fn count_in_window(&self, now: EpochMillis, window_ms: u64) -> u32 {
        self.history
            .iter()
            .filter(|record| record.timestamp + window_ms > now)
            .count() as u32
    }

    /// Milliseconds of cooldown still in effect at `now`, zero if the
    /// client has no prior admitted request.
    pub fn cooldown_remaining(&self, now: EpochMillis, cooldown_period_ms: u64) -> u64 {
        match self.last_request_time {
            Some(last) => (last + cooldown_period_ms).saturating_sub(now),
            None => 0,
        }
    }

    /// Milliseconds until the oldest in-window record ages out, which is
    /// the earliest instant the in-window count can decrease.
    ///
    /// Returns the full window in the degenerate case where no record
    /// falls inside it; a cap that has just been reported as exceeded
    /// always has at least one.
    pub fn retry_after(&self, now: EpochMillis, window_ms: u64) -> u64 {
        let earliest = self
            .history
            .iter()
            .filter(|record| record.timestamp + window_ms > now)
            .map(|record| record.timestamp)
            .min();

        match earliest {
            Some(timestamp) => (timestamp + window_ms).saturating_sub(now),
            None => window_ms,
        }
    }

    /// Whether this client is eligible for idle eviction: nothing left in
    /// its history and unseen for longer than `ttl_ms`.
    pub fn idle_expired(&self, now: EpochMillis, ttl_ms: u64) -> bool {
        self.history.is_empty() && now.saturating_sub(self.last_seen) > ttl_ms
    }

    /// Number of records currently held.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_records_within_the_hour() {
        let mut state = ClientState::new(0);
        state.admit(0, 10);
        state.admit(1_000_000, 10);

        // The record at t=0 ages out exactly at t=1h.
        state.prune(HOUR_MS);
        assert_eq!(state.history_len(), 1);
        assert_eq!(state.count_in_window(HOUR_MS, HOUR_MS), 1);
    }

    #[test]
    fn test_prune_clears_cooldown_anchor_when_history_empties() {
        let mut state = ClientState::new(0);
        state.admit(0, 10);
        assert_eq!(state.cooldown_remaining(500, 3_000), 2_500);

        state.prune(HOUR_MS + 1);
        assert_eq!(state.history_len(), 0);
        assert_eq!(state.cooldown_remaining(HOUR_MS + 1, 3_000), 0);
    }

    #[test]
    fn test_cooldown_zero_before_first_admission() {
        let state = ClientState::new(0);
        assert_eq!(state.cooldown_remaining(0, 3_000), 0);
    }

    #[test]
    fn test_count_in_window_is_strict_at_the_boundary() {
        let mut state = ClientState::new(0);
        state.admit(0, 10);

        assert_eq!(state.count_in_window(MINUTE_MS - 1, MINUTE_MS), 1);
        assert_eq!(state.count_in_window(MINUTE_MS, MINUTE_MS), 0);
    }

    #[test]
    fn test_retry_after_uses_earliest_in_window_record() {
        let mut state = ClientState::new(0);
        state.admit(10_000, 10);
        state.admit(20_000, 10);

        // Oldest in-window record is at t=10s; it ages out at t=70s.
        assert_eq!(state.retry_after(25_000, MINUTE_MS), 45_000);
    }

    #[test]
    fn test_retry_after_degenerate_empty_window() {
        let state = ClientState::new(0);
        assert_eq!(state.retry_after(0, MINUTE_MS), MINUTE_MS);
    }

    #[test]
    fn test_idle_expired() {
        let mut state = ClientState::new(0);
        assert!(!state.idle_expired(7_200_000, 7_200_000));
        assert!(state.idle_expired(7_200_001, 7_200_000));

        // A client with in-window history is never idle-expired.
        state.admit(0, 10);
        assert!(!state.idle_expired(7_200_001, 7_200_000));
    }
}
