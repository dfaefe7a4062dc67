//! Admission decisions and the reasons a request can be turned away.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// A snapshot of a client's standing against the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    /// Admitted requests in the trailing minute.
    pub requests_last_minute: u32,
    /// Admitted requests in the trailing hour.
    pub requests_last_hour: u32,
    /// Milliseconds of cooldown still in effect.
    pub cooldown_remaining: u64,
}

impl RateLimitStatus {
    /// An all-zero status, used when no client state applies.
    pub fn zero() -> Self {
        Self {
            requests_last_minute: 0,
            requests_last_hour: 0,
            cooldown_remaining: 0,
        }
    }
}

/// Why a request was refused.
///
/// Rejection is an ordinary, frequent outcome for this engine, so it is a
/// plain value rather than an error type. Variants carry the data their
/// user-facing message and retry hint are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The message exceeds the configured maximum length.
    MessageTooLong { max: usize },
    /// The minimum spacing between admitted requests has not yet elapsed.
    CooldownActive { remaining_ms: u64 },
    /// The per-minute request cap is already met.
    MinuteCapExceeded { limit: u32, retry_after_ms: u64 },
    /// The per-hour request cap is already met.
    HourCapExceeded { limit: u32, retry_after_ms: u64 },
}

impl Rejection {
    /// The user-facing explanation for this rejection.
    pub fn reason(&self) -> String {
        match self {
            Rejection::MessageTooLong { max } => {
                format!("Message too long (max {max} characters)")
            }
            Rejection::CooldownActive { remaining_ms } => {
                let seconds = remaining_ms.div_ceil(1000);
                format!("Please wait {seconds} seconds between requests")
            }
            Rejection::MinuteCapExceeded { limit, .. } => {
                format!("Rate limit exceeded: {limit} requests per minute")
            }
            Rejection::HourCapExceeded { limit, .. } => {
                format!("Rate limit exceeded: {limit} requests per hour")
            }
        }
    }

    /// Milliseconds until the request could plausibly succeed, if the
    /// rejection carries one. An over-long message has no retry hint.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Rejection::MessageTooLong { .. } => None,
            Rejection::CooldownActive { remaining_ms } => Some(*remaining_ms),
            Rejection::MinuteCapExceeded { retry_after_ms, .. }
            | Rejection::HourCapExceeded { retry_after_ms, .. } => Some(*retry_after_ms),
        }
    }
}

/// The outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// `None` when the request was admitted.
    pub rejection: Option<Rejection>,
    /// Client standing: post-admission for admitted requests, pre-admission
    /// for rejected ones.
    pub status: RateLimitStatus,
}

impl Decision {
    /// An admitting decision.
    pub fn allowed(status: RateLimitStatus) -> Self {
        Self {
            rejection: None,
            status,
        }
    }

    /// A refusing decision.
    pub fn rejected(rejection: Rejection, status: RateLimitStatus) -> Self {
        Self {
            rejection: Some(rejection),
            status,
        }
    }

    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        self.rejection.is_none()
    }

    /// The retry hint, when the rejection carries one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        self.rejection.as_ref().and_then(Rejection::retry_after_ms)
    }
}

// Wire shape: `{ allowed, reason?, retryAfter?, status }`, with the
// optional fields omitted for admitted requests.
impl Serialize for Decision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let reason = self.rejection.as_ref().map(Rejection::reason);
        let retry_after = self.retry_after_ms();

        let fields = 2 + usize::from(reason.is_some()) + usize::from(retry_after.is_some());
        let mut out = serializer.serialize_struct("Decision", fields)?;
        out.serialize_field("allowed", &self.is_allowed())?;
        if let Some(reason) = &reason {
            out.serialize_field("reason", reason)?;
        }
        if let Some(retry_after) = retry_after {
            out.serialize_field("retryAfter", &retry_after)?;
        }
        out.serialize_field("status", &self.status)?;
        out.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_messages() {
        assert_eq!(
            Rejection::MessageTooLong { max: 1000 }.reason(),
            "Message too long (max 1000 characters)"
        );
        assert_eq!(
            Rejection::MinuteCapExceeded {
                limit: 8,
                retry_after_ms: 1
            }
            .reason(),
            "Rate limit exceeded: 8 requests per minute"
        );
        assert_eq!(
            Rejection::HourCapExceeded {
                limit: 40,
                retry_after_ms: 1
            }
            .reason(),
            "Rate limit exceeded: 40 requests per hour"
        );
    }

    #[test]
    fn test_cooldown_seconds_round_up() {
        let rejection = Rejection::CooldownActive { remaining_ms: 1 };
        assert_eq!(rejection.reason(), "Please wait 1 seconds between requests");

        let rejection = Rejection::CooldownActive { remaining_ms: 2_001 };
        assert_eq!(rejection.reason(), "Please wait 3 seconds between requests");
    }

    #[test]
    fn test_message_too_long_has_no_retry_hint() {
        let decision = Decision::rejected(
            Rejection::MessageTooLong { max: 100 },
            RateLimitStatus::zero(),
        );
        assert_eq!(decision.retry_after_ms(), None);
    }

    #[test]
    fn test_allowed_wire_shape_omits_optional_fields() {
        let decision = Decision::allowed(RateLimitStatus {
            requests_last_minute: 1,
            requests_last_hour: 1,
            cooldown_remaining: 3_000,
        });

        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "allowed": true,
                "status": {
                    "requestsLastMinute": 1,
                    "requestsLastHour": 1,
                    "cooldownRemaining": 3_000,
                },
            })
        );
    }

    #[test]
    fn test_rejected_wire_shape_carries_reason_and_retry() {
        let decision = Decision::rejected(
            Rejection::CooldownActive { remaining_ms: 500 },
            RateLimitStatus::zero(),
        );

        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["allowed"], serde_json::json!(false));
        assert_eq!(
            value["reason"],
            serde_json::json!("Please wait 1 seconds between requests")
        );
        assert_eq!(value["retryAfter"], serde_json::json!(500));
    }
}
