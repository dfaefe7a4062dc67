//! Rate limiting logic and state management.

mod decision;
mod limiter;
mod state;

pub use decision::{Decision, RateLimitStatus, Rejection};
pub use limiter::RateLimiter;
pub use state::{ClientState, EpochMillis, RequestRecord};
