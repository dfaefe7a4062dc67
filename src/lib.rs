//! Palisade - Admission Control for Conversational-Agent APIs
//!
//! This crate implements per-client request admission control: a sliding-window
//! rate limiter with cooldown enforcement, retry-after computation, and
//! memory-bounded cleanup of idle client state. The engine is an in-process,
//! in-memory component; a thin HTTP surface exposes it for checks and resets.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
