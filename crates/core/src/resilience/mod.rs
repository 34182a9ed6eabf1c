//! Resilience primitives for calls against rate-limited upstreams

mod circuit_breaker;

pub use circuit_breaker::{BreakerState, FailureBreaker};
