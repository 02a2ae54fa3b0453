//! Request-rate governing.

pub mod window;

pub use window::{FixedWindowLimiter, RateDecision, RateLimiter, RateQuota};
