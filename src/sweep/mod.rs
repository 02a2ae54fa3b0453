//! Background subscription-expiry sweep.

pub mod expiry;

pub use expiry::{run_expiry_sweep, StopSignal, SweepReport};
