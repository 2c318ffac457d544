//! # Polling
//!
//! Status waiting for long-running remote transitions. A [`WaitSpec`] names
//! the states that end a wait; the [`StatusWaiter`] drives the poll loop.

pub mod wait_spec;
pub mod waiter;

pub use wait_spec::{PollDisposition, WaitSpec, WaitTiming};
pub use waiter::{StatusWaiter, WaitOutcome};
