//! Engine runtime - the threaded shell around the tracker.
//!
//! Provides:
//! - Monotonic clock for ages and timeouts
//! - The serializing event loop (one thread owns all tracker mutations)
//! - Watchdog scans on a fixed cadence
//! - Violation sinks and metric emission
//! - A handle for producers, snapshot queries, and drained shutdown

pub mod clock;
pub mod handle;
pub mod metrics;
pub mod server;
pub mod sink;
pub mod watchdog;

pub use clock::Clock;
pub use handle::{start, EngineError, EngineHandle};
pub use server::{run_engine_loop, ControlMessage};
pub use sink::{ChannelSink, CollectingSink, TracingSink, ViolationSink};
