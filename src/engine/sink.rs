//! Violation sinks.
//!
//! The engine reports violations; it never acts on them. External sinks
//! decide what a violation means for the run.

use std::sync::Mutex;

use crossbeam::channel::Sender;

use crate::core::Violation;

use super::metrics;

pub trait ViolationSink: Send + Sync {
    fn report(&self, violation: Violation);
}

/// Default sink: log each violation.
pub struct TracingSink;

impl ViolationSink for TracingSink {
    fn report(&self, violation: Violation) {
        tracing::warn!(
            target: "violations",
            kind = violation.kind.label(),
            tag = violation.tag.get(),
            sequence_no = ?violation.sequence_no,
            at_ms = violation.at.millis(),
            detail = ?violation.kind,
        );
    }
}

/// Forward violations over a channel to an external consumer.
pub struct ChannelSink {
    tx: Sender<Violation>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Violation>) -> Self {
        Self { tx }
    }
}

impl ViolationSink for ChannelSink {
    fn report(&self, violation: Violation) {
        // Consumer may have gone away; the engine keeps running regardless.
        let _ = self.tx.send(violation);
    }
}

/// Accumulate violations in memory. Intended for tests and short runs.
#[derive(Default)]
pub struct CollectingSink {
    violations: Mutex<Vec<Violation>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<Violation> {
        std::mem::take(&mut *self.violations.lock().expect("violation sink lock poisoned"))
    }

    pub fn collected(&self) -> Vec<Violation> {
        self.violations
            .lock()
            .expect("violation sink lock poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.violations
            .lock()
            .expect("violation sink lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ViolationSink for CollectingSink {
    fn report(&self, violation: Violation) {
        self.violations
            .lock()
            .expect("violation sink lock poisoned")
            .push(violation);
    }
}

/// Report a violation through metrics and the configured sink.
pub(crate) fn dispatch(sink: &dyn ViolationSink, violation: Violation) {
    metrics::violation_reported(violation.kind.label());
    sink.report(violation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Tag, Timestamp, ViolationKind};

    fn sample() -> Violation {
        Violation::new(
            ViolationKind::CapacityExceeded { queue_depth: 8 },
            Tag::new(3),
            None,
            Timestamp::new(10),
        )
    }

    #[test]
    fn collecting_sink_accumulates_and_takes() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());
        sink.report(sample());
        sink.report(sample());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn channel_sink_forwards() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let sink = ChannelSink::new(tx);
        sink.report(sample());
        assert_eq!(rx.try_recv().expect("violation on channel"), sample());
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = crossbeam::channel::unbounded();
        drop(rx);
        let sink = ChannelSink::new(tx);
        sink.report(sample());
    }
}
