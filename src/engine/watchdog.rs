//! Periodic staleness scanning.
//!
//! The watchdog only inspects the head of each non-empty queue; insertion
//! happens in acceptance order, so the head is the oldest record in both
//! ordering modes. A timeout is advisory: the flagged record stays queued
//! and a late response still matches normally.
//!
//! The cadence comes from a `crossbeam::channel::tick` receiver selected on
//! by the engine loop, so scans are serialized with mutations and stop when
//! the loop stops. The threshold must sit above worst-case pipeline depth
//! times service time plus maximum backpressure, or scans produce false
//! positives; that is a deployment concern, not an engine bug.

use std::time::Instant;

use crate::core::{Timestamp, Tracker};

use super::metrics;
use super::sink::{self, ViolationSink};

/// Run one scan, reporting every flagged record. Returns the flagged count.
pub fn scan(tracker: &mut Tracker, now: Timestamp, sink: &dyn ViolationSink) -> usize {
    let started = Instant::now();
    let violations = tracker.scan_stale(now);
    let flagged = violations.len();
    for violation in violations {
        sink::dispatch(sink, violation);
    }
    metrics::watchdog_scan(started.elapsed(), flagged);
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{Addr, Tag, Timestamp, TxnRequest, TxnResponse, ViolationKind};
    use crate::engine::sink::CollectingSink;

    fn tracker(repeat_timeout_reports: bool) -> Tracker {
        let config = EngineConfig {
            timeout_ms: 50_000,
            repeat_timeout_reports,
            ..EngineConfig::default()
        };
        Tracker::new(&config).expect("valid config")
    }

    #[test]
    fn flags_nothing_before_the_threshold() {
        let mut tracker = tracker(true);
        let sink = CollectingSink::new();
        tracker.record_request_accept(TxnRequest::read(Tag::new(3), Addr(0)), Timestamp::new(0));

        // Exactly at the threshold is not yet stale.
        assert_eq!(scan(&mut tracker, Timestamp::new(50_000), &sink), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn reports_once_per_scan_while_stale() {
        let mut tracker = tracker(true);
        let sink = CollectingSink::new();
        tracker.record_request_accept(TxnRequest::read(Tag::new(3), Addr(0)), Timestamp::new(0));

        assert_eq!(scan(&mut tracker, Timestamp::new(50_001), &sink), 1);
        assert_eq!(scan(&mut tracker, Timestamp::new(50_002), &sink), 1);

        let violations = sink.take();
        assert_eq!(violations.len(), 2);
        assert!(matches!(
            violations[0].kind,
            ViolationKind::Timeout {
                age_ms: 50_001,
                queue_depth: 1,
            }
        ));

        // A late response still matches; nothing left to flag.
        let outcome = tracker.record_response_accept(
            TxnResponse::okay(Tag::new(3), Some(0)),
            Timestamp::new(60_000),
        );
        assert!(outcome.is_matched());
        assert_eq!(scan(&mut tracker, Timestamp::new(70_000), &sink), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn deduplicates_when_repeat_reporting_is_off() {
        let mut tracker = tracker(false);
        let sink = CollectingSink::new();
        tracker.record_request_accept(TxnRequest::read(Tag::new(1), Addr(0)), Timestamp::new(0));

        assert_eq!(scan(&mut tracker, Timestamp::new(50_001), &sink), 1);
        assert_eq!(scan(&mut tracker, Timestamp::new(50_002), &sink), 0);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn only_the_oldest_record_is_inspected() {
        let mut tracker = tracker(true);
        let sink = CollectingSink::new();
        let tag = Tag::new(2);
        tracker.record_request_accept(TxnRequest::read(tag, Addr(0)), Timestamp::new(0));
        tracker.record_request_accept(TxnRequest::read(tag, Addr(8)), Timestamp::new(10));

        // Both records are past the threshold, but only the head is flagged.
        let flagged = scan(&mut tracker, Timestamp::new(60_000), &sink);
        assert_eq!(flagged, 1);
        let violations = sink.take();
        assert_eq!(violations[0].sequence_no.map(|s| s.get()), Some(0));
        assert!(matches!(
            violations[0].kind,
            ViolationKind::Timeout { queue_depth: 2, .. }
        ));
    }
}
