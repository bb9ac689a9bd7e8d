//! End-to-end engine tests: threaded producers, watchdog, shutdown drain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scoreboard_rs::engine;
use scoreboard_rs::{
    Addr, CollectingSink, EngineConfig, EngineHandle, Tag, TxnRequest, TxnResponse, ViolationKind,
};

fn wait_until(timeout_ms: u64, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

fn quiet_config() -> EngineConfig {
    EngineConfig {
        num_tags: 16,
        max_per_tag: 8,
        timeout_ms: 60_000,
        watchdog_period_ms: 50,
        ..EngineConfig::default()
    }
}

fn inflight(handle: &EngineHandle) -> usize {
    handle.snapshot().expect("snapshot").total_inflight
}

#[test]
fn clean_pipeline_retires_everything() {
    let sink = Arc::new(CollectingSink::new());
    let handle = engine::start(quiet_config(), sink.clone()).expect("start engine");

    // Request observer on its own thread, like a real front end.
    let req_tx = handle.request_sender();
    let producer = std::thread::spawn(move || {
        for tag in 0..4u16 {
            let addr = Addr(0x100 + u64::from(tag) * 8);
            let value = u64::from(tag) * 0x11;
            req_tx
                .send(TxnRequest::write(Tag::new(tag), addr, value))
                .expect("send request");
            req_tx
                .send(TxnRequest::read(Tag::new(tag), addr))
                .expect("send request");
        }
    });
    producer.join().expect("producer thread");

    // Responses may only be matched once the requests are admitted.
    assert!(wait_until(1_000, || inflight(&handle) == 8));

    let rsp_tx = handle.response_sender();
    for tag in 0..4u16 {
        let value = u64::from(tag) * 0x11;
        rsp_tx
            .send(TxnResponse::okay(Tag::new(tag), None))
            .expect("send response");
        rsp_tx
            .send(TxnResponse::okay(Tag::new(tag), Some(value)))
            .expect("send response");
    }
    assert!(wait_until(1_000, || inflight(&handle) == 0));

    let report = handle.shutdown().expect("shutdown");
    assert!(report.is_clean());
    assert_eq!(report.total_accepted, 8);
    assert_eq!(report.max_total_inflight_seen, 8);
    assert!(sink.is_empty());
}

#[test]
fn capacity_overflow_surfaces_through_the_sink() {
    let config = EngineConfig {
        max_per_tag: 2,
        ..quiet_config()
    };
    let sink = Arc::new(CollectingSink::new());
    let handle = engine::start(config, sink.clone()).expect("start engine");

    let tag = Tag::new(7);
    for i in 0..3 {
        handle
            .request_accepted(TxnRequest::read(tag, Addr(i)))
            .expect("send request");
    }

    assert!(wait_until(1_000, || sink.len() == 1));
    let violations = sink.collected();
    assert!(matches!(
        violations[0].kind,
        ViolationKind::CapacityExceeded { queue_depth: 2 }
    ));
    assert_eq!(violations[0].tag, tag);

    let snapshot = handle.snapshot().expect("snapshot");
    assert_eq!(snapshot.tags[tag.index()].depth, 2);

    let report = handle.shutdown().expect("shutdown");
    assert_eq!(report.incomplete.len(), 2);
    assert_eq!(report.violations_emitted, 1);
}

#[test]
fn unmatched_response_surfaces_through_the_sink() {
    let sink = Arc::new(CollectingSink::new());
    let handle = engine::start(quiet_config(), sink.clone()).expect("start engine");

    handle
        .response_accepted(TxnResponse::okay(Tag::new(9), Some(1)))
        .expect("send response");

    assert!(wait_until(1_000, || sink.len() == 1));
    assert!(matches!(
        sink.collected()[0].kind,
        ViolationKind::UnmatchedResponse { .. }
    ));
    assert_eq!(inflight(&handle), 0);

    let report = handle.shutdown().expect("shutdown");
    assert!(report.incomplete.is_empty());
    assert_eq!(report.violations_emitted, 1);
}

#[test]
fn stale_head_is_flagged_until_its_response_arrives() {
    let config = EngineConfig {
        timeout_ms: 20,
        watchdog_period_ms: 5,
        ..quiet_config()
    };
    let sink = Arc::new(CollectingSink::new());
    let handle = engine::start(config, sink.clone()).expect("start engine");

    let tag = Tag::new(3);
    handle
        .request_accepted(TxnRequest::read(tag, Addr(0x10)))
        .expect("send request");

    // Repeated reporting is on by default: one violation per scan once stale.
    let timeouts = || {
        sink.collected()
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::Timeout { .. }))
            .count()
    };
    assert!(wait_until(2_000, || timeouts() >= 2));
    let first = sink
        .collected()
        .into_iter()
        .find(|v| matches!(v.kind, ViolationKind::Timeout { .. }))
        .expect("timeout violation");
    assert_eq!(first.tag, tag);
    assert!(matches!(
        first.kind,
        ViolationKind::Timeout { queue_depth: 1, .. }
    ));

    // A late response still matches normally and stops the reports.
    handle
        .response_accepted(TxnResponse::okay(tag, Some(0)))
        .expect("send response");
    assert!(wait_until(1_000, || inflight(&handle) == 0));
    sink.take();
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(
        sink.collected()
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::Timeout { .. }))
            .count(),
        0
    );

    let report = handle.shutdown().expect("shutdown");
    assert!(report.incomplete.is_empty());
}

#[test]
fn shutdown_enumerates_incomplete_transactions() {
    let sink = Arc::new(CollectingSink::new());
    let handle = engine::start(quiet_config(), sink.clone()).expect("start engine");

    handle
        .request_accepted(TxnRequest::write(Tag::new(2), Addr(0x8), 1))
        .expect("send request");
    handle
        .request_accepted(TxnRequest::read(Tag::new(5), Addr(0x8)))
        .expect("send request");
    assert!(wait_until(1_000, || inflight(&handle) == 2));

    let report = handle.shutdown().expect("shutdown");
    assert_eq!(report.incomplete.len(), 2);
    // Acceptance order, regardless of tag.
    assert!(report.incomplete[0].sequence_no < report.incomplete[1].sequence_no);
    assert_eq!(report.incomplete[0].tag, Tag::new(2));
    assert_eq!(report.incomplete[1].tag, Tag::new(5));
    assert!(!report.is_clean());
    assert!(sink.is_empty(), "incomplete transactions are not violations");
}

#[test]
fn snapshot_reflects_pending_state() {
    let sink = Arc::new(CollectingSink::new());
    let handle = engine::start(quiet_config(), sink).expect("start engine");

    handle
        .request_accepted(TxnRequest::read(Tag::new(1), Addr(0x40)))
        .expect("send request");
    assert!(wait_until(1_000, || inflight(&handle) == 1));

    let snapshot = handle.snapshot().expect("snapshot");
    assert_eq!(snapshot.total_inflight, 1);
    assert_eq!(snapshot.tags[1].depth, 1);
    assert_eq!(snapshot.tags[1].entries.len(), 1);

    let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
    assert_eq!(json["total_inflight"], 1);

    handle.shutdown().expect("shutdown");
}
