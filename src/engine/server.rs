//! Engine thread loop.
//!
//! This is THE serialization point - every tracker mutation happens on this
//! thread. Two producer channels (accepted requests, accepted responses),
//! the watchdog tick, and the control channel are multiplexed with
//! `crossbeam::select!`, so a request-accept and a response-accept for the
//! same tag can never interleave or be observed half-applied.

use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::{never, Receiver, Sender};

use crate::core::{
    DrainReport, RequestOutcome, ResponseOutcome, Snapshot, Tracker, TxnRequest, TxnResponse,
};

use super::clock::Clock;
use super::metrics;
use super::sink::{self, ViolationSink};
use super::watchdog;

/// Control-plane message for the engine loop.
pub enum ControlMessage {
    /// Reply with a point-in-time view of all pending state.
    Snapshot { respond: Sender<Snapshot> },
    /// Flush the drain report, reply with it, and stop.
    Shutdown { respond: Sender<DrainReport> },
}

/// Run the engine loop until shutdown.
///
/// The loop also stops, draining first, when every inbound channel has
/// disconnected - that is what happens when the handle is dropped without an
/// explicit shutdown.
pub fn run_engine_loop(
    tracker: Tracker,
    clock: Clock,
    req_rx: Receiver<TxnRequest>,
    rsp_rx: Receiver<TxnResponse>,
    ctl_rx: Receiver<ControlMessage>,
    tick_rx: Receiver<Instant>,
    sink: Arc<dyn ViolationSink>,
) -> DrainReport {
    let mut tracker = tracker;
    let mut req_rx = req_rx;
    let mut rsp_rx = rsp_rx;
    let mut ctl_rx = ctl_rx;
    let mut tick_rx = tick_rx;
    let mut req_open = true;
    let mut rsp_open = true;
    let mut ctl_open = true;

    loop {
        crossbeam::select! {
            recv(req_rx) -> msg => {
                match msg {
                    Ok(req) => handle_request(&mut tracker, clock.now(), &*sink, req),
                    Err(_) => {
                        req_open = false;
                        req_rx = never();
                    }
                }
            }
            recv(rsp_rx) -> msg => {
                match msg {
                    Ok(rsp) => handle_response(&mut tracker, clock.now(), &*sink, rsp),
                    Err(_) => {
                        rsp_open = false;
                        rsp_rx = never();
                    }
                }
            }
            recv(tick_rx) -> tick => {
                match tick {
                    Ok(_) => {
                        watchdog::scan(&mut tracker, clock.now(), &*sink);
                    }
                    Err(_) => {
                        tick_rx = never();
                    }
                }
            }
            recv(ctl_rx) -> msg => {
                match msg {
                    Ok(ControlMessage::Snapshot { respond }) => {
                        metrics::snapshot_taken();
                        let _ = respond.send(tracker.snapshot(clock.now()));
                    }
                    Ok(ControlMessage::Shutdown { respond }) => {
                        let report = drain(&mut tracker, &clock);
                        let _ = respond.send(report.clone());
                        return report;
                    }
                    Err(_) => {
                        ctl_open = false;
                        ctl_rx = never();
                    }
                }
            }
        }

        if !req_open && !rsp_open && !ctl_open {
            return drain(&mut tracker, &clock);
        }
    }
}

fn handle_request(
    tracker: &mut Tracker,
    now: crate::core::Timestamp,
    sink: &dyn ViolationSink,
    req: TxnRequest,
) {
    let tag = req.tag;
    match tracker.record_request_accept(req, now) {
        RequestOutcome::Admitted { sequence_no } => {
            metrics::request_admitted();
            tracing::debug!(
                target: "scoreboard",
                tag = tag.get(),
                sequence_no = %sequence_no,
                "request admitted"
            );
        }
        RequestOutcome::Rejected(violation) => sink::dispatch(sink, violation),
    }
    metrics::set_total_inflight(tracker.total_inflight());
}

fn handle_response(
    tracker: &mut Tracker,
    now: crate::core::Timestamp,
    sink: &dyn ViolationSink,
    rsp: TxnResponse,
) {
    let tag = rsp.tag;
    match tracker.record_response_accept(rsp, now) {
        ResponseOutcome::Matched {
            sequence_no,
            violations,
        } => {
            metrics::response_matched();
            tracing::debug!(
                target: "scoreboard",
                tag = tag.get(),
                sequence_no = %sequence_no,
                "response matched"
            );
            for violation in violations {
                sink::dispatch(sink, violation);
            }
        }
        ResponseOutcome::Unmatched(violation) => sink::dispatch(sink, violation),
    }
    metrics::set_total_inflight(tracker.total_inflight());
}

fn drain(tracker: &mut Tracker, clock: &Clock) -> DrainReport {
    let report = tracker.drain(clock.now());
    for txn in &report.incomplete {
        tracing::warn!(
            target: "scoreboard",
            tag = txn.tag.get(),
            sequence_no = %txn.sequence_no,
            kind = txn.kind.as_str(),
            addr = %txn.addr,
            age_ms = txn.age_ms,
            "incomplete transaction at drain"
        );
    }
    tracing::info!(
        target: "scoreboard",
        incomplete = report.incomplete.len(),
        total_accepted = report.total_accepted,
        violations = report.violations_emitted,
        "engine drained"
    );
    metrics::set_total_inflight(0);
    report
}
