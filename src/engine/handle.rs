//! Engine front door.
//!
//! `start` wires the channels, spawns the loop thread, and returns the
//! handle producers drive. The tracker itself never leaves the loop thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Sender};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::core::{DrainReport, Snapshot, Tracker, TxnRequest, TxnResponse};

use super::clock::Clock;
use super::server::{run_engine_loop, ControlMessage};
use super::sink::ViolationSink;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EngineError {
    #[error("engine thread has stopped")]
    Stopped,

    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Start an engine with the given config and violation sink.
///
/// Fails only on misconfiguration or thread spawn failure; after this,
/// nothing the engine observes is fatal.
pub fn start(config: EngineConfig, sink: Arc<dyn ViolationSink>) -> crate::Result<EngineHandle> {
    let tracker = Tracker::new(&config)?;
    let clock = Clock::new();

    let (req_tx, req_rx) = channel::unbounded();
    let (rsp_tx, rsp_rx) = channel::unbounded();
    let (ctl_tx, ctl_rx) = channel::unbounded();
    let tick_rx = channel::tick(config.watchdog_period());

    let join = std::thread::Builder::new()
        .name("scoreboard-engine".to_string())
        .spawn(move || run_engine_loop(tracker, clock, req_rx, rsp_rx, ctl_rx, tick_rx, sink))
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle {
        req_tx,
        rsp_tx,
        ctl_tx,
        join: Some(join),
    })
}

/// Handle to a running engine.
///
/// Dropping the handle without calling `shutdown` disconnects all inbound
/// channels; the loop drains, logs the report, and exits on its own.
pub struct EngineHandle {
    req_tx: Sender<TxnRequest>,
    rsp_tx: Sender<TxnResponse>,
    ctl_tx: Sender<ControlMessage>,
    join: Option<JoinHandle<DrainReport>>,
}

impl EngineHandle {
    /// Feed one accepted request.
    pub fn request_accepted(&self, req: TxnRequest) -> Result<(), EngineError> {
        self.req_tx.send(req).map_err(|_| EngineError::Stopped)
    }

    /// Feed one accepted response.
    pub fn response_accepted(&self, rsp: TxnResponse) -> Result<(), EngineError> {
        self.rsp_tx.send(rsp).map_err(|_| EngineError::Stopped)
    }

    /// Cloneable sender for the request-observer side.
    pub fn request_sender(&self) -> Sender<TxnRequest> {
        self.req_tx.clone()
    }

    /// Cloneable sender for the response-observer side.
    pub fn response_sender(&self) -> Sender<TxnResponse> {
        self.rsp_tx.clone()
    }

    /// Point-in-time view of all pending state.
    pub fn snapshot(&self) -> Result<Snapshot, EngineError> {
        let (respond_tx, respond_rx) = channel::bounded(1);
        self.ctl_tx
            .send(ControlMessage::Snapshot {
                respond: respond_tx,
            })
            .map_err(|_| EngineError::Stopped)?;
        respond_rx.recv().map_err(|_| EngineError::Stopped)
    }

    /// Stop the engine and collect the final drain report.
    pub fn shutdown(mut self) -> Result<DrainReport, EngineError> {
        let (respond_tx, respond_rx) = channel::bounded(1);
        let sent = self
            .ctl_tx
            .send(ControlMessage::Shutdown {
                respond: respond_tx,
            })
            .is_ok();
        if sent {
            if let Ok(report) = respond_rx.recv() {
                if let Some(join) = self.join.take() {
                    let _ = join.join();
                }
                return Ok(report);
            }
        }
        // The loop already exited; recover its report from the thread.
        match self.join.take() {
            Some(join) => join.join().map_err(|_| EngineError::Stopped),
            None => Err(EngineError::Stopped),
        }
    }
}
