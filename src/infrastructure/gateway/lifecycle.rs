//! Gateway lifecycle.
//!
//! The game-facing handle: spawns the worker thread, exposes the non-blocking
//! per-frame accessors and guarantees bounded-time, idempotent shutdown.

use crate::domain::models::GatewayEvent;
use crate::domain::paddle_state::{Direction, PaddleSnapshot, PaddleState};
use crate::domain::settings::GatewayConfig;
use crate::infrastructure::gateway::worker::GatewayWorker;
use crate::infrastructure::transport::Transport;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct PaddleGateway {
    state: Arc<PaddleState>,
    events: UnboundedReceiver<GatewayEvent>,
    stop_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

impl PaddleGateway {
    /// Spawn the gateway worker and return immediately.
    ///
    /// Never fails synchronously: if the thread cannot be spawned the gateway
    /// simply never becomes ready, same as any other startup fault.
    pub fn start<T>(transport: T, config: GatewayConfig) -> Self
    where
        T: Transport + Send + 'static,
    {
        let state = Arc::new(PaddleState::new());
        let (event_tx, events) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let stop_timeout = config.stop_timeout();

        let worker = GatewayWorker::new(transport, config, state.clone(), event_tx, stop_rx);
        let handle = thread::Builder::new()
            .name("paddle-gateway".to_string())
            .spawn(move || worker.run());

        let worker = match handle {
            Ok(handle) => {
                info!("gateway worker started");
                Some(handle)
            }
            Err(e) => {
                error!(error = %e, "failed to spawn gateway worker thread");
                None
            }
        };

        Self {
            state,
            events,
            stop_tx,
            worker,
            stop_timeout,
        }
    }

    /// Request shutdown and wait for the worker, at most `stop_timeout`.
    ///
    /// Idempotent: calling again, or on a gateway that never started, is a
    /// no-op. If the worker does not wind down in time it is detached and the
    /// call returns anyway.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        info!("stopping gateway");
        let _ = self.stop_tx.send(true);

        let deadline = Instant::now() + self.stop_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }

        if handle.is_finished() {
            match handle.join() {
                Ok(()) => info!("gateway worker stopped"),
                Err(_) => error!("gateway worker panicked"),
            }
        } else {
            warn!(
                timeout_secs = self.stop_timeout.as_secs(),
                "gateway worker did not stop in time, detaching"
            );
        }
    }

    /// Whether binding completed and paddle state is live. Never blocks.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Latest published activity bits. Never blocks.
    pub fn snapshot(&self) -> PaddleSnapshot {
        self.state.snapshot()
    }

    /// Steering direction derived from the current snapshot. Never blocks.
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Shared handle to the activity cell, for wiring into an input source.
    pub fn paddle_state(&self) -> Arc<PaddleState> {
        self.state.clone()
    }

    /// Drain one pending gateway event, if any. Never blocks; meant to be
    /// called in the consumer's frame loop.
    pub fn poll_event(&mut self) -> Option<GatewayEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for PaddleGateway {
    fn drop(&mut self) {
        self.stop();
    }
}
