//! Gateway worker.
//!
//! Owns the gateway's execution context: an OS thread with its own
//! current-thread tokio runtime, so scan/connect/subscribe latency can never
//! stall the game's frame loop. Runs the session state machine
//! Idle -> Scanning -> Binding -> Listening -> (Stopped | Failed); the
//! passive strategy skips Scanning since both addresses are already known.

use crate::domain::models::{
    DeviceAddress, GatewayEvent, MessageSeverity, PaddleRole, StatusMessage, WorkerState,
};
use crate::domain::paddle_state::PaddleState;
use crate::domain::settings::{BindingStrategy, GatewayConfig};
use crate::error::Result;
use crate::infrastructure::gateway::binder::{BoundRole, ConnectedSession, PaddleBinder, PassiveSession};
use crate::infrastructure::gateway::scanner::DeviceScanner;
use crate::infrastructure::transport::{ConnectionHandle, SubscriptionHandle, Transport};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct GatewayWorker<T> {
    transport: T,
    config: GatewayConfig,
    state: Arc<PaddleState>,
    events: UnboundedSender<GatewayEvent>,
    stop_rx: watch::Receiver<bool>,
    current: WorkerState,
}

impl<T: Transport> GatewayWorker<T> {
    pub fn new(
        transport: T,
        config: GatewayConfig,
        state: Arc<PaddleState>,
        events: UnboundedSender<GatewayEvent>,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transport,
            config,
            state,
            events,
            stop_rx,
            current: WorkerState::Idle,
        }
    }

    /// Thread entry point. Every fault ends here: logged, turned into a
    /// terminal state, never rethrown at the game.
    pub fn run(mut self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "failed to build gateway runtime");
                self.transition(WorkerState::Failed);
                return;
            }
        };

        runtime.block_on(async {
            match self.run_session().await {
                Ok(()) => self.transition(WorkerState::Stopped),
                Err(e) => {
                    error!(error = %e, "gateway session failed");
                    self.send_log(format!("Gateway failed: {e}"), MessageSeverity::Error);
                    self.transition(WorkerState::Failed);
                }
            }
        });
    }

    pub(crate) async fn run_session(&mut self) -> Result<()> {
        let strategy = self.config.strategy.clone();
        match strategy {
            BindingStrategy::Passive {
                left_address,
                right_address,
            } => self.run_passive(left_address, right_address).await,
            BindingStrategy::DiscoveryOrder => self.run_connected().await,
        }
    }

    async fn run_passive(&mut self, left: DeviceAddress, right: DeviceAddress) -> Result<()> {
        self.transition(WorkerState::Binding);
        let binder = PaddleBinder::new(
            self.config.clone(),
            self.state.clone(),
            self.events.clone(),
        );

        let session = tokio::select! {
            _ = stop_requested(&mut self.stop_rx) => {
                info!("stop requested during binding");
                return Ok(());
            }
            result = binder.bind_passive(&self.transport, left, right) => result?,
        };

        self.transition(WorkerState::Listening);
        let PassiveSession {
            bindings,
            mut advertisements,
            subscription,
        } = session;

        loop {
            tokio::select! {
                _ = stop_requested(&mut self.stop_rx) => {
                    info!("stop requested");
                    break;
                }
                advertisement = advertisements.recv() => match advertisement {
                    Some(advertisement) => binder.handle_advertisement(&bindings, advertisement),
                    None => {
                        warn!("advertisement stream ended");
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.transport.stop_subscription(subscription).await {
            warn!(error = %e, "failed to stop advertisement subscription");
        }
        Ok(())
    }

    async fn run_connected(&mut self) -> Result<()> {
        self.transition(WorkerState::Scanning);
        let scanner = DeviceScanner::new(self.config.clone(), self.events.clone());
        let devices = tokio::select! {
            _ = stop_requested(&mut self.stop_rx) => {
                info!("stop requested during scan");
                return Ok(());
            }
            result = scanner.scan(&self.transport) => result?,
        };

        self.transition(WorkerState::Binding);
        let binder = PaddleBinder::new(
            self.config.clone(),
            self.state.clone(),
            self.events.clone(),
        );
        let session = tokio::select! {
            _ = stop_requested(&mut self.stop_rx) => {
                info!("stop requested during binding");
                return Ok(());
            }
            result = binder.bind_connected(&self.transport, devices) => result?,
        };

        self.transition(WorkerState::Listening);
        let ConnectedSession { left, right } = session;
        let (mut left_rx, left_handles) = split_role(left);
        let (mut right_rx, right_handles) = split_role(right);

        loop {
            tokio::select! {
                _ = stop_requested(&mut self.stop_rx) => {
                    info!("stop requested");
                    break;
                }
                payload = recv_activity(&mut left_rx) => match payload {
                    Some(payload) => binder.apply_activity(PaddleRole::Left, &payload),
                    None => {
                        warn!(role = %PaddleRole::Left, "activity stream ended");
                        left_rx = None;
                    }
                },
                payload = recv_activity(&mut right_rx) => match payload {
                    Some(payload) => binder.apply_activity(PaddleRole::Right, &payload),
                    None => {
                        warn!(role = %PaddleRole::Right, "activity stream ended");
                        right_rx = None;
                    }
                },
            }
        }

        for (connection, subscription) in [left_handles, right_handles].into_iter().flatten() {
            if let Err(e) = self.transport.stop_subscription(subscription).await {
                warn!(error = %e, "failed to stop activity subscription");
            }
            if let Err(e) = self.transport.disconnect(connection).await {
                warn!(error = %e, "failed to disconnect paddle");
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: WorkerState) {
        info!(from = %self.current, to = %next, "worker state changed");
        self.current = next;
        let _ = self.events.send(GatewayEvent::StateChanged(next));
    }

    fn send_log(&self, message: impl Into<String>, severity: MessageSeverity) {
        let _ = self.events.send(GatewayEvent::LogMessage(StatusMessage {
            message: message.into(),
            severity,
        }));
    }
}

/// Resolves when stop is signalled or the lifecycle handle is gone.
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.changed().await;
}

/// A pending-forever future for a role that never bound (or whose stream
/// closed); keeps the select loop shape uniform.
async fn recv_activity(rx: &mut Option<UnboundedReceiver<Vec<u8>>>) -> Option<Vec<u8>> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

type RoleHandles = Option<(ConnectionHandle, SubscriptionHandle)>;

fn split_role(bound: Option<BoundRole>) -> (Option<UnboundedReceiver<Vec<u8>>>, RoleHandles) {
    match bound {
        Some(bound) => (
            Some(bound.notifications),
            Some((bound.connection, bound.subscription)),
        ),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::paddle_state::Direction;
    use crate::error::GatewayError;
    use crate::infrastructure::gateway::testing::{paddle, FakeTransport};
    use crate::infrastructure::transport::Advertisement;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout, Duration};

    const LEFT: &str = "C6:43:EA:BC:7A:D4";
    const RIGHT: &str = "D2:81:05:1F:99:3B";

    fn passive_config() -> GatewayConfig {
        GatewayConfig {
            strategy: BindingStrategy::Passive {
                left_address: DeviceAddress::from(LEFT),
                right_address: DeviceAddress::from(RIGHT),
            },
            ..Default::default()
        }
    }

    struct Harness {
        worker: GatewayWorker<FakeTransport>,
        transport: FakeTransport,
        state: Arc<PaddleState>,
        stop_tx: watch::Sender<bool>,
        events: mpsc::UnboundedReceiver<GatewayEvent>,
    }

    fn harness(config: GatewayConfig) -> Harness {
        let transport = FakeTransport::new();
        let state = Arc::new(PaddleState::new());
        let (event_tx, events) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = GatewayWorker::new(
            transport.clone(),
            config,
            state.clone(),
            event_tx,
            stop_rx,
        );
        Harness {
            worker,
            transport,
            state,
            stop_tx,
            events,
        }
    }

    #[tokio::test]
    async fn test_passive_session_round_trip() {
        let Harness {
            mut worker,
            transport,
            state,
            stop_tx,
            mut events,
        } = harness(passive_config());

        let driver = async {
            while !state.is_ready() {
                sleep(Duration::from_millis(1)).await;
            }
            let sink = transport.advertisement_sink().unwrap();
            sink.send(Advertisement {
                address: DeviceAddress::from(LEFT),
                service_data: vec![0x01],
            })
            .unwrap();
            while state.direction() != Direction::Right {
                sleep(Duration::from_millis(1)).await;
            }
            stop_tx.send(true).unwrap();
        };

        let (result, ()) = timeout(Duration::from_secs(5), async {
            tokio::join!(worker.run_session(), driver)
        })
        .await
        .unwrap();
        result.unwrap();

        // Subscription released on the way out.
        assert_eq!(transport.stopped_subscriptions().len(), 1);

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let GatewayEvent::StateChanged(state) = event {
                states.push(state);
            }
        }
        assert_eq!(states, vec![WorkerState::Binding, WorkerState::Listening]);
    }

    #[tokio::test]
    async fn test_connected_session_fails_without_paddles() {
        let config = GatewayConfig {
            strategy: BindingStrategy::DiscoveryOrder,
            max_scan_attempts: 2,
            ..Default::default()
        };
        let Harness {
            mut worker,
            state,
            // Keep the stop sender alive: dropping it closes the watch
            // channel, which `stop_requested` treats as a stop signal and
            // would race the scan to an early Ok(()).
            stop_tx: _stop_tx,
            ..
        } = harness(config);

        let result = worker.run_session().await;

        assert!(matches!(result, Err(GatewayError::DeviceNotFound)));
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_connected_session_releases_resources_on_stop() {
        let config = GatewayConfig {
            strategy: BindingStrategy::DiscoveryOrder,
            ..Default::default()
        };
        let Harness {
            mut worker,
            transport,
            state,
            stop_tx,
            ..
        } = harness(config);
        transport.push_discover(Ok(vec![paddle(LEFT), paddle(RIGHT)]));

        let driver = async {
            while !state.is_ready() {
                sleep(Duration::from_millis(1)).await;
            }
            let sink = transport.notification_sink(LEFT).unwrap();
            sink.send(vec![0x01]).unwrap();
            while state.direction() != Direction::Right {
                sleep(Duration::from_millis(1)).await;
            }
            stop_tx.send(true).unwrap();
        };

        let (result, ()) = timeout(Duration::from_secs(5), async {
            tokio::join!(worker.run_session(), driver)
        })
        .await
        .unwrap();
        result.unwrap();

        // Both roles cleaned up: two notification subscriptions stopped, two
        // connections released.
        assert_eq!(transport.stopped_subscriptions().len(), 2);
        assert_eq!(transport.disconnected().len(), 2);
    }
}
