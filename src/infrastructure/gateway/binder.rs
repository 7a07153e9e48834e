//! Role binding.
//!
//! Maps paddle peripherals to the LEFT/RIGHT roles and establishes the
//! observation channel for each, using one of two strategies:
//!
//! - **Passive**: both addresses are configured up front; the binder only
//!   subscribes to the filtered advertisement stream and reads activity out
//!   of service data. Ready as soon as the subscription is live.
//! - **Discovery order**: connect to the first two discovered paddles, write
//!   each one its role, subscribe to activity notifications. A failed role
//!   leaves the other role's binding intact; whether that still counts as
//!   ready is the `require_all_roles` policy.

use crate::domain::models::{
    DeviceAddress, GatewayEvent, MessageSeverity, PaddleRole, PeripheralDescriptor, RoleBinding,
    StatusMessage,
};
use crate::domain::paddle_state::PaddleState;
use crate::domain::settings::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::infrastructure::gateway::protocol;
use crate::infrastructure::transport::{
    Advertisement, ConnectionHandle, ServiceFilter, SubscriptionHandle, Transport,
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

/// Result of a successful passive bind.
pub struct PassiveSession {
    pub bindings: [RoleBinding; 2],
    pub advertisements: UnboundedReceiver<Advertisement>,
    pub subscription: SubscriptionHandle,
}

/// One role bound over a live connection.
pub struct BoundRole {
    pub binding: RoleBinding,
    pub connection: ConnectionHandle,
    pub subscription: SubscriptionHandle,
    pub notifications: UnboundedReceiver<Vec<u8>>,
}

/// Result of a connection-strategy bind. A `None` role failed binding and
/// will never report activity this session.
pub struct ConnectedSession {
    pub left: Option<BoundRole>,
    pub right: Option<BoundRole>,
}

impl ConnectedSession {
    fn bound_count(&self) -> usize {
        usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }
}

pub struct PaddleBinder {
    config: GatewayConfig,
    state: Arc<PaddleState>,
    events: UnboundedSender<GatewayEvent>,
}

impl PaddleBinder {
    pub fn new(
        config: GatewayConfig,
        state: Arc<PaddleState>,
        events: UnboundedSender<GatewayEvent>,
    ) -> Self {
        Self {
            config,
            state,
            events,
        }
    }

    /// Passive strategy: subscribe to the filtered advertisement stream and
    /// fire readiness. No round trip to any paddle is required first.
    pub async fn bind_passive<T: Transport>(
        &self,
        transport: &T,
        left: DeviceAddress,
        right: DeviceAddress,
    ) -> Result<PassiveSession> {
        let filter = ServiceFilter::new(self.config.service_uuid.clone());
        let (tx, rx) = mpsc::unbounded_channel();

        let subscription = transport
            .subscribe_advertisements(&filter, tx)
            .await
            .map_err(|e| GatewayError::subscription(e.to_string()))?;

        info!(left = %left, right = %right, "advertisement stream active, paddles bound");
        self.send_log("Paddles ready", MessageSeverity::Success);
        self.state.mark_ready();

        Ok(PassiveSession {
            bindings: [
                RoleBinding {
                    role: PaddleRole::Left,
                    address: left,
                },
                RoleBinding {
                    role: PaddleRole::Right,
                    address: right,
                },
            ],
            advertisements: rx,
            subscription,
        })
    }

    /// Route one received advertisement into the shared state. Addresses
    /// outside the two bindings are ignored.
    pub fn handle_advertisement(&self, bindings: &[RoleBinding; 2], advertisement: Advertisement) {
        let Some(binding) = bindings
            .iter()
            .find(|b| b.address == advertisement.address)
        else {
            trace!(address = %advertisement.address, "ignoring advertisement from unbound address");
            return;
        };
        self.apply_activity(binding.role, &advertisement.service_data);
    }

    /// Connection strategy: bind the first two discovered paddles in
    /// discovery order (first = LEFT, second = RIGHT).
    pub async fn bind_connected<T: Transport>(
        &self,
        transport: &T,
        devices: Vec<PeripheralDescriptor>,
    ) -> Result<ConnectedSession> {
        if devices.len() < 2 {
            return Err(GatewayError::InsufficientDevices {
                found: devices.len(),
            });
        }
        if devices.len() > 2 {
            debug!(extra = devices.len() - 2, "more paddles than roles, using the first two");
        }

        let assignments = [
            (PaddleRole::Left, devices[0].clone()),
            (PaddleRole::Right, devices[1].clone()),
        ];

        let mut session = ConnectedSession {
            left: None,
            right: None,
        };
        let mut last_role_error = None;

        for (role, descriptor) in assignments {
            match self.bind_role(transport, role, descriptor).await {
                Ok(bound) => match role {
                    PaddleRole::Left => session.left = Some(bound),
                    PaddleRole::Right => session.right = Some(bound),
                },
                Err(e) if e.is_per_role() => {
                    warn!(role = %role, error = %e, "role binding failed, other role continues");
                    self.send_log(
                        format!("{role} paddle unavailable: {e}"),
                        MessageSeverity::Warning,
                    );
                    last_role_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let bound = session.bound_count();
        if bound == 0 || (self.config.require_all_roles && bound < 2) {
            return Err(last_role_error.unwrap_or(GatewayError::InsufficientDevices { found: 0 }));
        }

        info!(bound, "paddle binding complete");
        self.send_log("Paddles ready", MessageSeverity::Success);
        self.state.mark_ready();

        Ok(session)
    }

    async fn bind_role<T: Transport>(
        &self,
        transport: &T,
        role: PaddleRole,
        descriptor: PeripheralDescriptor,
    ) -> Result<BoundRole> {
        let address = descriptor.address;
        info!(role = %role, address = %address, "binding paddle");

        let connection = transport.connect(&address).await?;

        // The paddle must acknowledge its role before we trust its reports.
        if let Err(e) = transport
            .write_characteristic(
                connection,
                protocol::ROLE_CONFIG_CHAR_UUID,
                &protocol::role_config_payload(role),
                true,
            )
            .await
        {
            let _ = transport.disconnect(connection).await;
            return Err(GatewayError::role_write(role, e.to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = match transport
            .subscribe_notifications(connection, protocol::ACTIVITY_CHAR_UUID, tx)
            .await
        {
            Ok(subscription) => subscription,
            Err(e) => {
                let _ = transport.disconnect(connection).await;
                return Err(GatewayError::subscription(e.to_string()));
            }
        };

        info!(role = %role, "role configured, observing activity");
        Ok(BoundRole {
            binding: RoleBinding { role, address },
            connection,
            subscription,
            notifications: rx,
        })
    }

    /// Route one activity payload (notification or service data) into the
    /// shared state.
    pub fn apply_activity(&self, role: PaddleRole, payload: &[u8]) {
        match protocol::parse_activity(payload) {
            Some(active) => {
                trace!(role = %role, active, "activity update");
                self.state.set(role, active);
            }
            None => debug!(role = %role, "ignoring empty activity payload"),
        }
    }

    fn send_log(&self, message: impl Into<String>, severity: MessageSeverity) {
        let _ = self.events.send(GatewayEvent::LogMessage(StatusMessage {
            message: message.into(),
            severity,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeviceAddress;
    use crate::domain::paddle_state::Direction;
    use crate::infrastructure::gateway::testing::{paddle, FakeTransport};

    const LEFT: &str = "C6:43:EA:BC:7A:D4";
    const RIGHT: &str = "D2:81:05:1F:99:3B";

    fn binder(config: GatewayConfig) -> (PaddleBinder, Arc<PaddleState>) {
        let state = Arc::new(PaddleState::new());
        let (events, _rx) = mpsc::unbounded_channel();
        (PaddleBinder::new(config, state.clone(), events), state)
    }

    #[tokio::test]
    async fn test_passive_bind_is_ready_before_any_advertisement() {
        let transport = FakeTransport::new();
        let (binder, state) = binder(GatewayConfig::default());

        let session = binder
            .bind_passive(&transport, DeviceAddress::from(LEFT), DeviceAddress::from(RIGHT))
            .await
            .unwrap();

        assert!(state.is_ready());
        assert_eq!(session.bindings[0].role, PaddleRole::Left);
        assert!(transport.advertisement_sink().is_some());
    }

    #[tokio::test]
    async fn test_passive_bind_subscription_failure() {
        let transport = FakeTransport::new();
        transport.fail_advertisement_subscribe();
        let (binder, state) = binder(GatewayConfig::default());

        let result = binder
            .bind_passive(&transport, DeviceAddress::from(LEFT), DeviceAddress::from(RIGHT))
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::SubscriptionFailed { .. })
        ));
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_advertisements_drive_state() {
        let transport = FakeTransport::new();
        let (binder, state) = binder(GatewayConfig::default());
        let session = binder
            .bind_passive(&transport, DeviceAddress::from(LEFT), DeviceAddress::from(RIGHT))
            .await
            .unwrap();

        // LEFT paddling, RIGHT idle.
        binder.handle_advertisement(
            &session.bindings,
            Advertisement {
                address: DeviceAddress::from(LEFT),
                service_data: vec![0x01],
            },
        );
        binder.handle_advertisement(
            &session.bindings,
            Advertisement {
                address: DeviceAddress::from(RIGHT),
                service_data: vec![0x00],
            },
        );

        let snapshot = state.snapshot();
        assert!(snapshot.left);
        assert!(!snapshot.right);
        assert_eq!(state.direction(), Direction::Right);
    }

    #[tokio::test]
    async fn test_unbound_addresses_and_empty_payloads_are_ignored() {
        let transport = FakeTransport::new();
        let (binder, state) = binder(GatewayConfig::default());
        let session = binder
            .bind_passive(&transport, DeviceAddress::from(LEFT), DeviceAddress::from(RIGHT))
            .await
            .unwrap();

        binder.handle_advertisement(
            &session.bindings,
            Advertisement {
                address: DeviceAddress::from("FF:FF:FF:FF:FF:FF"),
                service_data: vec![0x01],
            },
        );
        binder.handle_advertisement(
            &session.bindings,
            Advertisement {
                address: DeviceAddress::from(LEFT),
                service_data: vec![],
            },
        );

        assert_eq!(state.direction(), Direction::Stop);
    }

    #[tokio::test]
    async fn test_connected_bind_requires_two_paddles() {
        let transport = FakeTransport::new();
        let (binder, state) = binder(GatewayConfig::default());

        let result = binder.bind_connected(&transport, vec![paddle(LEFT)]).await;

        assert!(matches!(
            result,
            Err(GatewayError::InsufficientDevices { found: 1 })
        ));
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_connected_bind_configures_roles_in_discovery_order() {
        let transport = FakeTransport::new();
        let (binder, state) = binder(GatewayConfig::default());

        let session = binder
            .bind_connected(&transport, vec![paddle(LEFT), paddle(RIGHT)])
            .await
            .unwrap();

        let left_role = session.left.as_ref().unwrap();
        assert_eq!(left_role.binding.role, PaddleRole::Left);
        assert_eq!(left_role.binding.address.as_str(), LEFT);
        let right_role = session.right.as_ref().unwrap();
        assert_eq!(right_role.binding.address.as_str(), RIGHT);
        assert!(state.is_ready());

        let left_writes = transport.writes_to(LEFT);
        assert_eq!(
            left_writes,
            vec![(
                protocol::ROLE_CONFIG_CHAR_UUID.to_string(),
                protocol::role_config_payload(PaddleRole::Left).to_vec(),
                true
            )]
        );
        let right_writes = transport.writes_to(RIGHT);
        assert_eq!(
            right_writes[0].1,
            protocol::role_config_payload(PaddleRole::Right).to_vec()
        );
    }

    #[tokio::test]
    async fn test_role_write_failure_spares_the_other_role() {
        let transport = FakeTransport::new();
        transport.refuse_ack(RIGHT);
        let (binder, state) = binder(GatewayConfig::default());

        let session = binder
            .bind_connected(&transport, vec![paddle(LEFT), paddle(RIGHT)])
            .await
            .unwrap();

        assert!(session.left.is_some());
        assert!(session.right.is_none());
        // Default policy: one healthy paddle is enough.
        assert!(state.is_ready());
        assert!(transport.notification_sink(LEFT).is_some());
        assert!(transport.notification_sink(RIGHT).is_none());
    }

    #[tokio::test]
    async fn test_require_all_roles_makes_partial_binding_fatal() {
        let transport = FakeTransport::new();
        transport.refuse_ack(RIGHT);
        let config = GatewayConfig {
            require_all_roles: true,
            ..Default::default()
        };
        let (binder, state) = binder(config);

        let result = binder
            .bind_connected(&transport, vec![paddle(LEFT), paddle(RIGHT)])
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::RoleWriteFailed {
                role: PaddleRole::Right,
                ..
            })
        ));
        assert!(!state.is_ready());
    }

    #[tokio::test]
    async fn test_zero_bound_roles_is_always_fatal() {
        let transport = FakeTransport::new();
        transport.refuse_connect(LEFT);
        transport.refuse_connect(RIGHT);
        let (binder, state) = binder(GatewayConfig::default());

        let result = binder
            .bind_connected(&transport, vec![paddle(LEFT), paddle(RIGHT)])
            .await;

        assert!(result.is_err());
        assert!(!state.is_ready());
    }
}
