//! Wireless transport collaborator.
//!
//! The gateway does not carry a BLE stack of its own; the host application
//! supplies one behind [`Transport`]. Advertisement and notification streams
//! are delivered through unbounded channel sinks handed over at subscription
//! time, so transport callbacks never run gateway logic on the radio's
//! threads.

use crate::domain::models::{DeviceAddress, PeripheralDescriptor};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Opaque service signature used to narrow discovery and advertisements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter(pub String);

impl ServiceFilter {
    pub fn new(filter: impl Into<String>) -> Self {
        Self(filter.into())
    }
}

/// A single received advertisement from a filtered stream.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub address: DeviceAddress,
    pub service_data: Vec<u8>,
}

/// Handle to an open connection, owned by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle(pub u64);

/// Handle to an active advertisement or notification subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(pub u64);

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("radio unavailable: {0}")]
    Unavailable(String),

    #[error("connect to {address} failed: {reason}")]
    ConnectFailed { address: String, reason: String },

    #[error("characteristic write was not acknowledged")]
    NotAcknowledged,

    #[error("{0}")]
    Other(String),
}

/// Capability set the gateway expects from the host's wireless stack.
///
/// The worker is generic over its transport; no trait objects, so plain
/// `async fn` methods are fine here.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// One bounded discovery pass. Returns every matching peripheral seen
    /// before the timeout elapses.
    async fn discover(
        &self,
        timeout: Duration,
        filter: &ServiceFilter,
    ) -> Result<Vec<PeripheralDescriptor>, TransportError>;

    /// Start a continuous filtered advertisement stream into `sink`.
    async fn subscribe_advertisements(
        &self,
        filter: &ServiceFilter,
        sink: UnboundedSender<Advertisement>,
    ) -> Result<SubscriptionHandle, TransportError>;

    async fn connect(&self, address: &DeviceAddress) -> Result<ConnectionHandle, TransportError>;

    /// Write `payload` to a characteristic. With `require_ack` the call only
    /// succeeds once the peripheral acknowledged the write.
    async fn write_characteristic(
        &self,
        connection: ConnectionHandle,
        characteristic: &str,
        payload: &[u8],
        require_ack: bool,
    ) -> Result<(), TransportError>;

    async fn read_characteristic(
        &self,
        connection: ConnectionHandle,
        characteristic: &str,
    ) -> Result<Vec<u8>, TransportError>;

    /// Subscribe to change notifications on a characteristic, delivered as
    /// raw payloads into `sink`.
    async fn subscribe_notifications(
        &self,
        connection: ConnectionHandle,
        characteristic: &str,
        sink: UnboundedSender<Vec<u8>>,
    ) -> Result<SubscriptionHandle, TransportError>;

    async fn disconnect(&self, connection: ConnectionHandle) -> Result<(), TransportError>;

    async fn stop_subscription(&self, handle: SubscriptionHandle) -> Result<(), TransportError>;
}
