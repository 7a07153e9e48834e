//! Scripted transport fake shared by the gateway unit tests.

use crate::domain::models::{DeviceAddress, PeripheralDescriptor};
use crate::infrastructure::transport::{
    Advertisement, ConnectionHandle, ServiceFilter, SubscriptionHandle, Transport, TransportError,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub fn paddle(address: &str) -> PeripheralDescriptor {
    PeripheralDescriptor {
        address: DeviceAddress::from(address),
        local_name: Some("Thingy Paddle".to_string()),
        service_data: vec![0x00],
    }
}

#[derive(Debug)]
pub struct NotificationSubscription {
    pub address: DeviceAddress,
    pub characteristic: String,
    pub sink: UnboundedSender<Vec<u8>>,
}

#[derive(Debug)]
pub struct WriteRecord {
    pub address: DeviceAddress,
    pub characteristic: String,
    pub payload: Vec<u8>,
    pub require_ack: bool,
}

#[derive(Default)]
struct Inner {
    discover_results: Mutex<VecDeque<Result<Vec<PeripheralDescriptor>, TransportError>>>,
    discover_timeouts: Mutex<Vec<Duration>>,
    hang_discover: AtomicBool,
    block_discover_ms: AtomicU64,
    fail_advertisement_subscribe: AtomicBool,
    adv_sinks: Mutex<Vec<UnboundedSender<Advertisement>>>,
    connections: Mutex<Vec<DeviceAddress>>,
    refuse_connect: Mutex<HashSet<String>>,
    refuse_ack: Mutex<HashSet<String>>,
    writes: Mutex<Vec<WriteRecord>>,
    notification_subs: Mutex<Vec<NotificationSubscription>>,
    stopped_subscriptions: Mutex<Vec<SubscriptionHandle>>,
    disconnected: Mutex<Vec<ConnectionHandle>>,
    next_subscription: AtomicU64,
}

/// Clone-able scripted transport: tests keep one clone for assertions and
/// hand the other to the gateway.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Inner>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next discovery pass. Unscripted passes come
    /// back empty.
    pub fn push_discover(&self, result: Result<Vec<PeripheralDescriptor>, TransportError>) {
        self.inner.discover_results.lock().unwrap().push_back(result);
    }

    /// Make discover never complete (cooperative cancellation path).
    pub fn hang_discover(&self) {
        self.inner.hang_discover.store(true, Ordering::Relaxed);
    }

    /// Make discover block the worker thread outright (forced-detach path).
    pub fn block_discover(&self, duration: Duration) {
        self.inner
            .block_discover_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn fail_advertisement_subscribe(&self) {
        self.inner
            .fail_advertisement_subscribe
            .store(true, Ordering::Relaxed);
    }

    pub fn refuse_connect(&self, address: &str) {
        self.inner
            .refuse_connect
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    /// Writes to this address that require an ack will not be acknowledged.
    pub fn refuse_ack(&self, address: &str) {
        self.inner
            .refuse_ack
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    pub fn discover_timeouts(&self) -> Vec<Duration> {
        self.inner.discover_timeouts.lock().unwrap().clone()
    }

    pub fn advertisement_sink(&self) -> Option<UnboundedSender<Advertisement>> {
        self.inner.adv_sinks.lock().unwrap().last().cloned()
    }

    pub fn notification_sink(&self, address: &str) -> Option<UnboundedSender<Vec<u8>>> {
        self.inner
            .notification_subs
            .lock()
            .unwrap()
            .iter()
            .find(|sub| sub.address.as_str() == address)
            .map(|sub| sub.sink.clone())
    }

    pub fn connected_addresses(&self) -> Vec<DeviceAddress> {
        self.inner.connections.lock().unwrap().clone()
    }

    pub fn writes_to(&self, address: &str) -> Vec<(String, Vec<u8>, bool)> {
        self.inner
            .writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.address.as_str() == address)
            .map(|w| (w.characteristic.clone(), w.payload.clone(), w.require_ack))
            .collect()
    }

    pub fn stopped_subscriptions(&self) -> Vec<SubscriptionHandle> {
        self.inner.stopped_subscriptions.lock().unwrap().clone()
    }

    pub fn disconnected(&self) -> Vec<ConnectionHandle> {
        self.inner.disconnected.lock().unwrap().clone()
    }

    fn address_of(&self, connection: ConnectionHandle) -> DeviceAddress {
        let connections = self.inner.connections.lock().unwrap();
        connections[(connection.0 - 1) as usize].clone()
    }

    fn next_subscription(&self) -> SubscriptionHandle {
        SubscriptionHandle(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl Transport for FakeTransport {
    async fn discover(
        &self,
        timeout: Duration,
        _filter: &ServiceFilter,
    ) -> Result<Vec<PeripheralDescriptor>, TransportError> {
        self.inner.discover_timeouts.lock().unwrap().push(timeout);

        if self.inner.hang_discover.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        let block_ms = self.inner.block_discover_ms.load(Ordering::Relaxed);
        if block_ms > 0 {
            std::thread::sleep(Duration::from_millis(block_ms));
        }

        self.inner
            .discover_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![]))
    }

    async fn subscribe_advertisements(
        &self,
        _filter: &ServiceFilter,
        sink: UnboundedSender<Advertisement>,
    ) -> Result<SubscriptionHandle, TransportError> {
        if self
            .inner
            .fail_advertisement_subscribe
            .load(Ordering::Relaxed)
        {
            return Err(TransportError::Unavailable("scanner busy".into()));
        }
        self.inner.adv_sinks.lock().unwrap().push(sink);
        Ok(self.next_subscription())
    }

    async fn connect(&self, address: &DeviceAddress) -> Result<ConnectionHandle, TransportError> {
        if self
            .inner
            .refuse_connect
            .lock()
            .unwrap()
            .contains(address.as_str())
        {
            return Err(TransportError::ConnectFailed {
                address: address.to_string(),
                reason: "peripheral unreachable".into(),
            });
        }
        let mut connections = self.inner.connections.lock().unwrap();
        connections.push(address.clone());
        Ok(ConnectionHandle(connections.len() as u64))
    }

    async fn write_characteristic(
        &self,
        connection: ConnectionHandle,
        characteristic: &str,
        payload: &[u8],
        require_ack: bool,
    ) -> Result<(), TransportError> {
        let address = self.address_of(connection);
        self.inner.writes.lock().unwrap().push(WriteRecord {
            address: address.clone(),
            characteristic: characteristic.to_string(),
            payload: payload.to_vec(),
            require_ack,
        });

        if require_ack
            && self
                .inner
                .refuse_ack
                .lock()
                .unwrap()
                .contains(address.as_str())
        {
            return Err(TransportError::NotAcknowledged);
        }
        Ok(())
    }

    async fn read_characteristic(
        &self,
        _connection: ConnectionHandle,
        _characteristic: &str,
    ) -> Result<Vec<u8>, TransportError> {
        Ok(vec![])
    }

    async fn subscribe_notifications(
        &self,
        connection: ConnectionHandle,
        characteristic: &str,
        sink: UnboundedSender<Vec<u8>>,
    ) -> Result<SubscriptionHandle, TransportError> {
        let address = self.address_of(connection);
        self.inner
            .notification_subs
            .lock()
            .unwrap()
            .push(NotificationSubscription {
                address,
                characteristic: characteristic.to_string(),
                sink,
            });
        Ok(self.next_subscription())
    }

    async fn disconnect(&self, connection: ConnectionHandle) -> Result<(), TransportError> {
        self.inner.disconnected.lock().unwrap().push(connection);
        Ok(())
    }

    async fn stop_subscription(&self, handle: SubscriptionHandle) -> Result<(), TransportError> {
        self.inner
            .stopped_subscriptions
            .lock()
            .unwrap()
            .push(handle);
        Ok(())
    }
}
