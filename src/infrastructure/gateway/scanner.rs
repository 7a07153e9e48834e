//! Paddle discovery.
//!
//! Runs bounded-retry discovery passes against the transport, stretching the
//! timeout on every retry so a slow-to-wake paddle still gets found without
//! making the first attempt sluggish.

use crate::domain::models::{GatewayEvent, PeripheralDescriptor};
use crate::domain::settings::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::infrastructure::transport::{ServiceFilter, Transport};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

pub struct DeviceScanner {
    config: GatewayConfig,
    events: UnboundedSender<GatewayEvent>,
}

impl DeviceScanner {
    pub fn new(config: GatewayConfig, events: UnboundedSender<GatewayEvent>) -> Self {
        Self { config, events }
    }

    /// Scan until a pass finds at least one paddle, or the attempt budget is
    /// spent. Returns exactly the successful pass's set; a pass whose
    /// discover call errors counts as an empty pass.
    pub async fn scan<T: Transport>(&self, transport: &T) -> Result<Vec<PeripheralDescriptor>> {
        let filter = ServiceFilter::new(self.config.service_uuid.clone());
        let max_attempts = self.config.max_attempts();

        for attempt in 1..=max_attempts {
            let timeout = self.config.scan_timeout(attempt);
            info!(
                attempt,
                max_attempts,
                timeout_secs = timeout.as_secs(),
                "scanning for paddles"
            );

            match transport.discover(timeout, &filter).await {
                Ok(devices) if !devices.is_empty() => {
                    info!(count = devices.len(), "found paddles");
                    for device in &devices {
                        debug!(
                            address = %device.address,
                            name = device.local_name.as_deref().unwrap_or("unknown"),
                            "discovered paddle"
                        );
                        let _ = self.events.send(GatewayEvent::DeviceFound(device.clone()));
                    }
                    return Ok(devices);
                }
                Ok(_) => {
                    warn!(attempt, max_attempts, "scan attempt found no paddles");
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "scan attempt failed");
                }
            }
        }

        error!("max scan attempts reached, giving up");
        Err(GatewayError::DeviceNotFound)
    }
}
