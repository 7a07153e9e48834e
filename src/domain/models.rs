use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical paddle role. The gateway always binds exactly these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaddleRole {
    Left,
    Right,
}

impl fmt::Display for PaddleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Opaque peripheral identity as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress(pub String);

impl DeviceAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// A peripheral seen during discovery. Transient: only lives through the
/// binding phase.
#[derive(Debug, Clone)]
pub struct PeripheralDescriptor {
    pub address: DeviceAddress,
    pub local_name: Option<String>,
    pub service_data: Vec<u8>,
}

/// Association of a role to the peripheral serving it, fixed for the session.
#[derive(Debug, Clone)]
pub struct RoleBinding {
    pub role: PaddleRole,
    pub address: DeviceAddress,
}

/// Gateway worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Scanning,
    Binding,
    Listening,
    Stopped,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Binding => "binding",
            Self::Listening => "listening",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Events published by the worker for the consumer to drain per frame.
///
/// Purely observational; the activity data path is `PaddleState`.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    StateChanged(WorkerState),
    DeviceFound(PeripheralDescriptor),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
