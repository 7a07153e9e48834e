//! Gateway error types

use crate::domain::models::PaddleRole;
use crate::infrastructure::transport::TransportError;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Faults the gateway worker can hit between start and steady state.
///
/// Every variant is resolved inside the worker: the game only ever observes
/// a gateway that never becomes ready, plus log entries and events.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no paddle peripherals found after exhausting all scan attempts")]
    DeviceNotFound,

    #[error("need two paddles, discovery produced {found}")]
    InsufficientDevices { found: usize },

    #[error("role configuration write to {role} paddle failed: {reason}")]
    RoleWriteFailed { role: PaddleRole, reason: String },

    #[error("could not establish subscription: {reason}")]
    SubscriptionFailed { reason: String },

    #[error("worker fault: {0}")]
    WorkerFault(#[from] TransportError),
}

impl GatewayError {
    pub fn subscription(reason: impl Into<String>) -> Self {
        Self::SubscriptionFailed {
            reason: reason.into(),
        }
    }

    pub fn role_write(role: PaddleRole, reason: impl Into<String>) -> Self {
        Self::RoleWriteFailed {
            role,
            reason: reason.into(),
        }
    }

    /// Whether the failure is contained to a single role. Role-config write
    /// failures and per-paddle connect failures leave the other role's
    /// binding intact; everything else is fatal to the session.
    pub fn is_per_role(&self) -> bool {
        matches!(
            self,
            Self::RoleWriteFailed { .. } | Self::WorkerFault(TransportError::ConnectFailed { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = GatewayError::InsufficientDevices { found: 1 };
        assert_eq!(err.to_string(), "need two paddles, discovery produced 1");

        let err = GatewayError::role_write(PaddleRole::Right, "no ack");
        assert!(err.to_string().contains("right"));
        assert!(err.to_string().contains("no ack"));
    }

    #[test]
    fn test_per_role_classification() {
        assert!(GatewayError::role_write(PaddleRole::Left, "timeout").is_per_role());
        assert!(GatewayError::WorkerFault(TransportError::ConnectFailed {
            address: "AA:BB".into(),
            reason: "out of range".into(),
        })
        .is_per_role());
        assert!(!GatewayError::DeviceNotFound.is_per_role());
        assert!(!GatewayError::subscription("radio off").is_per_role());
    }
}
