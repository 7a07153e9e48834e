//! BLE paddle-sensor gateway.
//!
//! Discovers two paddle peripherals, binds them to the LEFT/RIGHT roles and
//! keeps publishing their activity bits to the game loop through a lock-free
//! shared cell. The radio transport itself is supplied by the caller behind
//! the [`Transport`] trait; the game only ever talks to [`PaddleGateway`] and
//! [`PaddleState`].

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::input::{InputSource, ManualInput};
pub use domain::models::{
    DeviceAddress, GatewayEvent, MessageSeverity, PaddleRole, PeripheralDescriptor, RoleBinding,
    StatusMessage, WorkerState,
};
pub use domain::paddle_state::{Direction, PaddleSnapshot, PaddleState};
pub use domain::settings::{BindingStrategy, GatewayConfig, LogSettings, SettingsService};
pub use error::{GatewayError, Result};
pub use infrastructure::gateway::lifecycle::PaddleGateway;
pub use infrastructure::logging::{init_logger, LoggingGuard};
pub use infrastructure::transport::{
    Advertisement, ConnectionHandle, ServiceFilter, SubscriptionHandle, Transport, TransportError,
};
