pub mod gateway;
pub mod logging;
pub mod transport;
