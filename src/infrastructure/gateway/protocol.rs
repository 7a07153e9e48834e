//! Paddle sensor protocol.
//!
//! The paddles are Nordic Thingy sensors running the paddle firmware. They
//! expose one service carrying a role-configuration characteristic (written
//! once during binding) and an activity characteristic (notified on every
//! stroke state change). The same activity byte also rides in the service
//! data of their advertisements, which is what the passive strategy reads.

use crate::domain::models::PaddleRole;

/// Paddle service UUID (Thingy motion service).
pub const PADDLE_SERVICE_UUID: &str = "ef680400-9b35-4933-9b10-52ffa9740042";

/// Role configuration characteristic - written during binding, ack required.
pub const ROLE_CONFIG_CHAR_UUID: &str = "ef680401-9b35-4933-9b10-52ffa9740042";

/// Activity characteristic - notifies the stroke state.
pub const ACTIVITY_CHAR_UUID: &str = "ef680405-9b35-4933-9b10-52ffa9740042";

/// Role configuration values accepted by the firmware.
const ROLE_CONFIG_LEFT: u8 = 0x01;
const ROLE_CONFIG_RIGHT: u8 = 0x02;

/// Payload written to the role-config characteristic for a role.
pub fn role_config_payload(role: PaddleRole) -> [u8; 1] {
    match role {
        PaddleRole::Left => [ROLE_CONFIG_LEFT],
        PaddleRole::Right => [ROLE_CONFIG_RIGHT],
    }
}

/// Extract the "is paddling" bit from an activity payload.
///
/// # Payload layout
///
/// ```text
/// [0]    : activity byte
///          bit 0: paddle stroke in progress
///          bits 1-7: reserved
/// [1..]  : optional sensor detail (ignored here)
/// ```
///
/// The same layout is used for notification payloads and for advertisement
/// service data. Returns `None` for an empty payload.
pub fn parse_activity(payload: &[u8]) -> Option<bool> {
    let byte = payload.first()?;
    Some(byte & 0x01 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activity() {
        assert_eq!(parse_activity(&[0x01]), Some(true));
        assert_eq!(parse_activity(&[0x00]), Some(false));
        // Reserved bits don't leak into the activity bit.
        assert_eq!(parse_activity(&[0xFE]), Some(false));
        assert_eq!(parse_activity(&[0x03, 0x42]), Some(true));
    }

    #[test]
    fn test_parse_activity_empty_payload() {
        assert_eq!(parse_activity(&[]), None);
    }

    #[test]
    fn test_role_config_payloads_differ() {
        assert_ne!(
            role_config_payload(PaddleRole::Left),
            role_config_payload(PaddleRole::Right)
        );
    }
}
