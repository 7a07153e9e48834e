//! Input source selection.
//!
//! The game steers from exactly one source per session. Each variant answers
//! `direction()` through the same truth table so the canoe handles the same
//! whether the input is paddle hardware or a keyboard.

use crate::domain::paddle_state::{Direction, PaddleState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Two-button input fed by the consumer's own event loop (keyboard, gamepad).
///
/// The game reports raw key-held bits; the left/right inversion is applied
/// here, not at the key handler.
#[derive(Debug, Default)]
pub struct ManualInput {
    left_held: AtomicBool,
    right_held: AtomicBool,
}

impl ManualInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_held(&self, left: bool, right: bool) {
        self.left_held.store(left, Ordering::Relaxed);
        self.right_held.store(right, Ordering::Relaxed);
    }

    pub fn direction(&self) -> Direction {
        Direction::from_bits(
            self.left_held.load(Ordering::Relaxed),
            self.right_held.load(Ordering::Relaxed),
        )
    }
}

/// The fixed set of input sources the game can run with.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// No input bound; the canoe drifts.
    Inactive,
    /// Paddle hardware via the gateway.
    Paddles(Arc<PaddleState>),
    /// Consumer-fed two-button input.
    Manual(Arc<ManualInput>),
}

impl InputSource {
    /// Current steering direction. Non-blocking for every variant.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Inactive => Direction::Stop,
            Self::Paddles(state) => state.direction(),
            Self::Manual(input) => input.direction(),
        }
    }

    /// Whether the source is ready to steer. Manual input always is; paddles
    /// only once the gateway finished binding.
    pub fn is_ready(&self) -> bool {
        match self {
            Self::Inactive => false,
            Self::Paddles(state) => state.is_ready(),
            Self::Manual(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PaddleRole;

    #[test]
    fn test_inactive_source() {
        let source = InputSource::Inactive;
        assert_eq!(source.direction(), Direction::Stop);
        assert!(!source.is_ready());
    }

    #[test]
    fn test_manual_source_uses_same_truth_table() {
        let input = Arc::new(ManualInput::new());
        let source = InputSource::Manual(input.clone());
        assert!(source.is_ready());
        assert_eq!(source.direction(), Direction::Stop);

        input.set_held(true, false);
        assert_eq!(source.direction(), Direction::Right);

        input.set_held(true, true);
        assert_eq!(source.direction(), Direction::Straight);
    }

    #[test]
    fn test_paddle_source_tracks_gateway_state() {
        let state = Arc::new(PaddleState::new());
        let source = InputSource::Paddles(state.clone());
        assert!(!source.is_ready());

        state.set(PaddleRole::Right, true);
        state.mark_ready();
        assert!(source.is_ready());
        assert_eq!(source.direction(), Direction::Left);
    }
}
