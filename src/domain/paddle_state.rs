//! Shared paddle activity cell.
//!
//! Single writer (the gateway worker), any number of readers (the game polls
//! once per frame). Every accessor returns immediately; the game must never
//! be able to stall on gateway timing.

use crate::domain::models::PaddleRole;
use std::sync::atomic::{AtomicBool, Ordering};

/// Steering direction derived from the two paddle bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Stop,
    Left,
    Right,
    Straight,
}

impl Direction {
    /// Map paddle bits to a steering direction.
    ///
    /// Deliberately inverted: a single-blade stroke on one side turns the
    /// canoe toward the opposite side, so the LEFT paddle alone steers Right
    /// and the RIGHT paddle alone steers Left.
    pub fn from_bits(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => Self::Stop,
            (true, false) => Self::Right,
            (false, true) => Self::Left,
            (true, true) => Self::Straight,
        }
    }
}

/// Point-in-time copy of both activity bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddleSnapshot {
    pub left: bool,
    pub right: bool,
}

impl PaddleSnapshot {
    pub fn direction(&self) -> Direction {
        Direction::from_bits(self.left, self.right)
    }
}

/// The cross-thread cell the worker publishes into.
///
/// The two activity bits are independent signals, so per-field atomics are
/// enough; `ready` is one-shot and only ever transitions unset -> set for the
/// lifetime of the session.
#[derive(Debug, Default)]
pub struct PaddleState {
    left: AtomicBool,
    right: AtomicBool,
    ready: AtomicBool,
}

impl PaddleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer side: record the latest activity observation for a role.
    /// Last write wins; nothing is queued.
    pub fn set(&self, role: PaddleRole, active: bool) {
        match role {
            PaddleRole::Left => self.left.store(active, Ordering::Relaxed),
            PaddleRole::Right => self.right.store(active, Ordering::Relaxed),
        }
    }

    /// Fire the one-shot readiness signal. Safe to call more than once; only
    /// the first call changes anything.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> PaddleSnapshot {
        PaddleSnapshot {
            left: self.left.load(Ordering::Relaxed),
            right: self.right.load(Ordering::Relaxed),
        }
    }

    pub fn direction(&self) -> Direction {
        self.snapshot().direction()
    }
}
