//! Wrapping step cursor.

use serde::{Deserialize, Serialize};

use crate::PATTERN_STEP_MAX;

/// Cursor over a pattern's playable range `[first, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playhead {
    pub position: u8,
    /// Wrap floor; lets a track loop from a non-zero start.
    pub first: u8,
    /// Exclusive wrap ceiling, mirrors the bound pattern's length.
    pub max: u8,
    /// Step size applied by `advance`.
    pub delta: i8,
    /// One-shot offset consumed by the next move.
    pub nudge: i8,
    /// One-shot jump to `first` on the next move.
    pub should_reset: bool,
}

impl Default for Playhead {
    fn default() -> Self {
        Self::new()
    }
}

impl Playhead {
    pub fn new() -> Self {
        Self {
            position: 0,
            first: 0,
            max: PATTERN_STEP_MAX as u8,
            delta: 1,
            nudge: 0,
            should_reset: false,
        }
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    pub fn advance(&mut self) -> u8 {
        self.move_by(self.delta)
    }

    /// Move the cursor and return the new position.
    ///
    /// A pending nudge is applied instead of `delta`. A pending reset wins over
    /// both and lands on `first`; either one-shot is cleared once consumed.
    pub fn move_by(&mut self, delta: i8) -> u8 {
        let nudged = self.nudge != 0;
        if nudged {
            self.position = self.wrap(self.position as i32 + self.nudge as i32);
            self.nudge = 0;
        }

        if self.should_reset {
            self.position = self.first;
            self.should_reset = false;
        } else if !nudged {
            let limit = PATTERN_STEP_MAX as i32;
            let next = self.position as i32 + (delta as i32).clamp(-limit, limit);
            self.position = self.wrap(next);
        }
        self.position
    }

    /// Re-bind the wrap range, e.g. after the pattern length changed.
    ///
    /// `max` is clamped to `1..=PATTERN_STEP_MAX` and `first` below it; a
    /// position that falls outside the new range restarts at `first`.
    pub fn set_range(&mut self, first: u8, max: u8) {
        self.max = max.clamp(1, PATTERN_STEP_MAX as u8);
        self.first = first.min(self.max - 1);
        if self.position < self.first || self.position >= self.max {
            self.position = self.first;
        }
    }

    pub fn set_max(&mut self, max: u8) {
        self.set_range(self.first, max);
    }

    pub fn request_reset(&mut self) {
        self.should_reset = true;
    }

    pub fn request_nudge(&mut self, nudge: i8) {
        self.nudge = nudge;
    }

    /// True when the last move wrapped back to the floor.
    pub fn at_first(&self) -> bool {
        self.position == self.first
    }

    fn wrap(&self, next: i32) -> u8 {
        let first = self.first as i32;
        let span = (self.max as i32 - first).max(1);
        (first + (next - first).rem_euclid(span)) as u8
    }
}
