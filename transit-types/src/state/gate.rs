//! Gate window descriptors for the divisor outputs.

use serde::{Deserialize, Serialize};

use crate::{MAX_PERIOD, MAX_PHASE, MAX_WIDTH};

/// A repeating gate window measured in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Ticks the window is rotated forward from the start of the period.
    pub phase: u16,
    /// Ticks the gate stays high.
    pub width: u16,
    /// Ticks per cycle.
    pub period: u16,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            phase: 0,
            width: MAX_WIDTH >> 1,
            period: MAX_PERIOD,
        }
    }
}

impl Gate {
    /// Build a gate with every field clamped into its base range.
    ///
    /// The phase always lands inside the period.
    pub fn clamped(phase: u16, width: u16, period: u16) -> Self {
        let period = period.clamp(1, MAX_PERIOD);
        Self {
            phase: phase.min(MAX_PHASE).min(period - 1),
            width: width.clamp(1, MAX_WIDTH),
            period,
        }
    }

    /// Every field multiplied by `divisor`.
    pub fn scaled(&self, divisor: u8) -> Self {
        let d = divisor as u16;
        Self {
            phase: self.phase * d,
            width: self.width * d,
            period: self.period * d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_limits_each_field() {
        let g = Gate::clamped(500, 0, 0);
        assert_eq!(g, Gate { phase: MAX_PHASE, width: 1, period: 1 });
        let g = Gate::clamped(3, 400, 400);
        assert_eq!(g, Gate { phase: 3, width: MAX_WIDTH, period: MAX_PERIOD });
    }

    #[test]
    fn clamped_keeps_phase_inside_period() {
        let g = Gate::clamped(40, 4, 16);
        assert_eq!(g, Gate { phase: 15, width: 4, period: 16 });
        assert_eq!(Gate::clamped(10, 1, 0).phase, 0);
    }

    #[test]
    fn scaled_multiplies_all_fields() {
        let g = Gate::clamped(16, 8, 64).scaled(16);
        assert_eq!(g, Gate { phase: 256, width: 128, period: 1024 });
    }
}
