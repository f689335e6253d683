//! Raw two-phase clock timer.
//!
//! Independent of the phasor: the timer fires every `period_ms` and alternates
//! between a high and a low phase. Modes that drive outputs from the phasor
//! install [`clock_null`]; the divider mode installs its own callback.

use crate::app::App;

/// Called on every raw clock fire with the new phase level.
pub type ClockCallback = fn(&mut App, bool);

/// Inert clock callback.
pub fn clock_null(_app: &mut App, _high: bool) {}

/// Map a 12-bit clock knob sample to a raw clock period, 1000 ms down to 23 ms.
pub fn adc_clock_period(value: u16) -> u32 {
    25_000 / ((value as u32 >> 2) + 25)
}

#[derive(Clone, Copy)]
pub struct ClockTimer {
    period_ms: u32,
    phase: u8,
    callback: ClockCallback,
}

impl std::fmt::Debug for ClockTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockTimer")
            .field("period_ms", &self.period_ms)
            .field("phase", &self.phase)
            .finish()
    }
}

impl ClockTimer {
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms: period_ms.max(1),
            phase: 0,
            callback: clock_null,
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    pub fn set_period(&mut self, period_ms: u32) {
        self.period_ms = period_ms.max(1);
    }

    pub fn callback(&self) -> ClockCallback {
        self.callback
    }

    pub fn set_callback(&mut self, callback: ClockCallback) {
        self.callback = callback;
    }

    /// Flip the phase. Returns true when the new phase is high.
    pub fn fire(&mut self) -> bool {
        self.phase ^= 1;
        self.phase == 1
    }
}
