//! High-resolution phase ramp driven by a periodic timer.
//!
//! The phasor only models the timer's configuration and the tick counter. The
//! platform (or the simulator) calls [`App::phasor_fire`](crate::app::App::phasor_fire)
//! every `period_us()` while the phasor is running; that advances the counter
//! here and forwards `(tick, reset)` to the installed callback.

use crate::app::App;
use transit_types::PPQ;

/// Per-tick hook. Runs in timer context and must stay short.
pub type PhasorCallback = fn(&mut App, u8, bool);

/// One timer fire: the new tick and whether it follows a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhasorTick {
    pub tick: u8,
    pub reset: bool,
}

#[derive(Clone)]
pub struct Phasor {
    tick: u8,
    resolution: u8,
    frequency: u16,
    running: bool,
    pending_reset: bool,
    callback: Option<PhasorCallback>,
}

impl std::fmt::Debug for Phasor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phasor")
            .field("tick", &self.tick)
            .field("resolution", &self.resolution)
            .field("frequency", &self.frequency)
            .field("running", &self.running)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for Phasor {
    fn default() -> Self {
        Self::new()
    }
}

impl Phasor {
    pub fn new() -> Self {
        Self {
            tick: 0,
            resolution: PPQ,
            frequency: 0,
            running: false,
            pending_reset: false,
            callback: None,
        }
    }

    /// Configure a timer firing at `frequency * resolution` Hz. The next fire
    /// delivers tick 0 flagged as a reset.
    pub fn setup(&mut self, frequency: u16, resolution: u8) {
        self.frequency = frequency;
        self.resolution = resolution.max(1);
        self.reset();
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Disable the timer. Takes effect before returning; no further fires are delivered.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Install the per-tick hook; last write wins, `None` detaches it.
    pub fn set_callback(&mut self, callback: Option<PhasorCallback>) {
        self.callback = callback;
    }

    pub fn callback(&self) -> Option<PhasorCallback> {
        self.callback
    }

    /// Change the cycle frequency without disturbing the tick position.
    /// Returns the applied frequency.
    pub fn set_frequency(&mut self, frequency: u16) -> u16 {
        self.frequency = frequency;
        log::debug!(target: "phasor", "frequency {} Hz, tick period {} us", frequency, self.period_us());
        self.frequency
    }

    /// Restart the cycle: the next fire delivers tick 0 flagged as a reset.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.pending_reset = true;
    }

    /// Advance one tick. Returns `None` while stopped.
    pub fn fire(&mut self) -> Option<PhasorTick> {
        if !self.running {
            return None;
        }
        let reset = std::mem::take(&mut self.pending_reset);
        if reset {
            self.tick = 0;
        } else {
            self.tick += 1;
            if self.tick >= self.resolution {
                self.tick = 0;
            }
        }
        Some(PhasorTick {
            tick: self.tick,
            reset,
        })
    }

    pub fn tick(&self) -> u8 {
        self.tick
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    /// Timer rate in Hz.
    pub fn tick_hz(&self) -> u32 {
        self.frequency as u32 * self.resolution as u32
    }

    /// Microseconds between fires; zero when unconfigured.
    pub fn period_us(&self) -> u64 {
        match self.tick_hz() {
            0 => 0,
            hz => 1_000_000 / hz as u64,
        }
    }
}
