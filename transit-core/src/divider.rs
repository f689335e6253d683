//! Divisor gate engine.
//!
//! Every output runs its own gate window against the shared phasor. The
//! window's base `(phase, width, period)` is multiplied by the output's clock
//! divisor, and each output keeps a local tick counter over the scaled period.
//! Divisor edits travel through a mailbox and take effect on the next base
//! cycle boundary so a gate is never cut mid-window.

use transit_types::{Gate, OutputSettings, MAX_DIVISOR, MAX_PHASE, MAX_WIDTH, OUTPUT_COUNT};

use crate::hardware::OutputPins;
use crate::mailbox::Mailbox;

#[derive(Debug)]
pub struct DivisorOutput {
    divisor: u8,
    pub selected: bool,
    base: Gate,
    effective: Gate,
    divisor_change: Mailbox,
    /// Local tick count in `[0, effective.period)`.
    now: u16,
    fired: bool,
}

impl Default for DivisorOutput {
    fn default() -> Self {
        Self::from_settings(&OutputSettings::default())
    }
}

impl DivisorOutput {
    pub fn from_settings(settings: &OutputSettings) -> Self {
        let divisor = clamp_divisor(settings.divisor);
        let base = Gate::clamped(settings.base.phase, settings.base.width, settings.base.period);
        Self {
            divisor,
            selected: false,
            base,
            effective: base.scaled(divisor),
            divisor_change: Mailbox::new(),
            now: 0,
            fired: false,
        }
    }

    /// Persistable settings. A queued divisor counts as the current one.
    pub fn settings(&self) -> OutputSettings {
        OutputSettings {
            divisor: self.pending_divisor().unwrap_or(self.divisor),
            base: self.base,
        }
    }

    pub fn divisor(&self) -> u8 {
        self.divisor
    }

    /// Divisor queued for the next cycle boundary, if any.
    pub fn pending_divisor(&self) -> Option<u8> {
        self.divisor_change.peek().map(|d| d as u8)
    }

    pub fn base(&self) -> Gate {
        self.base
    }

    pub fn effective(&self) -> Gate {
        self.effective
    }

    pub fn now(&self) -> u16 {
        self.now
    }

    pub fn set_phase(&mut self, phase: u16) {
        self.base.phase = phase.min(MAX_PHASE).min(self.base.period - 1);
        self.effective.phase = self.base.phase * self.divisor as u16;
    }

    pub fn set_width(&mut self, width: u16) {
        self.base.width = width.clamp(1, MAX_WIDTH);
        self.effective.width = self.base.width * self.divisor as u16;
    }

    /// Queue a divisor change; the latest queued value wins.
    pub fn queue_divisor(&self, divisor: u8) {
        self.divisor_change.post(clamp_divisor(divisor) as u16);
    }

    /// Apply a queued divisor change. Returns true if one was pending.
    fn apply_pending(&mut self) -> bool {
        match self.divisor_change.take() {
            Some(d) => {
                self.divisor = clamp_divisor(d as u8);
                self.effective = self.base.scaled(self.divisor);
                self.now %= self.effective.period.max(1);
                true
            }
            None => false,
        }
    }

    /// Drop the output and restart its window.
    pub fn restart(&mut self, index: usize, pins: &mut dyn OutputPins) {
        pins.clear(index);
        self.now = 0;
        self.fired = false;
    }

    fn step(&mut self, index: usize, pins: &mut dyn OutputPins) {
        // phase rotates the window, so an early start wraps to the period's end
        let period = self.effective.period.max(1) as i32;
        let n = (self.now as i32 - self.effective.phase as i32).rem_euclid(period);

        let width = self.effective.width as i32;
        if !self.fired && n < width {
            pins.set(index);
            self.fired = true;
        } else if self.fired && n >= width {
            pins.clear(index);
            self.fired = false;
        }

        self.now += 1;
        if self.now >= self.effective.period {
            self.now = 0;
        }
    }
}

fn clamp_divisor(divisor: u8) -> u8 {
    divisor.clamp(1, MAX_DIVISOR)
}

/// The eight divisor outputs, driven together by the phasor callback.
#[derive(Debug)]
pub struct DividerBank {
    outputs: Vec<DivisorOutput>,
}

impl Default for DividerBank {
    fn default() -> Self {
        Self::new()
    }
}

impl DividerBank {
    pub fn new() -> Self {
        Self {
            outputs: (0..OUTPUT_COUNT).map(|_| DivisorOutput::default()).collect(),
        }
    }

    pub fn from_settings(settings: &[OutputSettings]) -> Self {
        let mut outputs: Vec<DivisorOutput> = settings
            .iter()
            .take(OUTPUT_COUNT)
            .map(DivisorOutput::from_settings)
            .collect();
        outputs.resize_with(OUTPUT_COUNT, DivisorOutput::default);
        Self { outputs }
    }

    pub fn settings(&self) -> Vec<OutputSettings> {
        self.outputs.iter().map(DivisorOutput::settings).collect()
    }

    pub fn output(&self, index: usize) -> Option<&DivisorOutput> {
        self.outputs.get(index)
    }

    pub fn output_mut(&mut self, index: usize) -> Option<&mut DivisorOutput> {
        self.outputs.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DivisorOutput> {
        self.outputs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DivisorOutput> {
        self.outputs.iter_mut()
    }

    pub fn restart_all(&mut self, pins: &mut dyn OutputPins) {
        for (i, o) in self.outputs.iter_mut().enumerate() {
            o.restart(i, pins);
        }
    }

    /// Advance every output by one phasor tick.
    ///
    /// At the base cycle boundary (`now == 0`) queued divisor changes are
    /// applied. On a hard `reset` each output's local counter is re-seeded to
    /// `now * divisor` so all outputs stay locked to the shared clock.
    pub fn process(&mut self, now: u8, reset: bool, pins: &mut dyn OutputPins) {
        if now == 0 {
            for o in &mut self.outputs {
                o.apply_pending();
            }
        }

        if reset {
            for (i, o) in self.outputs.iter_mut().enumerate() {
                pins.clear(i);
                o.now = (now as u16 * o.divisor as u16) % o.effective.period.max(1);
                o.fired = false;
            }
        }

        for (i, o) in self.outputs.iter_mut().enumerate() {
            o.step(i, pins);
        }
    }
}
