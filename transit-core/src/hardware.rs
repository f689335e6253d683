//! Narrow interfaces to the hardware collaborators.

use transit_types::OUTPUT_COUNT;

/// The eight trigger outputs plus the clock-out jack.
///
/// Index validity (`0..OUTPUT_COUNT`) is the caller's responsibility.
pub trait OutputPins {
    fn set(&mut self, index: usize);
    fn clear(&mut self, index: usize);
    fn read(&self, index: usize) -> bool;
    fn set_clock_out(&mut self, high: bool);
    fn clock_out(&self) -> bool;

    fn clear_all(&mut self) {
        for i in 0..OUTPUT_COUNT {
            self.clear(i);
        }
    }
}

/// In-memory pin bank that records every level change.
#[derive(Debug, Clone, Default)]
pub struct MemoryPins {
    levels: [bool; OUTPUT_COUNT],
    clock: bool,
    transitions: Vec<(usize, bool)>,
}

impl MemoryPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level changes as `(output, high)` in the order they happened.
    pub fn transitions(&self) -> &[(usize, bool)] {
        &self.transitions
    }

    pub fn take_transitions(&mut self) -> Vec<(usize, bool)> {
        std::mem::take(&mut self.transitions)
    }

    fn write(&mut self, index: usize, high: bool) {
        if let Some(level) = self.levels.get_mut(index) {
            if *level != high {
                *level = high;
                self.transitions.push((index, high));
            }
        }
    }
}

impl OutputPins for MemoryPins {
    fn set(&mut self, index: usize) {
        self.write(index, true);
    }

    fn clear(&mut self, index: usize) {
        self.write(index, false);
    }

    fn read(&self, index: usize) -> bool {
        self.levels.get(index).copied().unwrap_or(false)
    }

    fn set_clock_out(&mut self, high: bool) {
        self.clock = high;
    }

    fn clock_out(&self) -> bool {
        self.clock
    }
}

/// LED frame for the attached control surface: 16x8 grid or four 64-led rings.
pub const LED_BUFFER_SIZE: usize = 256;
pub type LedBuffer = [u8; LED_BUFFER_SIZE];

// brightness levels
pub const L1: u8 = 2;
pub const L2: u8 = 4;
pub const L3: u8 = 10;
pub const L4: u8 = 15;

/// Receives rendered frames on deferred redraw.
pub trait Surface {
    fn refresh(&mut self, leds: &LedBuffer);
}

/// Surface that discards frames, for headless operation.
#[derive(Debug, Default)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn refresh(&mut self, _leds: &LedBuffer) {}
}
