//! # transit-types
//!
//! Shared type definitions for the transit trigger sequencer.
//! Plain data only: the runtime, engines and modes live in transit-core.

pub mod event;
pub mod state;

pub use event::{Event, EventKind, MidiPacket, MonomeDevice};
pub use state::*;

/// Phasor resolution: discrete ticks per clock period.
pub const PPQ: u8 = 64;
/// Midpoint of a phasor cycle, where an untimed trigger fires.
pub const HALF_PPQ: u8 = PPQ / 2;

pub const MAX_PHASE: u16 = PPQ as u16 - 1;
pub const MAX_WIDTH: u16 = PPQ as u16 - 1;
pub const MAX_PERIOD: u16 = PPQ as u16;

pub const MAX_DIVISOR: u8 = 16;

/// Upper bound of the clock rate control; phasor frequency is `rate + 8` Hz.
pub const MAX_CLOCK_RATE: u16 = 1280;

/// Number of physical trigger outputs.
pub const OUTPUT_COUNT: usize = 8;

pub const VOICE_COUNT: usize = 3;
pub const TRACK_COUNT: usize = 2;

pub const PATTERN_STEP_MAX: usize = 64;
pub const PATTERN_DEFAULT_LENGTH: u8 = 16;
/// Patterns available to the tracks of one grid preset.
pub const PATTERN_COUNT: usize = 4;
pub const GRID_PRESET_COUNT: usize = 4;

pub const GRID_WIDTH: usize = 16;
pub const GRID_HEIGHT: usize = 8;
pub const PAGE_SIZE: usize = 16;

/// Map a clock rate control value to a phasor frequency in Hz.
pub fn calc_clock_frequency(rate: u16) -> u16 {
    rate.min(MAX_CLOCK_RATE) + 8
}

/// Operating mode of the module. Exactly one is active at a time.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Mode {
    Grid,
    Arc,
    Midi,
    #[default]
    Div,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Grid => "grid",
            Mode::Arc => "arc",
            Mode::Midi => "midi",
            Mode::Div => "div",
        };
        f.write_str(name)
    }
}

/// Which control surface (if any) is attached to the USB host port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Connection {
    #[default]
    None,
    Arc,
    Grid,
    Midi,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_frequency_offsets_and_clamps_rate() {
        assert_eq!(calc_clock_frequency(0), 8);
        assert_eq!(calc_clock_frequency(640), 648);
        assert_eq!(calc_clock_frequency(5000), 1288);
    }

    #[test]
    fn default_mode_is_div() {
        assert_eq!(Mode::default(), Mode::Div);
        assert_eq!(Mode::Arc.to_string(), "arc");
    }
}
