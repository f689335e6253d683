//! Edge records produced by the waveform engine.

/// Target level of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Falling,
    Rising,
}

/// A level transition at a tick offset within one phasor cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub level: Level,
    pub offset: u8,
}

impl Edge {
    pub fn rising(offset: u8) -> Self {
        Self { level: Level::Rising, offset }
    }

    pub fn falling(offset: u8) -> Self {
        Self { level: Level::Falling, offset }
    }
}
