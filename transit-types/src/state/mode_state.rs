//! Per-mode state blocks kept in non-volatile storage.

use serde::{Deserialize, Serialize};

use crate::{Gate, MetaPattern, Mode, Pattern, Track, GRID_PRESET_COUNT, OUTPUT_COUNT, PATTERN_COUNT, TRACK_COUNT};

/// Default clock rate for the phasor-driven modes (648 Hz phasor).
pub const DEFAULT_CLOCK_RATE: u16 = 640;
/// Default raw clock period for the divider and MIDI modes.
pub const DEFAULT_CLOCK_PERIOD_MS: u32 = 100;

/// Module-wide settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub mode: Mode,
}

/// One named grid preset: both tracks and the pattern bank they draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPreset {
    pub name: String,
    pub tracks: [Track; TRACK_COUNT],
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub meta: MetaPattern,
}

impl GridPreset {
    pub fn new(index: usize) -> Self {
        let mut tracks = [Track::default(); TRACK_COUNT];
        for (i, t) in tracks.iter_mut().enumerate() {
            *t = Track::new((i % PATTERN_COUNT) as u8);
        }
        Self {
            name: format!("preset {}", index + 1),
            tracks,
            patterns: vec![Pattern::new(); PATTERN_COUNT],
            meta: MetaPattern::default(),
        }
    }

    pub fn pattern_for(&self, track: usize) -> Option<&Pattern> {
        let t = self.tracks.get(track)?;
        self.patterns.get(t.pattern as usize)
    }

    pub fn pattern_for_mut(&mut self, track: usize) -> Option<&mut Pattern> {
        let t = self.tracks.get(track)?;
        self.patterns.get_mut(t.pattern as usize)
    }

    /// Restore invariants after loading from storage.
    pub fn normalize(&mut self) {
        self.patterns.resize_with(PATTERN_COUNT, Pattern::new);
        for p in &mut self.patterns {
            p.normalize();
        }
        for t in &mut self.tracks {
            if t.pattern as usize >= PATTERN_COUNT {
                t.pattern = 0;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridState {
    pub clock_rate: u16,
    pub preset_select: u8,
    pub presets: Vec<GridPreset>,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            clock_rate: DEFAULT_CLOCK_RATE,
            preset_select: 0,
            presets: (0..GRID_PRESET_COUNT).map(GridPreset::new).collect(),
        }
    }
}

impl GridState {
    pub fn normalize(&mut self) {
        let mut index = self.presets.len();
        while self.presets.len() < GRID_PRESET_COUNT {
            self.presets.push(GridPreset::new(index));
            index += 1;
        }
        self.presets.truncate(GRID_PRESET_COUNT);
        for p in &mut self.presets {
            p.normalize();
        }
        if self.preset_select as usize >= GRID_PRESET_COUNT {
            self.preset_select = 0;
        }
    }
}

/// Persisted settings of one divisor output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub divisor: u8,
    pub base: Gate,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            divisor: 1,
            base: Gate::default(),
        }
    }
}

impl OutputSettings {
    fn with(divisor: u8, phase: Option<u16>, width: Option<u16>) -> Self {
        let base = Gate::default();
        Self {
            divisor,
            base: Gate::clamped(
                phase.unwrap_or(base.phase),
                width.unwrap_or(base.width),
                base.period,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcState {
    pub clock_rate: u16,
    pub outputs: Vec<OutputSettings>,
}

impl Default for ArcState {
    fn default() -> Self {
        let outputs = vec![
            OutputSettings::with(1, None, None),
            OutputSettings::with(1, Some(16), Some(16)),
            OutputSettings::with(2, None, None),
            OutputSettings::with(2, Some(32), Some(16)),
            OutputSettings::with(3, None, None),
            OutputSettings::with(3, Some(48), Some(8)),
            OutputSettings::with(4, None, None),
            OutputSettings::with(5, Some(8), Some(48)),
        ];
        debug_assert_eq!(outputs.len(), OUTPUT_COUNT);
        Self {
            clock_rate: DEFAULT_CLOCK_RATE,
            outputs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiState {
    pub clock_period_ms: u32,
}

impl Default for MidiState {
    fn default() -> Self {
        Self {
            clock_period_ms: DEFAULT_CLOCK_PERIOD_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivState {
    pub clock_period_ms: u32,
}

impl Default for DivState {
    fn default() -> Self {
        Self {
            clock_period_ms: DEFAULT_CLOCK_PERIOD_MS,
        }
    }
}
