//! Steps, patterns and tracks.

use serde::{Deserialize, Serialize};

use crate::{HALF_PPQ, PATTERN_DEFAULT_LENGTH, PATTERN_STEP_MAX, VOICE_COUNT};

/// Per-voice trigger within a step.
///
/// `value` is the literal on/off state and `enabled` decides whether it reaches
/// the output, so a trigger can be muted without forgetting that it was set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trig {
    pub enabled: bool,
    pub value: u8,
    /// UI multi-select flag; never affects output and is not persisted.
    #[serde(skip)]
    pub selected: bool,
    /// Rise offset in ticks relative to the cycle midpoint.
    pub timing: i8,
}

impl Trig {
    /// True when the trigger contributes to the output.
    pub fn is_active(&self) -> bool {
        self.enabled && self.value != 0
    }

    /// Set the fine timing offset, clamped to +/- half a phasor cycle.
    pub fn set_timing(&mut self, timing: i8) {
        let half = HALF_PPQ as i8;
        self.timing = timing.clamp(-half, half);
    }
}

/// One step of a pattern: a trigger per voice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub voice: [Trig; VOICE_COUNT],
}

impl Step {
    pub fn trig(&self, voice: usize) -> Option<&Trig> {
        self.voice.get(voice)
    }

    pub fn trig_mut(&mut self, voice: usize) -> Option<&mut Trig> {
        self.voice.get_mut(voice)
    }

    /// An unset trigger becomes set and enabled; a set trigger flips its
    /// enabled flag and keeps its value.
    pub fn toggle(&mut self, voice: usize) {
        if let Some(t) = self.voice.get_mut(voice) {
            if t.value == 0 {
                t.enabled = true;
                t.value = 1;
            } else {
                t.enabled = !t.enabled;
            }
        }
    }

    pub fn toggle_select(&mut self, voice: usize) {
        if let Some(t) = self.voice.get_mut(voice) {
            t.selected = !t.selected;
        }
    }
}

/// Fixed-capacity step sequence. Only indices below `length` play or take the edit cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub steps: Vec<Step>,
    pub length: u8,
    pub occupied: bool,
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

impl Pattern {
    pub fn new() -> Self {
        Self {
            steps: vec![Step::default(); PATTERN_STEP_MAX],
            length: PATTERN_DEFAULT_LENGTH,
            occupied: false,
        }
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Mutable step access. Does not mark the pattern occupied.
    pub fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    /// Toggle one trigger and mark the pattern occupied. Returns false when
    /// `step` or `voice` is out of range.
    pub fn toggle_trig(&mut self, step: usize, voice: usize) -> bool {
        match self.steps.get_mut(step) {
            Some(s) if voice < VOICE_COUNT => {
                s.toggle(voice);
                self.occupied = true;
                true
            }
            _ => false,
        }
    }

    /// Set the playable length, clamped to `1..=PATTERN_STEP_MAX`. Returns the applied length.
    ///
    /// Callers holding a playhead over this pattern must re-clamp it afterwards.
    pub fn set_length(&mut self, length: u8) -> u8 {
        self.length = length.clamp(1, PATTERN_STEP_MAX as u8);
        self.length
    }

    pub fn is_playable(&self, index: usize) -> bool {
        index < self.length as usize
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Restore invariants after loading from storage.
    pub fn normalize(&mut self) {
        self.steps.resize(PATTERN_STEP_MAX, Step::default());
        self.set_length(self.length);
    }
}

/// Pending change a track waits to apply at its next wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueMode {
    #[default]
    None,
    Pattern,
    Meta,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub cue: CueMode,
    /// Index of the pattern this track plays.
    pub pattern: u8,
}

impl Track {
    pub fn new(initial_pattern: u8) -> Self {
        Self {
            cue: CueMode::None,
            pattern: initial_pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_sets_then_mutes_keeping_value() {
        let mut step = Step::default();
        step.toggle(1);
        assert!(step.voice[1].is_active());

        step.toggle(1);
        assert!(!step.voice[1].enabled);
        assert_eq!(step.voice[1].value, 1);
        assert!(!step.voice[1].is_active());

        step.toggle(1);
        assert!(step.voice[1].is_active());
    }

    #[test]
    fn out_of_range_voice_is_ignored() {
        let mut step = Step::default();
        step.toggle(VOICE_COUNT);
        step.toggle_select(VOICE_COUNT + 2);
        assert_eq!(step, Step::default());
        assert!(step.trig(VOICE_COUNT).is_none());
    }

    #[test]
    fn select_does_not_affect_output() {
        let mut step = Step::default();
        step.toggle_select(0);
        assert!(step.voice[0].selected);
        assert!(!step.voice[0].is_active());
        step.toggle_select(0);
        assert!(!step.voice[0].selected);
    }

    #[test]
    fn timing_is_clamped_to_half_cycle() {
        let mut t = Trig::default();
        t.set_timing(100);
        assert_eq!(t.timing, 32);
        t.set_timing(-100);
        assert_eq!(t.timing, -32);
        t.set_timing(-5);
        assert_eq!(t.timing, -5);
    }

    #[test]
    fn pattern_length_is_clamped() {
        let mut p = Pattern::new();
        assert_eq!(p.length, PATTERN_DEFAULT_LENGTH);
        assert_eq!(p.set_length(0), 1);
        assert_eq!(p.set_length(200), PATTERN_STEP_MAX as u8);
        p.set_length(8);
        assert!(p.is_playable(7));
        assert!(!p.is_playable(8));
    }

    #[test]
    fn toggling_marks_pattern_occupied() {
        let mut p = Pattern::new();
        assert!(!p.occupied);
        assert!(p.toggle_trig(3, 0));
        assert!(p.occupied);
        assert!(p.steps[3].voice[0].is_active());
    }

    #[test]
    fn lookups_and_bad_indices_leave_pattern_unoccupied() {
        let mut p = Pattern::new();
        assert!(p.step_mut(PATTERN_STEP_MAX).is_none());
        if let Some(s) = p.step_mut(2) {
            s.toggle_select(1);
        }
        assert!(!p.toggle_trig(PATTERN_STEP_MAX, 0));
        assert!(!p.toggle_trig(0, VOICE_COUNT));
        assert!(!p.occupied);
    }

    #[test]
    fn selection_is_not_persisted() {
        let mut p = Pattern::new();
        p.toggle_trig(0, 0);
        p.steps[0].voice[0].selected = true;
        let json = serde_json::to_string(&p).unwrap();
        let back: Pattern = serde_json::from_str(&json).unwrap();
        assert!(back.steps[0].voice[0].is_active());
        assert!(!back.steps[0].voice[0].selected);
    }
}
