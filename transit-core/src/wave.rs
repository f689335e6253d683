//! Waveform edge engine.
//!
//! Once per phasor cycle (tick 0) `build` turns the current trigger of each
//! voice into a short list of edges. Every tick `apply` fires the edges whose
//! offset matches the phase. A falling edge that lands past the end of the
//! cycle is held as the voice's carry and becomes the first edge of the next
//! cycle, so a pulse may straddle two cycles.

use transit_types::{Edge, Level, Trig, HALF_PPQ, PPQ};

use crate::hardware::OutputPins;

/// Edges one voice can hold per cycle: carry, rise, fall and one spare.
pub const WAVE_EDGE_MAX: usize = 4;

/// Ordered edge list with a read cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Waveform {
    edges: [Option<Edge>; WAVE_EDGE_MAX],
    len: usize,
    cursor: usize,
}

impl Waveform {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Append an edge. Returns false when the list is full.
    pub fn push(&mut self, edge: Edge) -> bool {
        if self.len >= WAVE_EDGE_MAX {
            return false;
        }
        self.edges[self.len] = Some(edge);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges[..self.len].iter().flatten().copied()
    }

    /// The next unfired edge.
    pub fn pending(&self) -> Option<Edge> {
        if self.cursor < self.len {
            self.edges[self.cursor]
        } else {
            None
        }
    }

    fn last(&self) -> Option<Edge> {
        self.len.checked_sub(1).and_then(|i| self.edges[i])
    }

    fn consume(&mut self) {
        self.cursor += 1;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Voice {
    output: usize,
    wave: Waveform,
    carry: Option<Edge>,
}

/// Edge lists and carries for a set of voices, each bound to one output.
#[derive(Debug, Clone)]
pub struct WaveEngine {
    voices: Vec<Voice>,
    pulse_width: u8,
    resolution: u8,
}

impl WaveEngine {
    /// One voice per entry of `outputs`.
    pub fn new(outputs: &[usize], pulse_width: u8) -> Self {
        Self {
            voices: outputs
                .iter()
                .map(|&output| Voice {
                    output,
                    ..Voice::default()
                })
                .collect(),
            pulse_width: pulse_width.clamp(1, PPQ - 1),
            resolution: PPQ,
        }
    }

    pub fn wave(&self, voice: usize) -> Option<&Waveform> {
        self.voices.get(voice).map(|v| &v.wave)
    }

    pub fn carry(&self, voice: usize) -> Option<Edge> {
        self.voices.get(voice).and_then(|v| v.carry)
    }

    /// Rebuild every voice's edge list for the cycle starting now.
    /// `trig_for(voice)` yields the trigger under the playhead, if any.
    pub fn build<F>(&mut self, trig_for: F)
    where
        F: Fn(usize) -> Option<Trig>,
    {
        let resolution = self.resolution as i16;
        let pulse_width = self.pulse_width as i16;
        for (index, voice) in self.voices.iter_mut().enumerate() {
            voice.wave.clear();
            if let Some(carry) = voice.carry.take() {
                voice.wave.push(carry);
            }

            let trig = match trig_for(index) {
                Some(t) if t.is_active() => t,
                _ => continue,
            };

            let half = HALF_PPQ as i16;
            let rise = (half + (trig.timing as i16).clamp(-half, half)).clamp(0, resolution - 1);

            // a rise ahead of the pending carry fall supersedes it
            if voice.wave.last().is_some_and(|c| rise < c.offset as i16) {
                voice.wave.clear();
            }
            voice.wave.push(Edge::rising(rise as u8));

            let fall = rise + pulse_width;
            if fall >= resolution {
                voice.carry = Some(Edge::falling((fall - resolution) as u8));
            } else {
                voice.wave.push(Edge::falling(fall as u8));
            }
        }
    }

    /// Fire every edge scheduled at `now`.
    pub fn apply(&mut self, now: u8, pins: &mut dyn OutputPins) {
        for voice in &mut self.voices {
            while let Some(edge) = voice.wave.pending() {
                if edge.offset != now {
                    break;
                }
                match edge.level {
                    Level::Rising => pins.set(voice.output),
                    Level::Falling => pins.clear(voice.output),
                }
                voice.wave.consume();
            }
        }
    }

    /// Drop all edges and carries without firing them.
    pub fn discard(&mut self) {
        for voice in &mut self.voices {
            voice.wave.clear();
            voice.carry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MemoryPins;

    fn trig(timing: i8) -> Trig {
        Trig {
            enabled: true,
            value: 1,
            selected: false,
            timing,
        }
    }

    /// Build with `t` on voice 0 and sweep one full cycle, recording `(tick, high)` changes.
    fn run_cycle(engine: &mut WaveEngine, pins: &mut MemoryPins, t: Option<Trig>) -> Vec<(u8, bool)> {
        engine.build(|v| if v == 0 { t } else { None });
        let mut changes = Vec::new();
        for now in 0..PPQ {
            engine.apply(now, pins);
            for (_, high) in pins.take_transitions() {
                changes.push((now, high));
            }
        }
        changes
    }

    #[test]
    fn pulse_inside_cycle() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        let changes = run_cycle(&mut engine, &mut pins, Some(trig(8)));
        assert_eq!(changes, vec![(40, true), (44, false)]);
        assert_eq!(engine.carry(0), None);
    }

    #[test]
    fn untimed_trigger_fires_at_midpoint() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        let changes = run_cycle(&mut engine, &mut pins, Some(trig(0)));
        assert_eq!(changes, vec![(32, true), (36, false)]);
    }

    #[test]
    fn muted_or_empty_trigger_is_silent() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        let mut muted = trig(0);
        muted.enabled = false;
        assert!(run_cycle(&mut engine, &mut pins, Some(muted)).is_empty());
        assert!(run_cycle(&mut engine, &mut pins, None).is_empty());
    }

    #[test]
    fn fall_past_cycle_end_carries_over() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();

        let changes = run_cycle(&mut engine, &mut pins, Some(trig(30)));
        assert_eq!(changes, vec![(62, true)]);
        assert_eq!(engine.carry(0), Some(Edge::falling(2)));

        let changes = run_cycle(&mut engine, &mut pins, None);
        assert_eq!(changes, vec![(2, false)]);
        assert_eq!(engine.carry(0), None);
    }

    #[test]
    fn carry_fires_before_next_rise() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        run_cycle(&mut engine, &mut pins, Some(trig(30)));

        let changes = run_cycle(&mut engine, &mut pins, Some(trig(0)));
        assert_eq!(changes, vec![(2, false), (32, true), (36, false)]);
        let edges: Vec<Edge> = engine.wave(0).unwrap().edges().collect();
        assert_eq!(edges, vec![Edge::falling(2), Edge::rising(32), Edge::falling(36)]);
    }

    #[test]
    fn early_rise_supersedes_carry() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        run_cycle(&mut engine, &mut pins, Some(trig(30)));
        assert!(pins.read(0));

        // rise at tick 0, before the pending fall at tick 2
        let changes = run_cycle(&mut engine, &mut pins, Some(trig(-32)));
        assert_eq!(changes, vec![(4, false)]);
        let edges: Vec<Edge> = engine.wave(0).unwrap().edges().collect();
        assert_eq!(edges, vec![Edge::rising(0), Edge::falling(4)]);
    }

    #[test]
    fn rise_on_carry_tick_retriggers() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        run_cycle(&mut engine, &mut pins, Some(trig(30)));

        let changes = run_cycle(&mut engine, &mut pins, Some(trig(-30)));
        assert_eq!(changes, vec![(2, false), (2, true), (6, false)]);
    }

    #[test]
    fn latest_timing_clamps_inside_cycle() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        let changes = run_cycle(&mut engine, &mut pins, Some(trig(32)));
        assert_eq!(changes, vec![(63, true)]);
        assert_eq!(engine.carry(0), Some(Edge::falling(3)));
    }

    #[test]
    fn voices_drive_their_own_outputs() {
        let mut engine = WaveEngine::new(&[3, 5], 4);
        let mut pins = MemoryPins::new();
        engine.build(|v| if v == 1 { Some(trig(-10)) } else { None });
        for now in 0..PPQ {
            engine.apply(now, &mut pins);
        }
        assert_eq!(pins.transitions(), &[(5, true), (5, false)]);
    }

    #[test]
    fn discard_drops_carry() {
        let mut engine = WaveEngine::new(&[0], 4);
        let mut pins = MemoryPins::new();
        run_cycle(&mut engine, &mut pins, Some(trig(30)));
        engine.discard();
        assert_eq!(engine.carry(0), None);
        assert!(run_cycle(&mut engine, &mut pins, None).is_empty());
    }

    #[test]
    fn waveform_capacity_is_bounded() {
        let mut w = Waveform::default();
        for i in 0..WAVE_EDGE_MAX {
            assert!(w.push(Edge::rising(i as u8)));
        }
        assert!(!w.push(Edge::falling(9)));
        assert_eq!(w.len(), WAVE_EDGE_MAX);
    }
}
