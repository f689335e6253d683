//! Grid mode: two three-voice trigger tracks edited from a 16x8 grid.
//!
//! Layout:
//!
//! | rows | function                                                        |
//! |------|-----------------------------------------------------------------|
//! | 0-2  | track 0 steps, one row per voice                                |
//! | 3-5  | track 1 steps                                                   |
//! | 6    | edit track length, or step timing while a step is held         |
//! | 7    | 0-1 edit track, 2-5 page, 6 meta cue, 8-11 preset, 12-15 pattern |
//!
//! Pressing an unset step sets it and takes step focus. Releasing a step that
//! was already set within the toggle window mutes it. While a step is held,
//! other step keys toggle their selection and the timing row edits the held
//! step plus the selection.

use transit_types::{
    calc_clock_frequency, Connection, CueMode, Event, EventKind, GridPreset, GridState, Playhead, Trig,
    GRID_HEIGHT, GRID_PRESET_COUNT, GRID_WIDTH, HALF_PPQ, PAGE_SIZE, PATTERN_COUNT, PATTERN_STEP_MAX, PPQ,
    TRACK_COUNT, VOICE_COUNT,
};

use crate::app::App;
use crate::clock::clock_null;
use crate::dispatch::{handler_none, HandlerTable};
use crate::hardware::{LedBuffer, OutputPins, L1, L2, L3, L4};
use crate::persistence::{self, BlockKind};
use crate::wave::WaveEngine;

const STEP_ROWS: usize = TRACK_COUNT * VOICE_COUNT;
const LENGTH_ROW: usize = 6;
const CONTROL_ROW: usize = 7;

/// Timing change per column on the timing row; column 8 is on the beat.
const TIMING_STEP: i8 = 4;
const TIMING_CENTER: usize = 8;

/// The step key currently held down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepFocus {
    pub track: usize,
    pub voice: usize,
    pub step: usize,
    held_ticks: u8,
    was_active: bool,
}

impl StepFocus {
    fn is(&self, track: usize, voice: usize, step: usize) -> bool {
        self.track == track && self.voice == voice && self.step == step
    }
}

#[derive(Debug, Clone)]
pub struct GridMode {
    state: GridState,
    playheads: [Playhead; TRACK_COUNT],
    cued: [Option<u8>; TRACK_COUNT],
    /// Meta step each track last played; `None` until the walk starts.
    meta_index: [Option<usize>; TRACK_COUNT],
    waves: WaveEngine,
    edit_track: usize,
    pages: [u8; TRACK_COUNT],
    focus: Option<StepFocus>,
}

impl GridMode {
    pub fn new(mut state: GridState, pulse_width: u8) -> Self {
        state.normalize();
        let outputs: Vec<usize> = (0..STEP_ROWS).collect();
        let mut mode = Self {
            state,
            playheads: [Playhead::new(); TRACK_COUNT],
            cued: [None; TRACK_COUNT],
            meta_index: [None; TRACK_COUNT],
            waves: WaveEngine::new(&outputs, pulse_width),
            edit_track: 0,
            pages: [0; TRACK_COUNT],
            focus: None,
        };
        mode.rebind_playheads();
        mode
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn preset(&self) -> &GridPreset {
        &self.state.presets[self.state.preset_select as usize]
    }

    fn preset_mut(&mut self) -> &mut GridPreset {
        &mut self.state.presets[self.state.preset_select as usize]
    }

    pub fn playheads(&self) -> &[Playhead; TRACK_COUNT] {
        &self.playheads
    }

    pub fn edit_track(&self) -> usize {
        self.edit_track
    }

    pub fn page(&self, track: usize) -> u8 {
        self.pages.get(track).copied().unwrap_or(0)
    }

    pub fn focus(&self) -> Option<StepFocus> {
        self.focus
    }

    pub fn trig(&self, track: usize, voice: usize, step: usize) -> Option<Trig> {
        self.preset()
            .pattern_for(track)?
            .step(step)?
            .trig(voice)
            .copied()
    }

    /// Re-clamp every playhead to the length of the pattern its track plays.
    fn rebind_playheads(&mut self) {
        for t in 0..TRACK_COUNT {
            let length = self
                .preset()
                .pattern_for(t)
                .map(|p| p.length)
                .unwrap_or(PATTERN_STEP_MAX as u8);
            self.playheads[t].set_max(length);
        }
    }

    pub fn select_preset(&mut self, index: usize) -> bool {
        if index >= GRID_PRESET_COUNT || index == self.state.preset_select as usize {
            return false;
        }
        self.clear_selection();
        self.focus = None;
        self.state.preset_select = index as u8;
        self.cued = [None; TRACK_COUNT];
        self.meta_index = [None; TRACK_COUNT];
        self.rebind_playheads();
        for p in &mut self.playheads {
            p.request_reset();
        }
        log::debug!(target: "mode::grid", "preset {}", index);
        true
    }

    /// Set the playable length of `track`'s pattern.
    pub fn set_length(&mut self, track: usize, length: u8) -> bool {
        let Some(pattern) = self.preset_mut().pattern_for_mut(track) else {
            return false;
        };
        pattern.set_length(length);
        self.rebind_playheads();
        true
    }

    /// Switch `track` to `pattern` the next time its playhead wraps.
    pub fn cue_pattern(&mut self, track: usize, pattern: u8) -> bool {
        if pattern as usize >= PATTERN_COUNT || track >= TRACK_COUNT {
            return false;
        }
        self.preset_mut().tracks[track].cue = CueMode::Pattern;
        self.cued[track] = Some(pattern);
        true
    }

    /// Start or stop walking the preset's meta pattern on `track`.
    pub fn toggle_meta(&mut self, track: usize) -> bool {
        if track >= TRACK_COUNT {
            return false;
        }
        let t = &mut self.preset_mut().tracks[track];
        t.cue = if t.cue == CueMode::Meta { CueMode::None } else { CueMode::Meta };
        self.cued[track] = None;
        self.meta_index[track] = None;
        true
    }

    /// Move both playheads one step, applying cues on wrap.
    pub fn advance(&mut self) {
        for t in 0..TRACK_COUNT {
            self.playheads[t].advance();
            if self.playheads[t].at_first() {
                self.apply_cue(t);
            }
        }
    }

    fn apply_cue(&mut self, track: usize) {
        let cued = self.cued[track].take();
        let cue = self.preset().tracks[track].cue;
        match cue {
            CueMode::None => return,
            CueMode::Pattern => {
                let t = &mut self.preset_mut().tracks[track];
                if let Some(p) = cued {
                    t.pattern = p;
                }
                t.cue = CueMode::None;
            }
            CueMode::Meta => {
                let next = self.preset().meta.next_pattern(self.meta_index[track]);
                let t = &mut self.preset_mut().tracks[track];
                match next {
                    Some((index, p)) => {
                        t.pattern = p.min(PATTERN_COUNT as u8 - 1);
                        self.meta_index[track] = Some(index);
                    }
                    None => t.cue = CueMode::None,
                }
            }
        }
        self.rebind_playheads();
    }

    /// Rebuild each voice's edges from the steps under the playheads.
    pub fn build_waves(&mut self) {
        let preset = &self.state.presets[self.state.preset_select as usize];
        let playheads = &self.playheads;
        self.waves.build(|v| {
            let track = v / VOICE_COUNT;
            let step = playheads.get(track)?.position() as usize;
            preset
                .pattern_for(track)?
                .step(step)?
                .trig(v % VOICE_COUNT)
                .copied()
        });
    }

    /// Phasor tick. Returns true when the display needs a redraw.
    pub fn process(&mut self, now: u8, reset: bool, pins: &mut dyn OutputPins) -> bool {
        let mut dirty = false;
        if now == 0 {
            if !reset {
                self.advance();
            }
            self.build_waves();
            pins.set_clock_out(true);
            dirty = true;
        } else if now == HALF_PPQ {
            pins.set_clock_out(false);
        }
        self.waves.apply(now, pins);
        dirty
    }

    pub fn key_timer(&mut self) {
        if let Some(f) = self.focus.as_mut() {
            f.held_ticks = f.held_ticks.saturating_add(1);
        }
    }

    /// Handle a grid key. Returns true when the display needs a redraw.
    pub fn key(&mut self, x: u8, y: u8, pressed: bool, toggle_window: u8) -> bool {
        let (x, y) = (x as usize, y as usize);
        if x >= GRID_WIDTH || y >= GRID_HEIGHT {
            return false;
        }
        match y {
            y if y < STEP_ROWS => self.step_key(y / VOICE_COUNT, y % VOICE_COUNT, x, pressed, toggle_window),
            LENGTH_ROW => pressed && self.length_key(x),
            CONTROL_ROW => pressed && self.control_key(x),
            _ => false,
        }
    }

    fn step_key(&mut self, track: usize, voice: usize, x: usize, pressed: bool, toggle_window: u8) -> bool {
        let step = self.pages[track] as usize * PAGE_SIZE + x;

        if !pressed {
            let Some(f) = self.focus else {
                return false;
            };
            if !f.is(track, voice, step) {
                return false;
            }
            if f.was_active && f.held_ticks < toggle_window {
                if let Some(p) = self.preset_mut().pattern_for_mut(track) {
                    p.toggle_trig(step, voice);
                }
            }
            self.focus = None;
            self.clear_selection();
            return true;
        }

        let focus = self.focus;
        let Some(pattern) = self.preset_mut().pattern_for_mut(track) else {
            return false;
        };
        if !pattern.is_playable(step) {
            return false;
        }

        match focus {
            None => {
                let was_active = pattern
                    .step(step)
                    .and_then(|s| s.trig(voice))
                    .is_some_and(|t| t.is_active());
                if !was_active {
                    pattern.toggle_trig(step, voice);
                }
                self.focus = Some(StepFocus {
                    track,
                    voice,
                    step,
                    held_ticks: 0,
                    was_active,
                });
                true
            }
            Some(f) if f.is(track, voice, step) => false,
            Some(_) => match pattern.step_mut(step) {
                Some(s) => {
                    s.toggle_select(voice);
                    true
                }
                None => false,
            },
        }
    }

    fn length_key(&mut self, x: usize) -> bool {
        match self.focus {
            Some(f) => {
                let timing = (x as i8 - TIMING_CENTER as i8) * TIMING_STEP;
                self.set_timing(f, timing);
                true
            }
            None => {
                let track = self.edit_track;
                let length = self.pages[track] as usize * PAGE_SIZE + x + 1;
                self.set_length(track, length.min(PATTERN_STEP_MAX) as u8)
            }
        }
    }

    /// Apply `timing` to the focused trigger and every selected one.
    fn set_timing(&mut self, focus: StepFocus, timing: i8) {
        let preset = self.preset_mut();
        for pattern in &mut preset.patterns {
            for s in &mut pattern.steps {
                for t in s.voice.iter_mut().filter(|t| t.selected) {
                    t.set_timing(timing);
                }
            }
        }
        if let Some(t) = preset
            .pattern_for_mut(focus.track)
            .and_then(|p| p.step_mut(focus.step))
            .and_then(|s| s.trig_mut(focus.voice))
        {
            t.set_timing(timing);
        }
    }

    fn clear_selection(&mut self) {
        for pattern in &mut self.preset_mut().patterns {
            for s in &mut pattern.steps {
                for t in &mut s.voice {
                    t.selected = false;
                }
            }
        }
    }

    fn control_key(&mut self, x: usize) -> bool {
        let track = self.edit_track;
        match x {
            0..=1 => {
                self.edit_track = x;
                true
            }
            2..=5 => {
                self.pages[track] = (x - 2) as u8;
                true
            }
            6 => self.toggle_meta(track),
            8..=11 => self.select_preset(x - 8),
            12..=15 => self.cue_pattern(track, (x - 12) as u8),
            _ => false,
        }
    }

    /// Drop in-flight edges and any half-finished key gesture.
    fn suspend(&mut self) {
        self.waves.discard();
        self.clear_selection();
        self.focus = None;
    }

    pub fn render(&self, leds: &mut LedBuffer) {
        for t in 0..TRACK_COUNT {
            self.render_track(t, leds);
        }
        self.render_length_row(leds);
        self.render_controls(leds);
    }

    fn render_track(&self, track: usize, leds: &mut LedBuffer) {
        let Some(pattern) = self.preset().pattern_for(track) else {
            return;
        };
        let top = track * VOICE_COUNT;
        let start = self.pages[track] as usize * PAGE_SIZE;
        let visible = (pattern.length as usize).saturating_sub(start).min(PAGE_SIZE);

        for i in 0..visible {
            let Some(s) = pattern.step(start + i) else {
                continue;
            };
            for (v, t) in s.voice.iter().enumerate() {
                let led = &mut leds[(top + v) * GRID_WIDTH + i];
                if t.is_active() {
                    *led = L3;
                } else if t.value != 0 {
                    *led = L1;
                }
                if t.selected {
                    *led = L4;
                }
            }
        }

        let position = self.playheads[track].position() as usize;
        if (start..start + PAGE_SIZE).contains(&position) {
            let col = position - start;
            for v in 0..VOICE_COUNT {
                let led = &mut leds[(top + v) * GRID_WIDTH + col];
                *led = led.saturating_add(L2).min(L4);
            }
        }

        if let Some(f) = self.focus.filter(|f| f.track == track) {
            if (start..start + PAGE_SIZE).contains(&f.step) {
                leds[(top + f.voice) * GRID_WIDTH + f.step - start] = L4;
            }
        }
    }

    fn render_length_row(&self, leds: &mut LedBuffer) {
        let row = LENGTH_ROW * GRID_WIDTH;
        if let Some(f) = self.focus {
            let timing = self.trig(f.track, f.voice, f.step).map(|t| t.timing).unwrap_or(0);
            let col = (TIMING_CENTER as i32 + (timing / TIMING_STEP) as i32).clamp(0, GRID_WIDTH as i32 - 1);
            leds[row + TIMING_CENTER] = L1;
            leds[row + col as usize] = L3;
            return;
        }

        let track = self.edit_track;
        let Some(pattern) = self.preset().pattern_for(track) else {
            return;
        };
        let start = self.pages[track] as usize * PAGE_SIZE;
        let visible = (pattern.length as usize).saturating_sub(start).min(PAGE_SIZE);
        for x in 0..visible {
            leds[row + x] = L1;
        }
        if visible > 0 && pattern.length as usize <= start + PAGE_SIZE {
            leds[row + visible - 1] = L3;
        }
    }

    fn render_controls(&self, leds: &mut LedBuffer) {
        let row = CONTROL_ROW * GRID_WIDTH;
        let track = self.edit_track;
        let preset = self.preset();

        for t in 0..TRACK_COUNT {
            leds[row + t] = if t == track { L3 } else { L1 };
        }
        for page in 0..4 {
            leds[row + 2 + page] = if page == self.pages[track] as usize { L3 } else { L1 };
        }
        leds[row + 6] = if preset.tracks[track].cue == CueMode::Meta { L3 } else { L1 };
        for p in 0..GRID_PRESET_COUNT {
            leds[row + 8 + p] = if p == self.state.preset_select as usize { L3 } else { L1 };
        }
        for (p, pattern) in preset.patterns.iter().enumerate().take(4) {
            leds[row + 12 + p] = if pattern.occupied { L1 } else { 0 };
        }
        if let Some(p) = self.cued[track] {
            leds[row + 12 + p as usize] = L2;
        }
        leds[row + 12 + preset.tracks[track].pattern as usize] = L3;
    }
}

pub(crate) fn enter(app: &mut App, table: &mut HandlerTable) {
    let pulse_width = app.settings.pulse_width;
    let grid = app.grid.get_or_insert_with(|| {
        GridMode::new(persistence::load_or_default(app.storage.as_ref(), BlockKind::Grid), pulse_width)
    });
    let hz = calc_clock_frequency(grid.state.clock_rate);

    app.clock.set_callback(clock_null);

    table.bind(EventKind::GridKey, handler_grid_key);
    if app.connection == Connection::Grid {
        table.bind(EventKind::FrontShort, handler_none);
        table.bind(EventKind::FrontLong, handler_none);
    }

    app.phasor.set_callback(Some(process_phasor));
    app.phasor.setup(hz, PPQ);
    app.phasor.start();
}

pub(crate) fn leave(app: &mut App) {
    if let Some(grid) = app.grid.as_mut() {
        grid.suspend();
    }
}

pub(crate) fn save(app: &mut App) {
    if let Some(grid) = &app.grid {
        persistence::save(app.storage.as_mut(), BlockKind::Grid, &grid.state);
    }
}

pub(crate) fn render(app: &mut App) {
    let App { grid, leds, .. } = app;
    if let Some(grid) = grid.as_ref() {
        grid.render(leds);
    }
}

pub(crate) fn key_timer(app: &mut App) {
    if let Some(grid) = app.grid.as_mut() {
        grid.key_timer();
    }
}

fn process_phasor(app: &mut App, now: u8, reset: bool) {
    let App { grid, pins, .. } = &mut *app;
    let dirty = match grid.as_mut() {
        Some(grid) => grid.process(now, reset, pins.as_mut()),
        None => false,
    };
    if dirty {
        app.mark_dirty();
    }
}

fn handler_grid_key(app: &mut App, event: &Event) {
    let Event::GridKey { x, y, pressed } = *event else {
        return;
    };
    let toggle_window = app.settings.step_toggle_window;
    let Some(grid) = app.grid.as_mut() else {
        return;
    };
    if grid.key(x, y, pressed, toggle_window) {
        app.mark_dirty();
    }
}
