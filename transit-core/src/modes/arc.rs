//! Arc mode: eight phase-locked divisor outputs edited from an arc.
//!
//! The param knob picks the output to edit. In play mode encoder 0 moves the
//! gate's phase and encoder 1 its width. A long front press enters config
//! mode, where encoder 0 sets the clock rate and encoder 1 the divisor of the
//! selected outputs. A rising edge on the clock input restarts the phasor.

use transit_types::{
    calc_clock_frequency, ArcState, Connection, Event, EventKind, MAX_CLOCK_RATE, MAX_DIVISOR,
    MAX_WIDTH, OUTPUT_COUNT, PPQ,
};

use crate::app::App;
use crate::clock::clock_null;
use crate::dispatch::HandlerTable;
use crate::divider::DividerBank;
use crate::hardware::{LedBuffer, L1, L2, L3};
use crate::persistence::{self, BlockKind};

/// Triangular numbers: faster turns move further.
const DELTA_ACC: [i32; 16] = [0, 1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 66, 78, 91, 105, 120];

/// Ticks the clock-out jack stays high each cycle.
const EXT_CLOCK_WIDTH: u16 = MAX_WIDTH >> 1;

const RING_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArcUi {
    #[default]
    Play,
    Config,
}

#[derive(Debug)]
pub struct ArcMode {
    clock_rate: u16,
    bank: DividerBank,
    selection: usize,
    ui: ArcUi,
    enc_acc: [i32; 4],
    adc_last: Option<u16>,
}

impl ArcMode {
    pub fn new(state: ArcState) -> Self {
        let mut mode = Self {
            clock_rate: state.clock_rate.min(MAX_CLOCK_RATE),
            bank: DividerBank::from_settings(&state.outputs),
            selection: 0,
            ui: ArcUi::Play,
            enc_acc: [0; 4],
            adc_last: None,
        };
        mode.set_acc_play();
        mode
    }

    pub fn state(&self) -> ArcState {
        ArcState {
            clock_rate: self.clock_rate,
            outputs: self.bank.settings(),
        }
    }

    pub fn clock_rate(&self) -> u16 {
        self.clock_rate
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn ui(&self) -> ArcUi {
        self.ui
    }

    pub fn bank(&self) -> &DividerBank {
        &self.bank
    }

    /// Select the output under edit.
    pub fn select(&mut self, selection: usize) {
        self.selection = selection.min(OUTPUT_COUNT - 1);
        match self.ui {
            ArcUi::Play => self.set_acc_play(),
            ArcUi::Config => self.set_acc_config(),
        }
    }

    /// Toggle multi-select in play mode, return to play mode from config.
    pub fn front_short(&mut self) {
        match self.ui {
            ArcUi::Play => {
                if let Some(o) = self.bank.output_mut(self.selection) {
                    o.selected = !o.selected;
                }
            }
            ArcUi::Config => {
                self.set_acc_play();
                self.ui = ArcUi::Play;
            }
        }
    }

    pub fn front_long(&mut self) {
        self.set_acc_config();
        self.ui = ArcUi::Config;
    }

    // seed the accumulators from the current values so edits start in place
    fn set_acc_play(&mut self) {
        if let Some(o) = self.bank.output(self.selection) {
            self.enc_acc[0] = (o.base().phase as i32) << 7;
            self.enc_acc[1] = (o.base().width as i32) << 7;
        }
    }

    fn set_acc_config(&mut self) {
        self.enc_acc[0] = (self.clock_rate as i32) << 5;
        if let Some(o) = self.bank.output(self.selection) {
            self.enc_acc[1] = (o.divisor() as i32) << 7;
        }
    }

    /// Apply an encoder turn. Returns true if anything visible changed.
    pub fn encoder(&mut self, index: usize, delta: i8) -> bool {
        match self.ui {
            ArcUi::Play => self.encoder_play(index, delta),
            ArcUi::Config => self.encoder_config(index, delta),
        }
    }

    fn encoder_play(&mut self, index: usize, delta: i8) -> bool {
        if index > 1 {
            return false;
        }
        let limit = (PPQ as i32) << 7;
        self.enc_acc[index] = (self.enc_acc[index] + accelerate(delta)).clamp(0, limit);
        let t = (self.enc_acc[index] >> 7).clamp(0, PPQ as i32) as u16;

        let Some(o) = self.bank.output_mut(self.selection) else {
            return false;
        };
        let base = o.base();
        if index == 0 && t != base.phase {
            o.set_phase(t);
        } else if index == 1 && t != base.width {
            o.set_width(t);
        } else {
            return false;
        }
        o.base() != base
    }

    fn encoder_config(&mut self, index: usize, delta: i8) -> bool {
        match index {
            0 => {
                let limit = (MAX_CLOCK_RATE as i32) << 5;
                self.enc_acc[0] = (self.enc_acc[0] + accelerate(delta)).clamp(0, limit);
                let rate = (self.enc_acc[0] >> 5) as u16;
                if rate == self.clock_rate {
                    return false;
                }
                self.clock_rate = rate;
                true
            }
            1 => {
                self.enc_acc[1] = (self.enc_acc[1] + accelerate(delta))
                    .clamp(1 << 7, (MAX_DIVISOR as i32) << 7);
                let divisor = (self.enc_acc[1] >> 7) as u8;
                for (i, o) in self.bank.iter().enumerate() {
                    if i == self.selection || o.selected {
                        o.queue_divisor(divisor);
                    }
                }
                true
            }
            _ => false,
        }
    }

    pub fn render(&self, leds: &mut LedBuffer) {
        match self.ui {
            ArcUi::Play => self.draw_gate(leds),
            ArcUi::Config => self.draw_clock(leds),
        }
        self.draw_selected(leds);
        self.draw_divisor(leds);
    }

    fn draw_gate(&self, leds: &mut LedBuffer) {
        let Some(o) = self.bank.output(self.selection) else {
            return;
        };
        let start = o.base().phase as usize;
        let end = start + o.base().width as usize;
        leds[start] = L3;
        for p in start + 1..end {
            leds[p % RING_SIZE] = L2;
        }
    }

    fn draw_clock(&self, leds: &mut LedBuffer) {
        for p in (0..RING_SIZE).step_by(8) {
            leds[p] = L1;
            leds[p + 1] = L1;
        }
        // 1280 / 64 == 20
        let p = (self.clock_rate as usize / 20).min(RING_SIZE - 1);
        leds[p] = L3;
    }

    fn draw_selected(&self, leds: &mut LedBuffer) {
        for (i, o) in self.bank.iter().enumerate() {
            if i != self.selection && !o.selected {
                continue;
            }
            let s = RING_SIZE + i * 8;
            let level = if i == self.selection { L2 } else { L1 };
            for led in &mut leds[s..s + 7] {
                *led = level;
            }
            // last led of the region dimmer
            leds[s + 6] -= 1;
            leds[s + 7] = 0;
        }
    }

    fn draw_divisor(&self, leds: &mut LedBuffer) {
        let Some(o) = self.bank.output(self.selection) else {
            return;
        };
        let d = o.pending_divisor().unwrap_or(o.divisor()) as usize;
        for i in 0..d {
            leds[RING_SIZE + i * 3] = L3;
        }
    }
}

fn accelerate(delta: i8) -> i32 {
    let d = delta.clamp(-15, 15);
    let step = DELTA_ACC[d.unsigned_abs() as usize];
    if d < 0 {
        -step
    } else {
        step
    }
}

pub(crate) fn enter(app: &mut App, table: &mut HandlerTable) {
    let arc = app
        .arc
        .get_or_insert_with(|| ArcMode::new(persistence::load_or_default(app.storage.as_ref(), BlockKind::Arc)));
    arc.ui = ArcUi::Play;
    arc.set_acc_play();
    let hz = calc_clock_frequency(arc.clock_rate);

    app.clock.set_callback(clock_null);

    table.bind(EventKind::PollAdc, handler_arc_poll_adc);
    table.bind(EventKind::ClockExt, handler_arc_clock_ext);
    table.bind(EventKind::RingEnc, handler_arc_enc);
    if app.connection == Connection::Arc {
        table.bind(EventKind::FrontShort, handler_arc_front_short);
        table.bind(EventKind::FrontLong, handler_arc_front_long);
    }

    app.phasor.set_callback(Some(process_outputs));
    app.phasor.setup(hz, PPQ);
    app.phasor.start();
}

pub(crate) fn leave(app: &mut App) {
    let App { arc, pins, .. } = app;
    if let Some(arc) = arc.as_mut() {
        arc.bank.restart_all(pins.as_mut());
    }
}

pub(crate) fn save(app: &mut App) {
    if let Some(arc) = &app.arc {
        persistence::save(app.storage.as_mut(), BlockKind::Arc, &arc.state());
    }
}

pub(crate) fn render(app: &mut App) {
    let App { arc, leds, .. } = app;
    if let Some(arc) = arc.as_ref() {
        arc.render(leds);
    }
}

fn process_outputs(app: &mut App, now: u8, reset: bool) {
    let App { arc, pins, .. } = app;
    let Some(arc) = arc.as_mut() else {
        return;
    };
    if now == 0 {
        pins.set_clock_out(true);
    } else if now as u16 >= EXT_CLOCK_WIDTH {
        pins.set_clock_out(false);
    }
    arc.bank.process(now, reset, pins.as_mut());
}

fn handler_arc_poll_adc(app: &mut App, event: &Event) {
    let Event::PollAdc { value } = *event else {
        return;
    };
    let Some(arc) = app.arc.as_mut() else {
        return;
    };
    let p = value >> 9;
    if arc.adc_last != Some(p) {
        arc.adc_last = Some(p);
        arc.select(p as usize);
        app.mark_dirty();
    }
}

fn handler_arc_front_short(app: &mut App, _event: &Event) {
    if let Some(arc) = app.arc.as_mut() {
        arc.front_short();
        app.mark_dirty();
    }
}

fn handler_arc_front_long(app: &mut App, _event: &Event) {
    if let Some(arc) = app.arc.as_mut() {
        arc.front_long();
        app.mark_dirty();
    }
}

fn handler_arc_clock_ext(app: &mut App, event: &Event) {
    if let Event::ClockExt { level: true } = *event {
        app.phasor.reset();
    }
}

fn handler_arc_enc(app: &mut App, event: &Event) {
    let Event::RingEnc { index, delta } = *event else {
        return;
    };
    let Some(arc) = app.arc.as_mut() else {
        return;
    };
    let rate = arc.clock_rate;
    if !arc.encoder(index as usize, delta) {
        return;
    }
    if arc.clock_rate != rate {
        let hz = app.phasor.set_frequency(calc_clock_frequency(arc.clock_rate));
        log::debug!(target: "mode::arc", "clock rate {} ({} Hz)", arc.clock_rate, hz);
    }
    app.mark_dirty();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc() -> ArcMode {
        ArcMode::new(ArcState::default())
    }

    #[test]
    fn acceleration_follows_triangular_numbers() {
        assert_eq!(accelerate(1), 1);
        assert_eq!(accelerate(4), 10);
        assert_eq!(accelerate(-15), -120);
        assert_eq!(accelerate(100), 120);
        assert_eq!(accelerate(-128), -120);
    }

    #[test]
    fn play_encoders_edit_phase_and_width() {
        let mut arc = arc();
        for _ in 0..16 {
            arc.encoder(0, 15);
        }
        assert_eq!(arc.bank().output(0).unwrap().base().phase, 15);

        // width starts at 31
        assert!(arc.encoder(1, -15));
        assert_eq!(arc.bank().output(0).unwrap().base().width, 30);
    }

    #[test]
    fn play_edits_clamp_at_range_ends() {
        let mut arc = arc();
        assert!(!arc.encoder(0, -15));
        assert_eq!(arc.bank().output(0).unwrap().base().phase, 0);
        for _ in 0..200 {
            arc.encoder(1, -15);
        }
        assert_eq!(arc.bank().output(0).unwrap().base().width, 1);
    }

    #[test]
    fn selection_reseeds_accumulators() {
        let mut arc = arc();
        arc.select(3);
        // output 3 defaults to phase 32; a small turn stays near it
        arc.encoder(0, 15);
        assert_eq!(arc.bank().output(3).unwrap().base().phase, 32);
        assert_eq!(arc.bank().output(0).unwrap().base().phase, 0);
    }

    #[test]
    fn config_divisor_goes_through_mailbox() {
        let mut arc = arc();
        arc.select(3);
        arc.front_short();
        arc.select(0);
        arc.front_long();
        assert_eq!(arc.ui(), ArcUi::Config);

        arc.encoder(1, 15);
        arc.encoder(1, 15);
        let bank = arc.bank();
        assert_eq!(bank.output(0).unwrap().pending_divisor(), Some(2));
        assert_eq!(bank.output(3).unwrap().pending_divisor(), Some(2));
        assert_eq!(bank.output(1).unwrap().pending_divisor(), None);
        assert_eq!(bank.output(0).unwrap().divisor(), 1);

        arc.front_short();
        assert_eq!(arc.ui(), ArcUi::Play);
    }

    #[test]
    fn config_encoder_sets_clock_rate() {
        let mut arc = arc();
        arc.front_long();
        assert!(arc.encoder(0, 15));
        assert_eq!(arc.clock_rate(), (640 * 32 + 120) / 32);
        assert_eq!(arc.state().clock_rate, arc.clock_rate());
    }

    #[test]
    fn render_play_mode() {
        let mut arc = arc();
        arc.select(1);
        let mut leds = [0u8; crate::hardware::LED_BUFFER_SIZE];
        arc.render(&mut leds);
        // output 1: phase 16, width 16
        assert_eq!(leds[16], L3);
        assert_eq!(leds[31], L2);
        assert_eq!(leds[32], 0);
        assert_eq!(leds[64], L3);
        assert_eq!(leds[72], L2);
        assert_eq!(leds[78], L2 - 1);
        assert_eq!(leds[79], 0);
    }

    #[test]
    fn gate_drawing_wraps_around_ring() {
        let mut arc = arc();
        arc.select(5);
        for _ in 0..10 {
            arc.encoder(1, 15);
        }
        // output 5: phase 48, width grows past the ring end
        let width = arc.bank().output(5).unwrap().base().width as usize;
        assert!(48 + width > RING_SIZE);
        let mut leds = [0u8; crate::hardware::LED_BUFFER_SIZE];
        arc.render(&mut leds);
        assert_eq!(leds[48], L3);
        assert_eq!(leds[0], L2);
    }
}
