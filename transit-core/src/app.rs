//! Application context owned by the main loop.
//!
//! Everything the handlers, the phasor callback and the raw clock callback
//! touch lives here: the event queue, the bound handler table, the active mode
//! and its working copies, and the hardware collaborators. Timer drivers call
//! the `*_fire` entry points; the main loop calls [`App::drain_one`].

use transit_types::{
    ArcState, Connection, DivState, Event, EventKind, GridState, MidiState, Mode, SystemState,
};

use crate::clock::ClockTimer;
use crate::config::Settings;
use crate::dispatch::HandlerTable;
use crate::events::{EventQueue, EventSender};
use crate::hardware::{LedBuffer, OutputPins, Surface, LED_BUFFER_SIZE};
use crate::modes::{self, ArcMode, DivMode, GridMode, MidiMode};
use crate::persistence::{self, BlockKind, Storage};
use crate::phasor::{Phasor, PhasorTick};

pub struct App {
    queue: EventQueue,
    pub(crate) handlers: HandlerTable,
    mode: Option<Mode>,
    pub(crate) connection: Connection,
    pub(crate) external_clock: bool,
    pub(crate) phasor: Phasor,
    pub(crate) clock: ClockTimer,
    pub(crate) front_timer: u8,
    pub(crate) adc_last: Option<u16>,
    pub(crate) settings: Settings,
    pub(crate) pins: Box<dyn OutputPins>,
    pub(crate) storage: Box<dyn Storage>,
    surface: Box<dyn Surface>,
    pub(crate) leds: LedBuffer,
    render_dirty: u16,

    // working copies, loaded on first entry and kept across mode switches
    pub(crate) grid: Option<GridMode>,
    pub(crate) arc: Option<ArcMode>,
    pub(crate) midi: Option<MidiMode>,
    pub(crate) div: Option<DivMode>,
}

impl App {
    pub fn new(
        settings: Settings,
        pins: Box<dyn OutputPins>,
        storage: Box<dyn Storage>,
        surface: Box<dyn Surface>,
    ) -> Self {
        Self {
            queue: EventQueue::new(settings.queue_capacity),
            handlers: HandlerTable::base(),
            mode: None,
            connection: Connection::None,
            external_clock: false,
            phasor: Phasor::new(),
            clock: ClockTimer::new(settings.div_period_ms),
            front_timer: 0,
            adc_last: None,
            settings,
            pins,
            storage,
            surface,
            leds: [0; LED_BUFFER_SIZE],
            render_dirty: 0,
            grid: None,
            arc: None,
            midi: None,
            div: None,
        }
    }

    /// Populate defaults on first boot, then enter the persisted mode.
    pub fn boot(&mut self) {
        if self.storage.first_boot() {
            log::info!(target: "storage", "first boot, writing defaults");
            let storage = self.storage.as_mut();
            persistence::save(storage, BlockKind::System, &SystemState { mode: Mode::Div });
            let grid = GridState {
                clock_rate: self.settings.clock_rate,
                ..GridState::default()
            };
            persistence::save(storage, BlockKind::Grid, &grid);
            let arc = ArcState {
                clock_rate: self.settings.clock_rate,
                ..ArcState::default()
            };
            persistence::save(storage, BlockKind::Arc, &arc);
            persistence::save(storage, BlockKind::Midi, &self.settings.midi_defaults());
            persistence::save(storage, BlockKind::Div, &self.settings.div_defaults());
            storage.mark_initialized();
        }

        self.pins.clear_all();
        self.pins.set_clock_out(false);
        let system: SystemState = persistence::load_or_default(self.storage.as_ref(), BlockKind::System);
        self.set_mode(system.mode);
    }

    /// Leave the active mode, enter `mode` and swap in its handler table.
    pub fn set_mode(&mut self, mode: Mode) {
        if let Some(old) = self.mode.take() {
            modes::leave(self, old);
            log::info!(target: "mode", "leave {}", old);
        }

        let mut table = HandlerTable::base();
        modes::enter(self, mode, &mut table);
        self.handlers = table;
        self.mode = Some(mode);
        self.mark_dirty();
        log::info!(target: "mode", "enter {}", mode);
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn external_clock(&self) -> bool {
        self.external_clock
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Post from the main loop. Returns false if the queue was full.
    pub fn post(&self, event: Event) -> bool {
        self.queue.post(event)
    }

    /// Producer handle for timers and other threads.
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped_events(&self) -> usize {
        self.queue.dropped()
    }

    /// Pop the oldest event and run its bound handler. Returns the kind handled.
    pub fn drain_one(&mut self) -> Option<EventKind> {
        let event = self.queue.next()?;
        let kind = event.kind();
        let handler = self.handlers.get(kind);
        handler(self, &event);
        Some(kind)
    }

    /// Phasor timer entry point.
    pub fn phasor_fire(&mut self) -> Option<PhasorTick> {
        let tick = self.phasor.fire()?;
        if let Some(callback) = self.phasor.callback() {
            callback(self, tick.tick, tick.reset);
        }
        Some(tick)
    }

    /// Raw clock timer entry point.
    pub fn clock_timer_fire(&mut self) {
        let high = self.clock.fire();
        let callback = self.clock.callback();
        callback(self, high);
    }

    pub fn key_timer_fire(&self) -> bool {
        self.post(Event::KeyTimer)
    }

    pub fn adc_timer_fire(&self, value: u16) -> bool {
        self.post(Event::PollAdc { value })
    }

    /// Request a redraw only while something changed.
    pub fn refresh_timer_fire(&self) -> bool {
        self.render_dirty > 0 && self.post(Event::MonomeRefresh)
    }

    pub fn phasor(&self) -> &Phasor {
        &self.phasor
    }

    pub fn phasor_period_us(&self) -> u64 {
        self.phasor.period_us()
    }

    pub fn clock_period_ms(&self) -> u32 {
        self.clock.period_ms()
    }

    /// Set the raw clock period and record it in the active mode's state.
    pub fn set_clock_period(&mut self, period_ms: u32) {
        self.clock.set_period(period_ms);
        let period_ms = self.clock.period_ms();
        match self.mode {
            Some(Mode::Div) => {
                if let Some(div) = self.div.as_mut() {
                    div.state.clock_period_ms = period_ms;
                }
            }
            Some(Mode::Midi) => {
                if let Some(midi) = self.midi.as_mut() {
                    midi.state.clock_period_ms = period_ms;
                }
            }
            _ => {}
        }
    }

    pub fn pins(&self) -> &dyn OutputPins {
        self.pins.as_ref()
    }

    pub fn leds(&self) -> &LedBuffer {
        &self.leds
    }

    pub fn is_dirty(&self) -> bool {
        self.render_dirty > 0
    }

    pub fn mark_dirty(&mut self) {
        self.render_dirty = self.render_dirty.saturating_add(1);
    }

    /// Render the active mode and hand the frame to the surface.
    pub(crate) fn refresh_surface(&mut self) {
        if self.render_dirty == 0 {
            return;
        }
        self.render_dirty = 0;
        self.leds.fill(0);
        modes::render(self);
        self.surface.refresh(&self.leds);
    }

    /// Write the system block and the active mode's working copy.
    pub fn save(&mut self) {
        let Some(mode) = self.mode else {
            return;
        };
        persistence::save(self.storage.as_mut(), BlockKind::System, &SystemState { mode });
        modes::save(self, mode);
        log::debug!(target: "storage", "saved {} state", mode);
    }

    pub fn grid(&self) -> Option<&GridMode> {
        self.grid.as_ref()
    }

    pub fn arc(&self) -> Option<&ArcMode> {
        self.arc.as_ref()
    }

    pub fn midi_state(&self) -> Option<MidiState> {
        self.midi.as_ref().map(|m| m.state)
    }

    pub fn div_state(&self) -> Option<DivState> {
        self.div.as_ref().map(|d| d.state)
    }
}
