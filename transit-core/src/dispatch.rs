//! Event-kind to handler table and the base handler layer.
//!
//! The table is rebuilt wholesale on every mode change: start from
//! [`HandlerTable::base`], let the entering mode overlay its own handlers, then
//! swap the finished table into the [`App`]. Kinds nobody binds keep
//! [`handler_none`].

use transit_types::{Connection, Event, EventKind, Mode, MonomeDevice};

use crate::app::App;
use crate::clock::adc_clock_period;
use crate::modes;

/// Runs on the main loop for one drained event.
pub type Handler = fn(&mut App, &Event);

#[derive(Clone, Copy)]
pub struct HandlerTable {
    handlers: [Handler; EventKind::COUNT],
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable").finish_non_exhaustive()
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::base()
    }
}

impl HandlerTable {
    /// Every kind bound to [`handler_none`].
    pub fn empty() -> Self {
        Self {
            handlers: [handler_none as Handler; EventKind::COUNT],
        }
    }

    /// Handlers shared by every mode.
    pub fn base() -> Self {
        let mut t = Self::empty();
        t.bind(EventKind::Front, handler_front);
        t.bind(EventKind::FrontShort, handler_front_short);
        t.bind(EventKind::FrontLong, handler_none);
        t.bind(EventKind::PollAdc, handler_poll_adc);
        t.bind(EventKind::KeyTimer, handler_key_timer);
        t.bind(EventKind::SaveFlash, handler_save_flash);
        t.bind(EventKind::MonomeConnect, handler_monome_connect);
        t.bind(EventKind::MonomeDisconnect, handler_monome_disconnect);
        t.bind(EventKind::MonomeRefresh, handler_monome_refresh);
        t.bind(EventKind::ClockNormal, handler_clock_normal);
        t.bind(EventKind::ClockExt, handler_clock_ext);
        t.bind(EventKind::MidiConnect, handler_midi_connect);
        t.bind(EventKind::MidiDisconnect, handler_midi_disconnect);
        t
    }

    pub fn bind(&mut self, kind: EventKind, handler: Handler) {
        self.handlers[kind.index()] = handler;
    }

    pub fn get(&self, kind: EventKind) -> Handler {
        self.handlers[kind.index()]
    }

    /// Point the front panel kinds back at the base layer.
    pub fn restore_front(&mut self) {
        self.bind(EventKind::FrontShort, handler_front_short);
        self.bind(EventKind::FrontLong, handler_none);
    }
}

pub fn handler_none(_app: &mut App, _event: &Event) {}

fn handler_front(app: &mut App, event: &Event) {
    let Event::Front { pressed } = *event else {
        return;
    };
    if pressed {
        app.front_timer = app.settings.front_hold_ticks;
    } else {
        if app.front_timer > 0 {
            app.post(Event::FrontShort);
        }
        app.front_timer = 0;
    }
}

fn handler_front_short(app: &mut App, _event: &Event) {
    if app.connection == Connection::None {
        app.set_mode(Mode::Div);
    }
}

fn handler_poll_adc(app: &mut App, event: &Event) {
    let Event::PollAdc { value } = *event else {
        return;
    };
    let coarse = value >> 2;
    if app.adc_last != Some(coarse) {
        app.adc_last = Some(coarse);
        app.set_clock_period(adc_clock_period(value));
    }
}

fn handler_key_timer(app: &mut App, _event: &Event) {
    if app.front_timer > 0 {
        if app.front_timer == 1 {
            app.post(Event::FrontLong);
            app.front_timer = 0;
        } else {
            app.front_timer -= 1;
        }
    }
    modes::key_timer(app);
}

fn handler_save_flash(app: &mut App, _event: &Event) {
    app.save();
}

fn handler_monome_connect(app: &mut App, event: &Event) {
    let Event::MonomeConnect { device } = *event else {
        return;
    };
    log::info!(target: "events", "monome {:?} connected", device);
    match device {
        MonomeDevice::Grid => {
            app.connection = Connection::Grid;
            app.set_mode(Mode::Grid);
        }
        MonomeDevice::Arc => {
            app.connection = Connection::Arc;
            app.set_mode(Mode::Arc);
        }
    }
}

fn handler_monome_disconnect(app: &mut App, _event: &Event) {
    log::info!(target: "events", "monome disconnected");
    app.connection = Connection::None;
    app.handlers.restore_front();
}

fn handler_monome_refresh(app: &mut App, _event: &Event) {
    app.refresh_surface();
}

fn handler_clock_normal(app: &mut App, event: &Event) {
    if let Event::ClockNormal { patched } = *event {
        app.external_clock = patched;
        log::debug!(target: "events", "external clock {}", if patched { "patched" } else { "removed" });
    }
}

fn handler_clock_ext(_app: &mut App, event: &Event) {
    log::trace!(target: "events", "{:?} ignored", event);
}

fn handler_midi_connect(app: &mut App, _event: &Event) {
    log::info!(target: "events", "midi connected");
    app.connection = Connection::Midi;
    app.set_mode(Mode::Midi);
}

fn handler_midi_disconnect(app: &mut App, _event: &Event) {
    log::info!(target: "events", "midi disconnected");
    app.handlers.restore_front();
    app.connection = Connection::None;
    app.set_mode(Mode::Div);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::hardware::{MemoryPins, NullSurface};
    use crate::persistence::MemoryStorage;

    fn app() -> App {
        let mut app = App::new(
            Settings::default(),
            Box::new(MemoryPins::new()),
            Box::new(MemoryStorage::new()),
            Box::new(NullSurface),
        );
        app.boot();
        app
    }

    fn drain(app: &mut App) {
        while app.drain_one().is_some() {}
    }

    #[test]
    fn short_press_posts_front_short() {
        let mut app = app();
        app.post(Event::Front { pressed: true });
        app.post(Event::KeyTimer);
        app.post(Event::Front { pressed: false });
        assert_eq!(app.drain_one(), Some(EventKind::Front));
        assert_eq!(app.drain_one(), Some(EventKind::KeyTimer));
        assert_eq!(app.drain_one(), Some(EventKind::Front));
        assert_eq!(app.pending_events(), 1);
        assert_eq!(app.drain_one(), Some(EventKind::FrontShort));
    }

    #[test]
    fn hold_posts_front_long_once() {
        let mut app = app();
        let hold = app.settings().front_hold_ticks;
        app.post(Event::Front { pressed: true });
        app.drain_one();
        let mut kinds = Vec::new();
        for _ in 0..hold + 2 {
            app.post(Event::KeyTimer);
            app.drain_one();
            if let Some(kind) = app.drain_one() {
                kinds.push(kind);
            }
        }
        assert_eq!(kinds, vec![EventKind::FrontLong]);

        // release after a long press is not also a short press
        app.post(Event::Front { pressed: false });
        assert_eq!(app.drain_one(), Some(EventKind::Front));
        assert_eq!(app.drain_one(), None);
    }

    #[test]
    fn adc_sets_raw_clock_period() {
        let mut app = app();
        app.post(Event::PollAdc { value: 0 });
        drain(&mut app);
        assert_eq!(app.clock_period_ms(), 1000);
        app.post(Event::PollAdc { value: 4095 });
        drain(&mut app);
        assert_eq!(app.clock_period_ms(), 25000 / (1023 + 25));
    }

    #[test]
    fn clock_normal_tracks_patch_state() {
        let mut app = app();
        app.post(Event::ClockNormal { patched: true });
        drain(&mut app);
        assert!(app.external_clock());
        app.post(Event::ClockNormal { patched: false });
        drain(&mut app);
        assert!(!app.external_clock());
    }

    #[test]
    fn disconnect_restores_front_panel_to_div() {
        let mut app = app();
        app.post(Event::MonomeConnect { device: MonomeDevice::Arc });
        drain(&mut app);
        assert_eq!(app.mode(), Some(Mode::Arc));

        app.post(Event::MonomeDisconnect);
        app.post(Event::FrontShort);
        drain(&mut app);
        assert_eq!(app.connection(), Connection::None);
        assert_eq!(app.mode(), Some(Mode::Div));
    }

    #[test]
    fn midi_disconnect_returns_to_div() {
        let mut app = app();
        app.post(Event::MidiConnect);
        drain(&mut app);
        assert_eq!(app.mode(), Some(Mode::Midi));
        assert_eq!(app.connection(), Connection::Midi);
        app.post(Event::MidiDisconnect);
        drain(&mut app);
        assert_eq!(app.mode(), Some(Mode::Div));
        assert_eq!(app.connection(), Connection::None);
    }

    #[test]
    fn unbound_kinds_are_ignored() {
        let mut app = app();
        app.post(Event::GridKey { x: 0, y: 0, pressed: true });
        app.post(Event::RingEnc { index: 0, delta: 3 });
        app.post(Event::MidiPacket(transit_types::MidiPacket::new(0x90, 60, 100)));
        drain(&mut app);
        assert_eq!(app.mode(), Some(Mode::Div));
        assert!((0..transit_types::OUTPUT_COUNT).all(|i| !app.pins().read(i)));
    }
}
