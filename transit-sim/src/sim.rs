//! Virtual-time driver for the core's timers.
//!
//! Every timer the board would run becomes a deadline on a shared microsecond
//! clock. Due timers fire in a fixed order, then the event queue is drained,
//! so a run is deterministic for a given set of flags.

use transit_core::{App, EventSender};
use transit_types::Event;

#[derive(Debug, Clone, Copy)]
struct Deadline {
    period_us: u64,
    next_us: u64,
}

impl Deadline {
    fn new(period_us: u64, now_us: u64) -> Self {
        let period_us = period_us.max(1);
        Self {
            period_us,
            next_us: now_us + period_us,
        }
    }

    /// New period, applied from the next fire on.
    fn retime(&mut self, period_us: u64) {
        self.period_us = period_us.max(1);
    }

    fn take_due(&mut self, now_us: u64) -> bool {
        if now_us < self.next_us {
            return false;
        }
        self.next_us += self.period_us;
        true
    }
}

pub struct Simulation {
    app: App,
    now_us: u64,
    phasor: Option<Deadline>,
    clock: Deadline,
    key: Deadline,
    adc: Deadline,
    refresh: Deadline,
    ext_clock: Option<Deadline>,
    ext_level: bool,
    ext_sender: EventSender,
    adc_value: u16,
    events: u64,
}

impl Simulation {
    pub fn new(app: App, adc_value: u16, ext_clock_ms: Option<u64>) -> Self {
        let settings = *app.settings();
        let clock = Deadline::new(app.clock_period_ms() as u64 * 1000, 0);
        if ext_clock_ms.is_some() {
            app.post(Event::ClockNormal { patched: true });
        }
        Self {
            clock,
            key: Deadline::new(settings.key_ms * 1000, 0),
            adc: Deadline::new(settings.adc_ms * 1000, 0),
            refresh: Deadline::new(settings.refresh_ms * 1000, 0),
            // one fire per edge, so half the period
            ext_clock: ext_clock_ms.map(|ms| Deadline::new(ms * 500, 0)),
            ext_level: false,
            ext_sender: app.sender(),
            phasor: None,
            now_us: 0,
            adc_value: adc_value.min(4095),
            events: 0,
            app,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn post(&mut self, event: Event) {
        if !self.app.post(event) {
            log::warn!(target: "sim", "queue full, dropped {:?}", event);
        }
        self.drain();
    }

    pub fn events_handled(&self) -> u64 {
        self.events
    }

    pub fn elapsed_us(&self) -> u64 {
        self.now_us
    }

    /// Advance virtual time by `duration_us`.
    pub fn run(&mut self, duration_us: u64) {
        let end = self.now_us + duration_us;
        self.drain();
        while self.now_us < end {
            self.sync_phasor();
            self.now_us = self.next_deadline().min(end);
            self.fire_due();
            self.drain();
        }
    }

    fn sync_phasor(&mut self) {
        let period = self.app.phasor_period_us();
        if !self.app.phasor().is_running() || period == 0 {
            self.phasor = None;
            return;
        }
        match self.phasor.as_mut() {
            Some(d) => d.retime(period),
            None => self.phasor = Some(Deadline::new(period, self.now_us)),
        }
    }

    fn next_deadline(&self) -> u64 {
        [
            self.phasor.map(|d| d.next_us),
            Some(self.clock.next_us),
            Some(self.key.next_us),
            Some(self.adc.next_us),
            Some(self.refresh.next_us),
            self.ext_clock.map(|d| d.next_us),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(u64::MAX)
    }

    fn fire_due(&mut self) {
        let now = self.now_us;
        if self.phasor.as_mut().is_some_and(|d| d.take_due(now)) {
            self.app.phasor_fire();
        }
        if self.clock.take_due(now) {
            self.app.clock_timer_fire();
            self.clock.retime(self.app.clock_period_ms() as u64 * 1000);
        }
        if self.ext_clock.as_mut().is_some_and(|d| d.take_due(now)) {
            self.ext_level = !self.ext_level;
            self.ext_sender.post(Event::ClockExt { level: self.ext_level });
        }
        if self.key.take_due(now) {
            self.app.key_timer_fire();
        }
        if self.adc.take_due(now) {
            self.app.adc_timer_fire(self.adc_value);
        }
        if self.refresh.take_due(now) {
            self.app.refresh_timer_fire();
        }
    }

    fn drain(&mut self) {
        while self.app.drain_one().is_some() {
            self.events += 1;
        }
    }
}
