//! Divider mode: output `i` divides the clock by `i + 1`.
//!
//! Driven by the raw clock timer unless a cable is patched into the clock
//! input, in which case external clock edges drive the same countdowns.

use transit_types::{Connection, DivState, Event, EventKind, OUTPUT_COUNT};

use crate::app::App;
use crate::dispatch::{handler_none, HandlerTable};
use crate::hardware::OutputPins;
use crate::persistence::{self, BlockKind};

#[derive(Debug, Clone)]
pub struct DivMode {
    pub(crate) state: DivState,
    value: [u8; OUTPUT_COUNT],
    counter: [u8; OUTPUT_COUNT],
}

impl DivMode {
    pub fn new(state: DivState) -> Self {
        let mut mode = Self {
            state,
            value: [1; OUTPUT_COUNT],
            counter: [1; OUTPUT_COUNT],
        };
        mode.reset_counters();
        mode
    }

    pub fn state(&self) -> DivState {
        self.state
    }

    pub fn reset_counters(&mut self) {
        for i in 0..OUTPUT_COUNT {
            self.value[i] = i as u8 + 1;
            self.counter[i] = self.value[i];
        }
    }

    /// One clock phase. High sets every output whose countdown is due; low
    /// clears them and steps the countdowns.
    pub fn pulse(&mut self, high: bool, pins: &mut dyn OutputPins) {
        pins.set_clock_out(high);
        if high {
            for i in 0..OUTPUT_COUNT {
                if self.counter[i] == self.value[i] {
                    pins.set(i);
                }
            }
        } else {
            for i in 0..OUTPUT_COUNT {
                if self.counter[i] <= self.value[i] {
                    pins.clear(i);
                }
                self.counter[i] -= 1;
                if self.counter[i] == 0 {
                    self.counter[i] = self.value[i];
                }
            }
        }
    }
}

pub(crate) fn enter(app: &mut App, table: &mut HandlerTable) {
    let div = app.div.get_or_insert_with(|| {
        DivMode::new(persistence::load_or_default(app.storage.as_ref(), BlockKind::Div))
    });
    div.reset_counters();
    let period = div.state.clock_period_ms;

    app.clock.set_callback(clock_div);
    app.clock.set_period(period);

    table.bind(EventKind::ClockExt, handler_div_clock_ext);
    if app.connection == Connection::None {
        table.bind(EventKind::FrontShort, handler_none);
        table.bind(EventKind::FrontLong, handler_none);
    }
}

pub(crate) fn save(app: &mut App) {
    if let Some(div) = &app.div {
        persistence::save(app.storage.as_mut(), BlockKind::Div, &div.state);
    }
}

fn clock_div(app: &mut App, high: bool) {
    if !app.external_clock {
        pulse(app, high);
    }
}

fn handler_div_clock_ext(app: &mut App, event: &Event) {
    if let Event::ClockExt { level } = *event {
        if app.external_clock {
            pulse(app, level);
        }
    }
}

fn pulse(app: &mut App, high: bool) {
    let App { div, pins, .. } = app;
    if let Some(div) = div.as_mut() {
        div.pulse(high, pins.as_mut());
    }
}
