//! The four operating modes.
//!
//! Each mode module provides `enter` (load or resume the working copy, overlay
//! its handlers, set up its clock source), `leave`, `save`, and optionally
//! `render` and `key_timer`. This module fans the lifecycle calls out by [`Mode`].

pub mod arc;
pub mod div;
pub mod grid;
pub mod midi;

pub use arc::{ArcMode, ArcUi};
pub use div::DivMode;
pub use grid::GridMode;
pub use midi::MidiMode;

use transit_types::Mode;

use crate::app::App;
use crate::dispatch::HandlerTable;

pub(crate) fn enter(app: &mut App, mode: Mode, table: &mut HandlerTable) {
    match mode {
        Mode::Grid => grid::enter(app, table),
        Mode::Arc => arc::enter(app, table),
        Mode::Midi => midi::enter(app, table),
        Mode::Div => div::enter(app, table),
    }
}

/// Stop the phasor, detach its callback and drop every output.
pub(crate) fn leave(app: &mut App, mode: Mode) {
    app.phasor.stop();
    app.phasor.set_callback(None);
    match mode {
        Mode::Grid => grid::leave(app),
        Mode::Arc => arc::leave(app),
        Mode::Midi | Mode::Div => {}
    }
    app.pins.clear_all();
    app.pins.set_clock_out(false);
}

pub(crate) fn save(app: &mut App, mode: Mode) {
    match mode {
        Mode::Grid => grid::save(app),
        Mode::Arc => arc::save(app),
        Mode::Midi => midi::save(app),
        Mode::Div => div::save(app),
    }
}

pub(crate) fn render(app: &mut App) {
    match app.mode() {
        Some(Mode::Grid) => grid::render(app),
        Some(Mode::Arc) => arc::render(app),
        _ => {}
    }
}

pub(crate) fn key_timer(app: &mut App) {
    if app.mode() == Some(Mode::Grid) {
        grid::key_timer(app);
    }
}
