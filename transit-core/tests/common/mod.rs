#![allow(dead_code)]

use transit_core::hardware::{MemoryPins, NullSurface};
use transit_core::persistence::{MemoryStorage, Storage};
use transit_core::{App, Settings};
use transit_types::{Event, EventKind, OUTPUT_COUNT};

pub fn make_app(storage: Box<dyn Storage>) -> App {
    let mut app = App::new(
        Settings::default(),
        Box::new(MemoryPins::new()),
        storage,
        Box::new(NullSurface),
    );
    app.boot();
    app
}

/// Booted on fresh in-memory storage.
pub fn booted_app() -> App {
    make_app(Box::new(MemoryStorage::new()))
}

pub fn post_all(app: &App, events: &[Event]) {
    for &e in events {
        assert!(app.post(e), "queue full posting {:?}", e);
    }
}

pub fn drain(app: &mut App) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    while let Some(kind) = app.drain_one() {
        kinds.push(kind);
    }
    kinds
}

pub fn fire_phasor(app: &mut App, count: usize) {
    for _ in 0..count {
        app.phasor_fire();
    }
}

pub fn output_levels(app: &App) -> Vec<bool> {
    (0..OUTPUT_COUNT).map(|i| app.pins().read(i)).collect()
}

pub fn key(x: u8, y: u8, pressed: bool) -> Event {
    Event::GridKey { x, y, pressed }
}
