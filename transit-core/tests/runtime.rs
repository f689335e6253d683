mod common;

use transit_core::persistence::FileStorage;
use transit_types::{
    calc_clock_frequency, Connection, Event, EventKind, MidiPacket, Mode, MonomeDevice, OUTPUT_COUNT, PPQ,
};

#[test]
fn test_events_are_handled_in_posting_order() {
    let mut app = common::booted_app();
    assert_eq!(app.mode(), Some(Mode::Div));
    common::post_all(
        &app,
        &[
            Event::MonomeConnect { device: MonomeDevice::Grid },
            Event::MonomeConnect { device: MonomeDevice::Arc },
            Event::MidiConnect,
        ],
    );

    assert_eq!(app.drain_one(), Some(EventKind::MonomeConnect));
    assert_eq!(app.mode(), Some(Mode::Grid));
    assert_eq!(app.drain_one(), Some(EventKind::MonomeConnect));
    assert_eq!(app.mode(), Some(Mode::Arc));
    assert_eq!(app.drain_one(), Some(EventKind::MidiConnect));
    assert_eq!(app.mode(), Some(Mode::Midi));
    assert_eq!(app.connection(), Connection::Midi);
    assert_eq!(app.drain_one(), None);
}

#[test]
fn test_queue_overflow_drops_newest() {
    let app = common::booted_app();
    let capacity = app.settings().queue_capacity;
    for _ in 0..capacity {
        assert!(app.post(Event::KeyTimer));
    }
    assert!(!app.post(Event::SaveFlash));
    assert_eq!(app.pending_events(), capacity);
    assert_eq!(app.dropped_events(), 1);
}

#[test]
fn test_unbound_events_are_ignored() {
    let mut app = common::booted_app();
    common::post_all(
        &app,
        &[
            common::key(0, 0, true),
            Event::RingEnc { index: 0, delta: 5 },
            Event::MidiPacket(MidiPacket::new(0x90, 60, 100)),
        ],
    );
    let handled = common::drain(&mut app);
    assert_eq!(handled, vec![EventKind::GridKey, EventKind::RingEnc, EventKind::MidiPacket]);
    assert_eq!(app.mode(), Some(Mode::Div));
    assert!(common::output_levels(&app).iter().all(|&high| !high));
}

#[test]
fn test_midi_disconnect_returns_to_div() {
    let mut app = common::booted_app();
    common::post_all(&app, &[Event::MidiConnect, Event::MidiPacket(MidiPacket::new(0x90, 3, 64))]);
    common::drain(&mut app);
    assert!(app.pins().read(3));

    common::post_all(&app, &[Event::MidiDisconnect]);
    common::drain(&mut app);
    assert_eq!(app.mode(), Some(Mode::Div));
    assert_eq!(app.connection(), Connection::None);
    assert!(!app.pins().read(3));
}

#[test]
fn test_mode_switch_keeps_grid_edits() {
    let mut app = common::booted_app();
    common::post_all(
        &app,
        &[
            Event::MonomeConnect { device: MonomeDevice::Grid },
            common::key(0, 0, true),
            common::key(0, 0, false),
            common::key(4, 4, true),
            common::key(4, 4, false),
        ],
    );
    common::drain(&mut app);
    common::fire_phasor(&mut app, PPQ as usize * 3 + 1);

    let grid = app.grid().expect("grid entered");
    let state = grid.state().clone();
    let playheads = *grid.playheads();
    assert_eq!(playheads[0].position(), 3);

    app.set_mode(Mode::Arc);
    assert!(common::output_levels(&app).iter().all(|&high| !high));
    app.set_mode(Mode::Grid);

    let grid = app.grid().expect("grid kept");
    assert_eq!(grid.state(), &state);
    assert_eq!(grid.playheads(), &playheads);
    assert!(grid.trig(1, 1, 4).is_some_and(|t| t.is_active()));
}

#[test]
fn test_grid_pulse_carries_into_next_cycle() {
    let mut app = common::booted_app();
    // set step 0 and push it to the latest timing column
    common::post_all(
        &app,
        &[
            Event::MonomeConnect { device: MonomeDevice::Grid },
            common::key(0, 0, true),
            common::key(15, 6, true),
            common::key(0, 0, false),
        ],
    );
    common::drain(&mut app);
    assert_eq!(app.grid().and_then(|g| g.trig(0, 0, 0)).map(|t| t.timing), Some(28));

    // rise at tick 60, fall four ticks later wraps to tick 0 of the next cycle
    common::fire_phasor(&mut app, 60);
    assert!(!app.pins().read(0));
    common::fire_phasor(&mut app, 1);
    assert!(app.pins().read(0));
    common::fire_phasor(&mut app, 3);
    assert!(app.pins().read(0));
    common::fire_phasor(&mut app, 1);
    assert!(!app.pins().read(0));
}

#[test]
fn test_arc_clock_rate_reaches_phasor() {
    let mut app = common::booted_app();
    common::post_all(&app, &[Event::MonomeConnect { device: MonomeDevice::Arc }]);
    common::drain(&mut app);
    let before = app.arc().expect("arc entered").clock_rate();
    assert_eq!(app.phasor().frequency(), calc_clock_frequency(before));

    common::post_all(&app, &[Event::FrontLong, Event::RingEnc { index: 0, delta: 15 }]);
    common::drain(&mut app);

    let after = app.arc().expect("arc entered").clock_rate();
    assert!(after > before);
    assert_eq!(app.phasor().frequency(), calc_clock_frequency(after));
}

#[test]
fn test_external_clock_drives_div_outputs() {
    let mut app = common::booted_app();
    common::post_all(&app, &[Event::ClockNormal { patched: true }, Event::ClockExt { level: true }]);
    common::drain(&mut app);
    assert!(app.external_clock());
    assert!(common::output_levels(&app).iter().all(|&high| high));

    // the raw clock is ignored while a cable is patched
    app.clock_timer_fire();
    app.clock_timer_fire();
    assert!(common::output_levels(&app).iter().all(|&high| high));

    common::post_all(&app, &[Event::ClockExt { level: false }]);
    common::drain(&mut app);
    assert!((0..OUTPUT_COUNT).all(|i| !app.pins().read(i)));
}

#[test]
fn test_saved_state_survives_reboot() {
    let dir = tempfile::tempdir().unwrap();

    let mut app = common::make_app(Box::new(FileStorage::open(dir.path()).unwrap()));
    common::post_all(
        &app,
        &[
            Event::MonomeConnect { device: MonomeDevice::Grid },
            common::key(7, 2, true),
            common::key(7, 2, false),
            Event::SaveFlash,
        ],
    );
    common::drain(&mut app);
    drop(app);

    let app = common::make_app(Box::new(FileStorage::open(dir.path()).unwrap()));
    assert_eq!(app.mode(), Some(Mode::Grid));
    let grid = app.grid().expect("grid resumed");
    assert!(grid.trig(0, 2, 7).is_some_and(|t| t.is_active()));
}

#[test]
fn test_divisor_queued_before_save_survives_reboot() {
    let dir = tempfile::tempdir().unwrap();

    let mut app = common::make_app(Box::new(FileStorage::open(dir.path()).unwrap()));
    common::post_all(&app, &[Event::MonomeConnect { device: MonomeDevice::Arc }]);
    common::drain(&mut app);
    common::fire_phasor(&mut app, 5);

    // still mid-cycle, so the new divisor is only queued when the save lands
    common::post_all(
        &app,
        &[
            Event::FrontLong,
            Event::RingEnc { index: 1, delta: 15 },
            Event::RingEnc { index: 1, delta: 15 },
            Event::SaveFlash,
        ],
    );
    common::drain(&mut app);
    let out = app.arc().expect("arc entered").bank().output(0).unwrap();
    assert_eq!(out.divisor(), 1);
    assert_eq!(out.pending_divisor(), Some(2));
    drop(app);

    let app = common::make_app(Box::new(FileStorage::open(dir.path()).unwrap()));
    assert_eq!(app.mode(), Some(Mode::Arc));
    let out = app.arc().expect("arc resumed").bank().output(0).unwrap();
    assert_eq!(out.divisor(), 2);
}

#[test]
fn test_unsaved_edits_are_lost_on_reboot() {
    let dir = tempfile::tempdir().unwrap();

    let mut app = common::make_app(Box::new(FileStorage::open(dir.path()).unwrap()));
    common::post_all(
        &app,
        &[
            Event::MonomeConnect { device: MonomeDevice::Grid },
            common::key(7, 2, true),
            common::key(7, 2, false),
        ],
    );
    common::drain(&mut app);
    drop(app);

    let app = common::make_app(Box::new(FileStorage::open(dir.path()).unwrap()));
    assert_eq!(app.mode(), Some(Mode::Div));
    assert!(app.grid().is_none());
}
