//! MIDI mode: note messages gate the outputs.
//!
//! Note number `n` drives output `n % 8`. Packets arrive already decoded.

use transit_types::{Connection, Event, EventKind, MidiPacket, MidiState, OUTPUT_COUNT};

use crate::app::App;
use crate::clock::clock_null;
use crate::dispatch::{handler_none, HandlerTable};
use crate::hardware::OutputPins;
use crate::persistence::{self, BlockKind};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const STOP: u8 = 0xfc;

#[derive(Debug, Clone)]
pub struct MidiMode {
    pub(crate) state: MidiState,
}

impl MidiMode {
    pub fn new(state: MidiState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> MidiState {
        self.state
    }

    /// Apply one packet to the outputs. Returns true if any output changed.
    pub fn handle_packet(&mut self, packet: MidiPacket, pins: &mut dyn OutputPins) -> bool {
        let status = packet.status();
        if status == STOP {
            pins.clear_all();
            return true;
        }

        let output = packet.data1() as usize % OUTPUT_COUNT;
        match status & 0xf0 {
            NOTE_ON if packet.data2() > 0 => pins.set(output),
            NOTE_ON | NOTE_OFF => pins.clear(output),
            _ => {
                log::trace!(target: "mode::midi", "ignoring status {:#04x}", status);
                return false;
            }
        }
        true
    }
}

pub(crate) fn enter(app: &mut App, table: &mut HandlerTable) {
    let midi = app.midi.get_or_insert_with(|| {
        MidiMode::new(persistence::load_or_default(app.storage.as_ref(), BlockKind::Midi))
    });
    let period = midi.state.clock_period_ms;

    app.clock.set_callback(clock_null);
    app.clock.set_period(period);

    table.bind(EventKind::MidiPacket, handler_midi_packet);
    if app.connection == Connection::Midi {
        table.bind(EventKind::FrontShort, handler_none);
        table.bind(EventKind::FrontLong, handler_none);
    }
}

pub(crate) fn save(app: &mut App) {
    if let Some(midi) = &app.midi {
        persistence::save(app.storage.as_mut(), BlockKind::Midi, &midi.state);
    }
}

fn handler_midi_packet(app: &mut App, event: &Event) {
    let Event::MidiPacket(packet) = *event else {
        return;
    };
    let App { midi, pins, .. } = app;
    if let Some(midi) = midi.as_mut() {
        midi.handle_packet(packet, pins.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MemoryPins;

    #[test]
    fn note_on_and_off_gate_outputs() {
        let mut midi = MidiMode::new(MidiState::default());
        let mut pins = MemoryPins::new();
        assert!(midi.handle_packet(MidiPacket::new(0x90, 62, 100), &mut pins));
        assert!(pins.read(62 % 8));
        assert!(midi.handle_packet(MidiPacket::new(0x80, 62, 0), &mut pins));
        assert!(!pins.read(62 % 8));
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let mut midi = MidiMode::new(MidiState::default());
        let mut pins = MemoryPins::new();
        midi.handle_packet(MidiPacket::new(0x93, 8, 90), &mut pins);
        assert!(pins.read(0));
        midi.handle_packet(MidiPacket::new(0x93, 8, 0), &mut pins);
        assert!(!pins.read(0));
    }

    #[test]
    fn stop_clears_everything() {
        let mut midi = MidiMode::new(MidiState::default());
        let mut pins = MemoryPins::new();
        for n in 0..OUTPUT_COUNT as u8 {
            midi.handle_packet(MidiPacket::new(0x90, n, 1), &mut pins);
        }
        assert!(midi.handle_packet(MidiPacket::new(STOP, 0, 0), &mut pins));
        assert!((0..OUTPUT_COUNT).all(|i| !pins.read(i)));
    }

    #[test]
    fn other_messages_are_ignored() {
        let mut midi = MidiMode::new(MidiState::default());
        let mut pins = MemoryPins::new();
        assert!(!midi.handle_packet(MidiPacket::new(0xb0, 1, 64), &mut pins));
        assert!(pins.transitions().is_empty());
    }
}
