//! Events posted by interrupt-level collaborators and drained by the main loop.

/// Kind of control surface reported by the USB host stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonomeDevice {
    Grid,
    Arc,
}

/// A decoded MIDI packet: `status << 16 | data1 << 8 | data2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiPacket(pub u32);

impl MidiPacket {
    pub fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self(((status as u32) << 16) | ((data1 as u32) << 8) | data2 as u32)
    }

    pub fn status(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn data1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn data2(self) -> u8 {
        self.0 as u8
    }
}

/// An event with its payload. Payloads are small and `Copy` so posting never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Front panel button edge.
    Front { pressed: bool },
    FrontShort,
    FrontLong,
    /// Periodic sample of the clock/param knob (12-bit).
    PollAdc { value: u16 },
    /// Periodic key-hold timer.
    KeyTimer,
    SaveFlash,
    MonomeConnect { device: MonomeDevice },
    MonomeDisconnect,
    /// Deferred display redraw.
    MonomeRefresh,
    GridKey { x: u8, y: u8, pressed: bool },
    RingEnc { index: u8, delta: i8 },
    /// Clock input jack normalization changed (cable patched or removed).
    ClockNormal { patched: bool },
    /// External clock edge.
    ClockExt { level: bool },
    MidiConnect,
    MidiDisconnect,
    MidiPacket(MidiPacket),
}

/// Event discriminant, used to index the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Front,
    FrontShort,
    FrontLong,
    PollAdc,
    KeyTimer,
    SaveFlash,
    MonomeConnect,
    MonomeDisconnect,
    MonomeRefresh,
    GridKey,
    RingEnc,
    ClockNormal,
    ClockExt,
    MidiConnect,
    MidiDisconnect,
    MidiPacket,
}

impl EventKind {
    pub const COUNT: usize = 16;

    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::Front,
        EventKind::FrontShort,
        EventKind::FrontLong,
        EventKind::PollAdc,
        EventKind::KeyTimer,
        EventKind::SaveFlash,
        EventKind::MonomeConnect,
        EventKind::MonomeDisconnect,
        EventKind::MonomeRefresh,
        EventKind::GridKey,
        EventKind::RingEnc,
        EventKind::ClockNormal,
        EventKind::ClockExt,
        EventKind::MidiConnect,
        EventKind::MidiDisconnect,
        EventKind::MidiPacket,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Front { .. } => EventKind::Front,
            Event::FrontShort => EventKind::FrontShort,
            Event::FrontLong => EventKind::FrontLong,
            Event::PollAdc { .. } => EventKind::PollAdc,
            Event::KeyTimer => EventKind::KeyTimer,
            Event::SaveFlash => EventKind::SaveFlash,
            Event::MonomeConnect { .. } => EventKind::MonomeConnect,
            Event::MonomeDisconnect => EventKind::MonomeDisconnect,
            Event::MonomeRefresh => EventKind::MonomeRefresh,
            Event::GridKey { .. } => EventKind::GridKey,
            Event::RingEnc { .. } => EventKind::RingEnc,
            Event::ClockNormal { .. } => EventKind::ClockNormal,
            Event::ClockExt { .. } => EventKind::ClockExt,
            Event::MidiConnect => EventKind::MidiConnect,
            Event::MidiDisconnect => EventKind::MidiDisconnect,
            Event::MidiPacket(_) => EventKind::MidiPacket,
        }
    }
}
