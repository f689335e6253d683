//! Sequencer data model and persisted state blocks.

pub mod gate;
pub mod meta;
pub mod mode_state;
pub mod playhead;
pub mod track;
pub mod wave;

pub use gate::Gate;
pub use meta::{MetaPattern, MetaStep, META_STEP_MAX};
pub use mode_state::{
    ArcState, DivState, GridPreset, GridState, MidiState, OutputSettings, SystemState,
    DEFAULT_CLOCK_PERIOD_MS, DEFAULT_CLOCK_RATE,
};
pub use playhead::Playhead;
pub use track::{CueMode, Pattern, Step, Track, Trig};
pub use wave::{Edge, Level};
