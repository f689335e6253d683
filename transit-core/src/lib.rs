//! # transit-core
//!
//! Runtime for the transit trigger sequencer: event dispatch, mode lifecycle,
//! the phasor-driven output engines and block persistence. Hardware is reached
//! only through the [`hardware`] traits and [`persistence::Storage`], so the
//! same core runs on a board, in the simulator and in tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use transit_core::{App, Config};
//! use transit_core::hardware::{MemoryPins, NullSurface};
//! use transit_core::persistence::MemoryStorage;
//! use transit_types::{Event, MonomeDevice};
//!
//! // 1. Build the context from config and the hardware collaborators
//! let settings = Config::load().settings();
//! let mut app = App::new(settings, Box::new(MemoryPins::new()), Box::new(MemoryStorage::new()), Box::new(NullSurface));
//!
//! // 2. Write first-boot defaults and enter the persisted mode
//! app.boot();
//!
//! // 3. Timers post events; the main loop drains them one at a time
//! app.post(Event::MonomeConnect { device: MonomeDevice::Grid });
//! while app.drain_one().is_some() {}
//!
//! // 4. The phasor timer drives the active mode's output engine
//! app.phasor_fire();
//! ```
//!
//! ## Module Overview
//!
//! - [`app`]: `App`, the context every handler and callback receives
//! - [`dispatch`]: handler table and the mode-independent base handlers
//! - [`events`]: bounded FIFO event queue with a thread-safe producer handle
//! - [`modes`]: grid, arc, midi and div modes
//! - [`phasor`] / [`clock`]: the tick source and the raw clock timer
//! - [`wave`]: per-voice edge lists with cross-cycle carry
//! - [`divider`]: divisor outputs for arc mode
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`persistence`]: JSON state blocks over a `Storage` backend

pub mod app;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod divider;
pub mod events;
pub mod hardware;
pub mod mailbox;
pub mod modes;
pub mod persistence;
pub mod phasor;
pub mod wave;

pub use app::App;
pub use config::{Config, Settings};
pub use events::{EventQueue, EventSender};
