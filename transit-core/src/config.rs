use std::path::{Path, PathBuf};

use serde::Deserialize;

use transit_types::{DivState, MidiState, MAX_CLOCK_RATE, PPQ};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    clock: ClockConfig,
    #[serde(default)]
    events: EventsConfig,
    #[serde(default)]
    input: InputConfig,
    #[serde(default)]
    timers: TimersConfig,
    #[serde(default)]
    engine: EngineConfig,
}

#[derive(Deserialize, Default)]
struct ClockConfig {
    rate: Option<u16>,
    div_period_ms: Option<u32>,
    midi_period_ms: Option<u32>,
}

#[derive(Deserialize, Default)]
struct EventsConfig {
    queue_capacity: Option<usize>,
}

#[derive(Deserialize, Default)]
struct InputConfig {
    front_hold_ticks: Option<u8>,
    step_toggle_window: Option<u8>,
}

#[derive(Deserialize, Default)]
struct TimersConfig {
    key_ms: Option<u64>,
    adc_ms: Option<u64>,
    refresh_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    pulse_width: Option<u8>,
}

/// Resolved runtime settings handed to the application context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub clock_rate: u16,
    pub div_period_ms: u32,
    pub midi_period_ms: u32,
    pub queue_capacity: usize,
    pub front_hold_ticks: u8,
    pub step_toggle_window: u8,
    pub key_ms: u64,
    pub adc_ms: u64,
    pub refresh_ms: u64,
    pub pulse_width: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Config::embedded().settings()
    }
}

impl Settings {
    pub fn div_defaults(&self) -> DivState {
        DivState {
            clock_period_ms: self.div_period_ms,
        }
    }

    pub fn midi_defaults(&self) -> MidiState {
        MidiState {
            clock_period_ms: self.midi_period_ms,
        }
    }
}

pub struct Config {
    clock: ClockConfig,
    events: EventsConfig,
    input: InputConfig,
    timers: TimersConfig,
    engine: EngineConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if present.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::embedded(),
        }
    }

    /// Embedded defaults merged with the file at `path`. A missing or
    /// malformed file leaves the defaults untouched.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        if !path.exists() {
            return config;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => config.merge(user),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
            }
        }
        config
    }

    pub fn embedded() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Self {
            clock: base.clock,
            events: base.events,
            input: base.input,
            timers: base.timers,
            engine: base.engine,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            clock_rate: self.clock.rate.unwrap_or(640).min(MAX_CLOCK_RATE),
            div_period_ms: self.clock.div_period_ms.unwrap_or(100).max(1),
            midi_period_ms: self.clock.midi_period_ms.unwrap_or(100).max(1),
            queue_capacity: self.events.queue_capacity.unwrap_or(40).clamp(1, 4096),
            front_hold_ticks: self.input.front_hold_ticks.unwrap_or(8).max(1),
            step_toggle_window: self.input.step_toggle_window.unwrap_or(4),
            key_ms: self.timers.key_ms.unwrap_or(50).max(1),
            adc_ms: self.timers.adc_ms.unwrap_or(100).max(1),
            refresh_ms: self.timers.refresh_ms.unwrap_or(30).max(1),
            pulse_width: self.engine.pulse_width.unwrap_or(4).clamp(1, PPQ - 1),
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        merge_clock(&mut self.clock, user.clock);
        if user.events.queue_capacity.is_some() {
            self.events.queue_capacity = user.events.queue_capacity;
        }
        if user.input.front_hold_ticks.is_some() {
            self.input.front_hold_ticks = user.input.front_hold_ticks;
        }
        if user.input.step_toggle_window.is_some() {
            self.input.step_toggle_window = user.input.step_toggle_window;
        }
        merge_timers(&mut self.timers, user.timers);
        if user.engine.pulse_width.is_some() {
            self.engine.pulse_width = user.engine.pulse_width;
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("transit").join("config.toml"))
}

fn merge_clock(base: &mut ClockConfig, user: ClockConfig) {
    if user.rate.is_some() {
        base.rate = user.rate;
    }
    if user.div_period_ms.is_some() {
        base.div_period_ms = user.div_period_ms;
    }
    if user.midi_period_ms.is_some() {
        base.midi_period_ms = user.midi_period_ms;
    }
}

fn merge_timers(base: &mut TimersConfig, user: TimersConfig) {
    if user.key_ms.is_some() {
        base.key_ms = user.key_ms;
    }
    if user.adc_ms.is_some() {
        base.adc_ms = user.adc_ms;
    }
    if user.refresh_ms.is_some() {
        base.refresh_ms = user.refresh_ms;
    }
}
