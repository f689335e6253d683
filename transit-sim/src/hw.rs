//! Simulated output jacks and control surface.

use std::cell::RefCell;
use std::rc::Rc;

use transit_core::hardware::{LedBuffer, OutputPins, Surface};
use transit_types::OUTPUT_COUNT;

/// What the outputs and the display did during a run.
#[derive(Debug, Default)]
pub struct Activity {
    pub rises: [u64; OUTPUT_COUNT],
    pub clock_rises: u64,
    pub frames: u64,
    pub lit: usize,
}

pub type SharedActivity = Rc<RefCell<Activity>>;

/// Output bank that counts rising edges and traces every change.
pub struct TracePins {
    levels: [bool; OUTPUT_COUNT],
    clock: bool,
    activity: SharedActivity,
}

impl TracePins {
    pub fn new(activity: SharedActivity) -> Self {
        Self {
            levels: [false; OUTPUT_COUNT],
            clock: false,
            activity,
        }
    }

    fn write(&mut self, index: usize, high: bool) {
        let Some(level) = self.levels.get_mut(index) else {
            log::warn!(target: "pins", "write to missing output {}", index);
            return;
        };
        if *level == high {
            return;
        }
        *level = high;
        if high {
            self.activity.borrow_mut().rises[index] += 1;
        }
        log::trace!(target: "pins", "out {} {}", index, if high { "high" } else { "low" });
    }
}

impl OutputPins for TracePins {
    fn set(&mut self, index: usize) {
        self.write(index, true);
    }

    fn clear(&mut self, index: usize) {
        self.write(index, false);
    }

    fn read(&self, index: usize) -> bool {
        self.levels.get(index).copied().unwrap_or(false)
    }

    fn set_clock_out(&mut self, high: bool) {
        if high && !self.clock {
            self.activity.borrow_mut().clock_rises += 1;
        }
        self.clock = high;
    }

    fn clock_out(&self) -> bool {
        self.clock
    }
}

/// Surface that keeps only frame statistics.
pub struct TraceSurface {
    activity: SharedActivity,
}

impl TraceSurface {
    pub fn new(activity: SharedActivity) -> Self {
        Self { activity }
    }
}

impl Surface for TraceSurface {
    fn refresh(&mut self, leds: &LedBuffer) {
        let mut activity = self.activity.borrow_mut();
        activity.frames += 1;
        activity.lit = leds.iter().filter(|&&l| l > 0).count();
        log::trace!(target: "surface", "frame {} ({} lit)", activity.frames, activity.lit);
    }
}
