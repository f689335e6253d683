//! Lock-free single-slot mailbox.
//!
//! Carries a small value from the editing context to the tick context.
//! Posting overwrites any unread value; taking empties the slot. Neither side
//! ever blocks, and a reader can never observe a half-written value because
//! the slot is a single atomic word.

use std::sync::atomic::{AtomicU32, Ordering};

/// Set in the stored word when a value is present.
const PRESENT: u32 = 1 << 31;

pub struct Mailbox {
    slot: AtomicU32,
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU32::new(0),
        }
    }

    /// Post a value, replacing any unread one.
    pub fn post(&self, value: u16) {
        self.slot.store(PRESENT | value as u32, Ordering::Release);
    }

    /// Take the latest value, leaving the slot empty.
    pub fn take(&self) -> Option<u16> {
        let word = self.slot.swap(0, Ordering::AcqRel);
        if word & PRESENT != 0 {
            Some(word as u16)
        } else {
            None
        }
    }

    /// Value waiting to be taken, without consuming it.
    pub fn peek(&self) -> Option<u16> {
        let word = self.slot.load(Ordering::Acquire);
        (word & PRESENT != 0).then_some(word as u16)
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Mailbox").field(&self.peek()).finish()
    }
}
