use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use parking_lot::{Condvar, Mutex};

/// Returned by [`Keyboard::next_press`] when no key is held.
pub const NO_KEY: u8 = 0xFF;

/// Upper bound on how long a key wait sleeps before re-checking cancellation.
const WAIT_RECHECK: Duration = Duration::from_millis(10);

/// State of the 16-key hex keypad, bit `k` set while key `k` is held.
///
/// Written by the input driver, read by the CPU thread.
#[derive(Default)]
pub struct Keyboard {
    state: Mutex<u16>,
    changed: Condvar,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole key mask.
    pub fn update(&self, mask: u16) {
        *self.state.lock() = mask;
        self.changed.notify_all();
    }

    /// Current key mask.
    pub fn mask(&self) -> u16 {
        *self.state.lock()
    }

    /// Keys above 0xF are never pressed.
    pub fn is_pressed(&self, key: u8) -> bool {
        key < 16 && *self.state.lock() & (1 << key) != 0
    }

    /// Lowest held key, or [`NO_KEY`].
    pub fn next_press(&self) -> u8 {
        lowest_key(*self.state.lock()).unwrap_or(NO_KEY)
    }

    /// Blocks until a key is held or `cancel` becomes true.
    ///
    /// Returns `None` when cancelled.
    pub fn wait_for_press(&self, cancel: &AtomicBool) -> Option<u8> {
        let mut state = self.state.lock();
        loop {
            if cancel.load(Ordering::Acquire) {
                return None;
            }
            if let Some(key) = lowest_key(*state) {
                return Some(key);
            }
            self.changed.wait_for(&mut state, WAIT_RECHECK);
        }
    }

    /// Wakes any thread blocked in [`wait_for_press`](Self::wait_for_press).
    pub fn wake(&self) {
        self.changed.notify_all();
    }
}

fn lowest_key(mask: u16) -> Option<u8> {
    (mask != 0).then(|| mask.trailing_zeros() as u8)
}
