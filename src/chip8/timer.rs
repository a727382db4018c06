use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::Chip8Error;

/// Callback fired when a timer counts down to zero.
pub type OnZero = Box<dyn Fn() + Send + Sync>;

struct TimerState {
    value: Mutex<u8>,
    on_zero: OnZero,
}

impl TimerState {
    /// One decay period: decrement while above zero, fire on the 1 -> 0 edge.
    fn tick(&self) {
        let reached_zero = {
            let mut value = self.value.lock();
            if *value == 0 {
                return;
            }
            *value -= 1;
            *value == 0
        };

        // The lock is released first so the callback may read or set the timer.
        if reached_zero {
            (self.on_zero)();
        }
    }
}

/// An 8-bit countdown register decaying on its own thread at a fixed rate.
pub struct Timer {
    state: Arc<TimerState>,
    shutdown: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Timer {
    /// Creates a timer at zero and starts its decay loop immediately.
    pub fn new(period: Duration, on_zero: OnZero) -> Result<Self, Chip8Error> {
        let state = Arc::new(TimerState {
            value: Mutex::new(0),
            on_zero,
        });
        let (shutdown, shutdown_rx) = channel::bounded::<()>(0);

        let worker_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("chip8-timer".into())
            .spawn(move || {
                // Sleeping on the channel lets `Drop` interrupt a long period.
                while let Err(RecvTimeoutError::Timeout) = shutdown_rx.recv_timeout(period) {
                    worker_state.tick();
                }
            })
            .map_err(|source| Chip8Error::ThreadSpawn {
                thread: "timer",
                source,
            })?;

        Ok(Self {
            state,
            shutdown: Some(shutdown),
            worker: Some(worker),
        })
    }

    /// Replaces the counter value.
    pub fn set(&self, value: u8) {
        *self.state.value.lock() = value;
    }

    /// Returns the current counter value.
    pub fn read(&self) -> u8 {
        *self.state.value.lock()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the worker.
        self.shutdown.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
