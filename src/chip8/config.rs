use std::time::Duration;

use super::{ConfigError, FONT_END_ADDRESS, MEMORY_SIZE};

pub const DEFAULT_PROGRAM_OFFSET: u16 = 0x200;
pub const DEFAULT_CPU_HZ: f64 = 500.0;
pub const DEFAULT_TIMER_HZ: f64 = 60.0;

/// Settings fixed for the lifetime of a [`Machine`](super::Machine).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Where `load` places the program image and where execution starts.
    pub program_offset: u16,
    /// Time between two CPU instructions while the scheduler runs.
    pub cpu_clock_period: Duration,
    /// Time between two decrements of the delay and sound timers.
    pub timer_period: Duration,
    /// Maximum call depth; `None` leaves the stack unbounded.
    pub stack_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program_offset: DEFAULT_PROGRAM_OFFSET,
            cpu_clock_period: Duration::from_secs_f64(1.0 / DEFAULT_CPU_HZ),
            timer_period: Duration::from_secs_f64(1.0 / DEFAULT_TIMER_HZ),
            stack_limit: None,
        }
    }
}

impl Config {
    pub fn with_program_offset(mut self, offset: u16) -> Self {
        self.program_offset = offset;
        self
    }

    /// Sets the CPU clock from a frequency; non-positive rates give a zero period.
    pub fn with_cpu_hz(mut self, hz: f64) -> Self {
        self.cpu_clock_period = hz_to_period(hz);
        self
    }

    pub fn with_cpu_clock_period(mut self, period: Duration) -> Self {
        self.cpu_clock_period = period;
        self
    }

    pub fn with_timer_period(mut self, period: Duration) -> Self {
        self.timer_period = period;
        self
    }

    pub fn with_stack_limit(mut self, limit: Option<usize>) -> Self {
        self.stack_limit = limit;
        self
    }

    /// Number of bytes `load` accepts.
    pub fn max_program_size(&self) -> usize {
        MEMORY_SIZE.saturating_sub(self.program_offset as usize)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let offset = self.program_offset;

        if (offset as usize) < FONT_END_ADDRESS {
            return Err(ConfigError::OffsetInGlyphArea {
                offset,
                min: FONT_END_ADDRESS as u16,
            });
        }
        if offset as usize >= MEMORY_SIZE {
            return Err(ConfigError::OffsetOutOfMemory { offset });
        }
        if offset % 2 != 0 {
            return Err(ConfigError::OffsetMisaligned { offset });
        }
        if self.cpu_clock_period.is_zero() {
            return Err(ConfigError::ZeroPeriod("CPU"));
        }
        if self.timer_period.is_zero() {
            return Err(ConfigError::ZeroPeriod("timer"));
        }
        if self.stack_limit == Some(0) {
            return Err(ConfigError::ZeroStackLimit);
        }

        Ok(())
    }
}

fn hz_to_period(hz: f64) -> Duration {
    if hz.is_finite() && hz > 0.0 {
        Duration::from_secs_f64(1.0 / hz)
    } else {
        Duration::ZERO
    }
}
