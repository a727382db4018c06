use rand::{Rng, SeedableRng, TryRngCore, rngs::OsRng, rngs::StdRng};

use super::RandomError;

/// Receives the sound timer's zero crossing. Must return quickly.
pub trait Beeper: Send + Sync {
    fn beep(&self);
}

impl<F: Fn() + Send + Sync> Beeper for F {
    fn beep(&self) {
        self()
    }
}

/// Beeper for headless runs.
pub struct SilentBeeper;

impl Beeper for SilentBeeper {
    fn beep(&self) {
        log::debug!("Beep");
    }
}

/// Byte source for `Cxnn`.
pub trait RandomSource: Send {
    fn random_byte(&mut self) -> Result<u8, RandomError>;
}

/// Reads from the operating system; a failure is fatal for the instruction.
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn random_byte(&mut self) -> Result<u8, RandomError> {
        let mut byte = [0u8; 1];
        OsRng
            .try_fill_bytes(&mut byte)
            .map_err(|e| RandomError(e.to_string()))?;
        Ok(byte[0])
    }
}

/// Reproducible sequence from a fixed seed.
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn random_byte(&mut self) -> Result<u8, RandomError> {
        Ok(self.0.random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_repeat() {
        let mut a = SeededRandom::new(7);
        let mut b = SeededRandom::new(7);
        for _ in 0..32 {
            assert_eq!(a.random_byte().ok(), b.random_byte().ok());
        }
    }

    #[test]
    fn os_source_yields_bytes() {
        assert!(OsRandom.random_byte().is_ok());
    }

    #[test]
    fn closures_are_beepers() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let heard = AtomicBool::new(false);
        let beeper = || heard.store(true, Ordering::SeqCst);
        beeper.beep();
        assert!(heard.load(Ordering::SeqCst));
    }
}
