use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Mutex, MutexGuard};

use super::{Chip8Error, FrameBuffer, Halt, Keyboard, Machine, MachineState, StepOutcome};

type Worker = JoinHandle<Result<Halt, Chip8Error>>;

/// Drives a [`Machine`] at a fixed CPU clock on a dedicated thread.
///
/// The machine sits behind a mutex held for one instruction at a time, so
/// the host can take snapshots or edit registers between instructions.
pub struct Scheduler {
    machine: Arc<Mutex<Machine>>,
    keyboard: Arc<Keyboard>,
    frame_buffer: Arc<FrameBuffer>,
    cpu_period: Duration,
    stop_requested: Arc<AtomicBool>,
    breakpoints: HashSet<u16>,
    worker: Option<Worker>,
}

impl Scheduler {
    pub fn new(machine: Machine) -> Self {
        Self {
            keyboard: Arc::clone(machine.keyboard()),
            frame_buffer: Arc::clone(machine.frame_buffer()),
            cpu_period: machine.config().cpu_clock_period,
            machine: Arc::new(Mutex::new(machine)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            breakpoints: HashSet::new(),
            worker: None,
        }
    }

    /// Starts (or resumes) the tick loop from the current program counter.
    ///
    /// Does nothing if the loop is already running.
    pub fn run(&mut self) -> Result<(), Chip8Error> {
        if self.is_running() {
            return Ok(());
        }
        // A loop that halted on its own is collected before starting over.
        if let Some(Err(e)) = self.poll() {
            log::warn!("Restarting after an unreported fault: {e}");
        }

        self.stop_requested.store(false, Ordering::Release);

        let machine = Arc::clone(&self.machine);
        let keyboard = Arc::clone(&self.keyboard);
        let stop = Arc::clone(&self.stop_requested);
        let breakpoints = self.breakpoints.clone();
        let period = self.cpu_period;

        let worker = thread::Builder::new()
            .name("chip8-cpu".into())
            .spawn(move || tick_loop(&machine, &keyboard, &stop, &breakpoints, period))
            .map_err(|source| Chip8Error::ThreadSpawn {
                thread: "CPU",
                source,
            })?;

        log::info!("CPU running at {:?} per instruction", period);
        self.worker = Some(worker);
        Ok(())
    }

    /// Requests cancellation and waits for the loop to finish its current instruction.
    ///
    /// Returns how the loop ended; a fault that halted it earlier is returned here.
    pub fn stop(&mut self) -> Result<Halt, Chip8Error> {
        self.stop_requested.store(true, Ordering::Release);
        self.keyboard.wake();

        let result = match self.worker.take() {
            Some(worker) => join(worker),
            None => Ok(Halt::Stopped),
        };
        log::info!("CPU stopped: {result:?}");
        result
    }

    /// Blocks until the loop halts by itself (fault or breakpoint).
    pub fn wait(&mut self) -> Result<Halt, Chip8Error> {
        match self.worker.take() {
            Some(worker) => join(worker),
            None => Ok(Halt::Stopped),
        }
    }

    /// Collects the result of a loop that has already halted.
    pub fn poll(&mut self) -> Option<Result<Halt, Chip8Error>> {
        if self.worker.as_ref()?.is_finished() {
            self.worker.take().map(join)
        } else {
            None
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Executes exactly one instruction on the calling thread.
    ///
    /// A pending `Fx0A` returns [`StepOutcome::AwaitingKey`] instead of blocking.
    pub fn step(&mut self) -> Result<StepOutcome, Chip8Error> {
        if self.is_running() {
            return Err(Chip8Error::SchedulerBusy);
        }
        self.lock().step()
    }

    /// Runs `f` with exclusive access to the machine, between two instructions.
    pub fn with_machine<R>(&self, f: impl FnOnce(&mut Machine) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> MachineState {
        self.lock().snapshot()
    }

    pub fn keyboard(&self) -> &Arc<Keyboard> {
        &self.keyboard
    }

    pub fn frame_buffer(&self) -> &Arc<FrameBuffer> {
        &self.frame_buffer
    }

    /// Breakpoints take effect on the next `run`.
    pub fn breakpoints(&self) -> &HashSet<u16> {
        &self.breakpoints
    }

    pub fn breakpoints_mut(&mut self) -> &mut HashSet<u16> {
        &mut self.breakpoints
    }

    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

fn join(worker: Worker) -> Result<Halt, Chip8Error> {
    worker.join().unwrap_or(Err(Chip8Error::WorkerPanicked))
}

fn tick_loop(
    machine: &Mutex<Machine>,
    keyboard: &Keyboard,
    stop: &AtomicBool,
    breakpoints: &HashSet<u16>,
    period: Duration,
) -> Result<Halt, Chip8Error> {
    let mut next_tick = Instant::now();

    loop {
        next_tick += period;
        match next_tick.checked_duration_since(Instant::now()) {
            Some(remaining) => thread::sleep(remaining),
            // Fell behind (e.g. after a key wait); don't try to catch up.
            None => next_tick = Instant::now(),
        }

        if stop.load(Ordering::Acquire) {
            return Ok(Halt::Stopped);
        }

        let (outcome, pc) = {
            let mut machine = machine.lock();
            (machine.step(), machine.pc())
        };

        match outcome {
            Ok(StepOutcome::Executed) => {}
            Ok(StepOutcome::AwaitingKey) => {
                log::debug!("Waiting for a key at {pc:#05X}");
                // The instruction is retried on the next tick once a key is down.
                keyboard.wait_for_press(stop);
            }
            Err(e) => {
                log::error!("CPU halted: {e}");
                return Err(e);
            }
        }

        if stop.load(Ordering::Acquire) {
            return Ok(Halt::Stopped);
        }

        if breakpoints.contains(&pc) {
            log::debug!("Hit breakpoint at {pc:#05X}");
            return Ok(Halt::Breakpoint { address: pc });
        }
    }
}
