use super::commands::{BreakpointAction, Command, CommandError, CommandResult, SetTarget};
use crate::chip8::{
    Chip8Error, FrameBuffer, Halt, Keyboard, MEMORY_SIZE, MachineState, Scheduler, StepOutcome,
    disassemble,
};
use std::sync::Arc;

/// Applies debugger commands to a [`Scheduler`].
pub struct Executor {
    scheduler: Scheduler,
}

impl Executor {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Reports a run that ended on its own (breakpoint or fault) since the last poll.
    pub fn poll(&mut self) -> Option<Result<Halt, Chip8Error>> {
        self.scheduler.poll()
    }

    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        match command {
            Command::Run => {
                self.scheduler.run()?;
                Ok(CommandResult::Ok)
            }
            Command::Pause => self.pause(),
            Command::Step => self.step(),
            Command::Breakpoint { action } => Ok(self.handle_breakpoint(action)),
            Command::Set { target, value } => self.handle_set(target, value),
            Command::Mem { start, len } => Ok(self.handle_mem(start, len)),
            Command::Disasm { start, count } => Ok(self.handle_disasm(start, count)),
            Command::Quit => Ok(CommandResult::Quit),
        }
    }

    pub fn pause(&mut self) -> Result<CommandResult, CommandError> {
        self.scheduler.stop()?;
        Ok(CommandResult::Ok)
    }

    pub fn step(&mut self) -> Result<CommandResult, CommandError> {
        Ok(match self.scheduler.step()? {
            StepOutcome::Executed => CommandResult::Ok,
            StepOutcome::AwaitingKey => CommandResult::AwaitingKey,
        })
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn snapshot(&self) -> MachineState {
        self.scheduler.snapshot()
    }

    pub fn frame_buffer(&self) -> &Arc<FrameBuffer> {
        self.scheduler.frame_buffer()
    }

    pub fn keyboard(&self) -> &Arc<Keyboard> {
        self.scheduler.keyboard()
    }

    fn handle_breakpoint(&mut self, action: BreakpointAction) -> CommandResult {
        let breakpoints = self.scheduler.breakpoints_mut();

        match action {
            BreakpointAction::Set { addr } => {
                breakpoints.insert(addr);
            }
            BreakpointAction::Clear { addr } => {
                breakpoints.remove(&addr);
            }
            BreakpointAction::ClearAll => {
                breakpoints.clear();
            }
            BreakpointAction::List => {
                let mut bps: Vec<u16> = breakpoints.iter().copied().collect();
                bps.sort();
                return CommandResult::Breakpoints(bps);
            }
        };

        CommandResult::Ok
    }

    fn handle_set(&mut self, target: SetTarget, value: u16) -> Result<CommandResult, CommandError> {
        let limit = match target {
            SetTarget::V(_) => ("a V register", u8::MAX as u16),
            SetTarget::I | SetTarget::Pc => ("an address", (MEMORY_SIZE - 1) as u16),
        };
        if value > limit.1 {
            return Err(CommandError::ValueOutOfRange {
                target: limit.0,
                value,
            });
        }

        self.scheduler.with_machine(|machine| match target {
            SetTarget::V(reg) => machine.set_v(reg, value as u8),
            SetTarget::I => machine.set_i(value),
            SetTarget::Pc => machine.set_pc(value),
        });

        Ok(CommandResult::Ok)
    }

    fn handle_mem(&self, start: u16, len: u16) -> CommandResult {
        CommandResult::MemDump {
            data: self.read_memory(start, len as usize),
            offset: start,
        }
    }

    fn handle_disasm(&self, start: Option<u16>, count: u16) -> CommandResult {
        let start = start.unwrap_or_else(|| self.scheduler.snapshot().pc);
        let bytes = self.read_memory(start, count as usize * 2);
        CommandResult::Disasm {
            lines: disassemble(&bytes, start),
        }
    }

    /// Copies `len` bytes from `start`, wrapping at the end of memory.
    fn read_memory(&self, start: u16, len: usize) -> Vec<u8> {
        self.scheduler.with_machine(|machine| {
            let memory = machine.memory();
            (0..len)
                .map(|offset| memory[(start as usize + offset) % MEMORY_SIZE])
                .collect()
        })
    }
}
