use std::sync::Arc;

use super::{
    Beeper, Chip8Error, Config, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, FrameBuffer, Keyboard,
    Opcode, OsRandom, RandomSource, StepOutcome, Timer,
};
use crate::u4;

// Fixed by the CHIP-8 architecture
pub const MEMORY_SIZE: usize = 4096;
pub const REGISTER_COUNT: usize = 16;

/// Copy of the CPU-side state, taken for debug display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineState {
    pub pc: u16,
    pub i: u16,
    pub v: [u8; REGISTER_COUNT],
    pub stack: Vec<u16>,
    pub delay_timer: u8,
    pub sound_timer: u8,
}

/// CHIP-8 virtual machine state
pub struct Machine {
    pub(crate) config: Config,

    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; REGISTER_COUNT],
    /// Call stack for subroutine returns
    pub(crate) stack: Vec<u16>,

    pub(crate) delay_timer: Timer,
    /// Fires the beeper when it reaches zero
    pub(crate) sound_timer: Timer,

    pub(crate) frame_buffer: Arc<FrameBuffer>,
    pub(crate) keyboard: Arc<Keyboard>,
    pub(crate) random: Box<dyn RandomSource>,
}

impl Machine {
    /// Builds a machine with glyphs in place, registers cleared and both timers running.
    pub fn new(config: Config, beeper: Arc<dyn Beeper>) -> Result<Self, Chip8Error> {
        config.validate()?;

        let mut memory = [0; MEMORY_SIZE];
        memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        let delay_timer = Timer::new(config.timer_period, Box::new(|| {}))?;
        let sound_timer = Timer::new(config.timer_period, Box::new(move || beeper.beep()))?;

        Ok(Machine {
            pc: config.program_offset,
            config,
            memory,
            i: 0,
            v: [0; REGISTER_COUNT],
            stack: Vec::new(),
            delay_timer,
            sound_timer,
            frame_buffer: Arc::new(FrameBuffer::new()),
            keyboard: Arc::new(Keyboard::new()),
            random: Box::new(OsRandom),
        })
    }

    /// Replaces the byte source used by `Cxnn`.
    pub fn with_random_source(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Copies a program image to the configured offset and points the CPU at it.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        let start = self.config.program_offset as usize;
        let end = start + program.len();

        self.memory
            .get_mut(start..end)
            .ok_or(Chip8Error::MemoryLoadOverflow {
                size: program.len(),
                max_size: self.config.max_program_size(),
            })?
            .copy_from_slice(program);

        self.pc = self.config.program_offset;
        log::info!("Loaded {} bytes at {start:#05X}", program.len());

        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    pub fn step(&mut self) -> Result<StepOutcome, Chip8Error> {
        let address = self.pc;
        let raw = self.fetch();
        let opcode = Opcode::decode(raw);
        log::trace!("{address:#05X}: {raw:04X} {opcode}");

        let outcome = self.execute(opcode, address, raw);
        if outcome.is_err() {
            // A fault leaves the program counter on the faulting instruction.
            self.pc = address;
        }
        outcome
    }

    /// Fetches the 16-bit word at the program counter.
    pub fn fetch(&self) -> u16 {
        u16::from_be_bytes([
            self.memory[mem_index(self.pc)],
            self.memory[mem_index(self.pc.wrapping_add(1))],
        ])
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn set_i(&mut self, i: u16) {
        self.i = i;
    }

    pub fn v(&self) -> &[u8; REGISTER_COUNT] {
        &self.v
    }

    pub fn set_v(&mut self, x: u4, value: u8) {
        self.v[x] = value;
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn delay_timer(&self) -> &Timer {
        &self.delay_timer
    }

    pub fn sound_timer(&self) -> &Timer {
        &self.sound_timer
    }

    /// Shared handle for renderers.
    pub fn frame_buffer(&self) -> &Arc<FrameBuffer> {
        &self.frame_buffer
    }

    /// Shared handle for input drivers.
    pub fn keyboard(&self) -> &Arc<Keyboard> {
        &self.keyboard
    }

    pub fn snapshot(&self) -> MachineState {
        MachineState {
            pc: self.pc,
            i: self.i,
            v: self.v,
            stack: self.stack.clone(),
            delay_timer: self.delay_timer.read(),
            sound_timer: self.sound_timer.read(),
        }
    }
}

/// Memory index of a 16-bit address; addresses wrap at the end of memory.
pub(crate) fn mem_index(addr: u16) -> usize {
    addr as usize % MEMORY_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip8::SilentBeeper;

    fn machine() -> Machine {
        Machine::new(Config::default(), Arc::new(SilentBeeper)).unwrap()
    }

    #[test]
    fn new_machine_has_glyphs_and_clean_registers() {
        let m = machine();
        assert_eq!(&m.memory[0..5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(&m.memory[50..55], &[0xF0, 0x90, 0xF0, 0x90, 0x90]);
        assert!(m.memory[FONT_END_ADDRESS..].iter().all(|&b| b == 0));
        assert_eq!(m.pc, 0x200);
        assert_eq!(m.i, 0);
        assert_eq!(m.v, [0; 16]);
        assert!(m.stack.is_empty());
        assert_eq!(m.delay_timer.read(), 0);
        assert_eq!(m.sound_timer.read(), 0);
    }

    #[test]
    fn load_places_the_image_at_the_offset() {
        let mut m = machine();
        m.pc = 0x300;
        m.load(&[0xAB, 0xCD, 0xEF]).unwrap();
        assert_eq!(&m.memory[0x200..0x203], &[0xAB, 0xCD, 0xEF]);
        assert_eq!(m.pc, 0x200);
        assert_eq!(m.fetch(), 0xABCD);
    }

    #[test]
    fn load_accepts_exactly_the_available_space() {
        let mut m = machine();
        assert!(m.load(&[0x11; MEMORY_SIZE - 0x200]).is_ok());
        assert_eq!(m.memory[MEMORY_SIZE - 1], 0x11);
    }

    #[test]
    fn load_rejects_oversized_images() {
        let mut m = machine();
        let err = m.load(&[0; MEMORY_SIZE - 0x200 + 1]).unwrap_err();
        assert!(matches!(
            err,
            Chip8Error::MemoryLoadOverflow {
                size: 3585,
                max_size: 3584
            }
        ));
        assert!(m.memory[0x200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn custom_offset_moves_the_entry_point() {
        let config = Config::default().with_program_offset(0x600);
        let mut m = Machine::new(config, Arc::new(SilentBeeper)).unwrap();
        assert_eq!(m.pc, 0x600);
        m.load(&[0x00, 0xE0]).unwrap();
        assert_eq!(m.memory[0x601], 0xE0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config::default().with_program_offset(0x10);
        assert!(matches!(
            Machine::new(config, Arc::new(SilentBeeper)),
            Err(Chip8Error::Config(_))
        ));
    }

    #[test]
    fn fetch_wraps_at_the_end_of_memory() {
        let mut m = machine();
        m.memory[MEMORY_SIZE - 1] = 0x12;
        m.memory[0] = 0x34;
        m.pc = (MEMORY_SIZE - 1) as u16;
        assert_eq!(m.fetch(), 0x1234);
    }
}
