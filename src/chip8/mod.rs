//! The CHIP-8 execution engine.
//!
//! A [`Machine`] owns memory, registers and the call stack; its [`Timer`]s,
//! [`FrameBuffer`] and [`Keyboard`] are shared with host threads. A
//! [`Scheduler`] runs the machine at a fixed clock on its own thread.

mod config;
mod disasm;
mod execute;
mod font;
mod frame_buffer;
mod keyboard;
mod machine;
mod opcode;
mod peripherals;
mod scheduler;
mod timer;
mod types;

pub use config::*;
pub use disasm::*;
pub use font::*;
pub use frame_buffer::*;
pub use keyboard::*;
pub use machine::{MEMORY_SIZE, Machine, MachineState, REGISTER_COUNT};
pub use opcode::*;
pub use peripherals::*;
pub use scheduler::*;
pub use timer::*;
pub use types::*;
