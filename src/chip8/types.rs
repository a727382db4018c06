/// Result of a single CPU step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction ran and the program pointer moved on.
    Executed,
    /// `Fx0A` found no key held; the program pointer still points at it.
    AwaitingKey,
}

/// Why a running tick loop stopped without a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
    /// `stop()` was requested.
    Stopped,
    /// The program pointer reached a registered breakpoint.
    Breakpoint { address: u16 },
}

/// Failure reported by a [`RandomSource`](super::RandomSource).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RandomError(pub String);

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("Program image is too large ({size} bytes), max size is {max_size} bytes")]
    MemoryLoadOverflow { size: usize, max_size: usize },

    #[error("Unknown instruction {opcode:#06X} at address {address:#05X}")]
    Decode { address: u16, opcode: u16 },

    #[error("Stack underflow: RET ({opcode:#06X}) at {address:#05X} with empty call stack")]
    StackUnderflow { address: u16, opcode: u16 },

    #[error("Stack overflow: CALL ({opcode:#06X}) at {address:#05X} exceeds depth {limit}")]
    StackOverflow {
        address: u16,
        opcode: u16,
        limit: usize,
    },

    #[error("Random source failed for {opcode:#06X} at {address:#05X}: {source}")]
    RandomSource {
        address: u16,
        opcode: u16,
        #[source]
        source: RandomError,
    },

    #[error("The scheduler is running, stop it before stepping")]
    SchedulerBusy,

    #[error("The CPU thread panicked")]
    WorkerPanicked,

    #[error("Failed to spawn the {thread} thread: {source}")]
    ThreadSpawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Rejected [`Config`](super::Config) values.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Program offset {offset:#05X} overlaps the built-in glyphs (must be >= {min:#05X})")]
    OffsetInGlyphArea { offset: u16, min: u16 },

    #[error("Program offset {offset:#05X} is past the end of memory")]
    OffsetOutOfMemory { offset: u16 },

    #[error("Program offset {offset:#05X} is not instruction aligned")]
    OffsetMisaligned { offset: u16 },

    #[error("The {0} clock period must be non-zero")]
    ZeroPeriod(&'static str),

    #[error("A stack limit of zero forbids every CALL")]
    ZeroStackLimit,
}
