use clap::{Parser, Subcommand};
use clap_num::maybe_hex;

use crate::chip8::{Chip8Error, DisasmLine};
use crate::u4;

/// Debugger command line, parsed from whitespace-separated input.
#[derive(Parser)]
#[command(multicall = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Resume the CPU clock
    #[command(visible_alias = "r")]
    Run,

    /// Stop the CPU clock after the current instruction
    #[command(visible_alias = "p")]
    Pause,

    /// Execute a single instruction
    #[command(visible_alias = "s")]
    Step,

    #[command(visible_alias = "b")]
    Breakpoint {
        #[command(subcommand)]
        action: BreakpointAction,
    },

    /// Write a register: v0-vf, i or pc
    Set {
        #[arg(value_parser = parse_set_target)]
        target: SetTarget,
        #[arg(value_parser = maybe_hex::<u16>)]
        value: u16,
    },

    /// Dump memory
    #[command(visible_alias = "m")]
    Mem {
        #[arg(default_value = "0x200", value_parser = maybe_hex::<u16>)]
        start: u16,
        #[arg(default_value = "64", value_parser = maybe_hex::<u16>)]
        len: u16,
    },

    /// Disassemble instructions, starting at the program counter by default
    #[command(visible_alias = "d")]
    Disasm {
        #[arg(value_parser = maybe_hex::<u16>)]
        start: Option<u16>,
        #[arg(default_value = "8", value_parser = maybe_hex::<u16>)]
        count: u16,
    },

    #[command(visible_alias = "q")]
    Quit,
}

pub enum CommandResult {
    Ok,
    /// `Fx0A` is pending; stepping again retries it.
    AwaitingKey,
    Breakpoints(Vec<u16>),
    MemDump { data: Vec<u8>, offset: u16 },
    Disasm { lines: Vec<DisasmLine> },
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Error while executing cpu instruction: {0}")]
    Chip8Error(#[from] Chip8Error),
    #[error("Value {value:#X} out of range for {target}")]
    ValueOutOfRange { target: &'static str, value: u16 },
}

#[derive(Subcommand, Clone, Debug)]
pub enum BreakpointAction {
    #[command(visible_alias = "s")]
    Set {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "c")]
    Clear {
        #[arg(value_parser = maybe_hex::<u16>)]
        addr: u16,
    },

    #[command(visible_alias = "l")]
    List,

    #[command(visible_alias = "ca")]
    ClearAll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetTarget {
    V(u4),
    I,
    Pc,
}

fn parse_set_target(s: &str) -> Result<SetTarget, String> {
    let lower = s.to_lowercase();

    match lower.as_str() {
        "index" | "i" => Ok(SetTarget::I),
        "pc" => Ok(SetTarget::Pc),

        _ if lower.starts_with('v') => match u8::from_str_radix(&lower[1..], 16) {
            Ok(val) if val < 16 => Ok(SetTarget::V(u4::new(val))),
            _ => Err(format!("Invalid register: '{}'", s)),
        },

        _ => Err(format!("Unknown set target: '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        Cli::try_parse_from(line.split_whitespace()).map(|cli| cli.command)
    }

    #[test]
    fn parses_aliases() {
        assert!(matches!(parse("r"), Ok(Command::Run)));
        assert!(matches!(parse("p"), Ok(Command::Pause)));
        assert!(matches!(parse("s"), Ok(Command::Step)));
        assert!(matches!(parse("q"), Ok(Command::Quit)));
    }

    #[test]
    fn parses_breakpoints_in_hex_and_decimal() {
        assert!(matches!(
            parse("b s 0x20A"),
            Ok(Command::Breakpoint {
                action: BreakpointAction::Set { addr: 0x20A }
            })
        ));
        assert!(matches!(
            parse("breakpoint clear 512"),
            Ok(Command::Breakpoint {
                action: BreakpointAction::Clear { addr: 512 }
            })
        ));
    }

    #[test]
    fn parses_set_targets() {
        assert!(matches!(
            parse("set vA 0xFF"),
            Ok(Command::Set {
                target: SetTarget::V(v),
                value: 0xFF
            }) if v == u4::new(0xA)
        ));
        assert!(matches!(
            parse("set pc 0x300"),
            Ok(Command::Set {
                target: SetTarget::Pc,
                value: 0x300
            })
        ));
        assert!(parse("set vg 1").is_err());
        assert!(parse("set sp 1").is_err());
    }

    #[test]
    fn mem_and_disasm_have_defaults() {
        assert!(matches!(
            parse("m"),
            Ok(Command::Mem {
                start: 0x200,
                len: 64
            })
        ));
        assert!(matches!(
            parse("d"),
            Ok(Command::Disasm {
                start: None,
                count: 8
            })
        ));
        assert!(matches!(
            parse("disasm 0x300 4"),
            Ok(Command::Disasm {
                start: Some(0x300),
                count: 4
            })
        ));
    }
}
