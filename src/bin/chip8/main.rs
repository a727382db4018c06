mod tui;
mod window;

use std::{fs::File, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use log::LevelFilter;

use chip8_vm::chip8::{
    Beeper, Config, DEFAULT_CPU_HZ, DEFAULT_PROGRAM_OFFSET, Machine, SeededRandom,
    disassemble_to_string,
};

/// CHIP-8 virtual machine.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
#[derive(Parser)]
#[command(about)]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a ROM in a window
    Run(MachineArgs),
    /// Step through a ROM in a terminal debugger
    Debug(MachineArgs),
    /// Print a disassembly of a ROM
    Dis {
        /// Path to the CHIP-8 ROM file
        rom_path: PathBuf,
        /// Address of the first instruction
        #[arg(long, default_value_t = DEFAULT_PROGRAM_OFFSET, value_parser = maybe_hex::<u16>)]
        base: u16,
    },
}

#[derive(clap::Args)]
struct MachineArgs {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Instructions per second
    #[arg(long, default_value_t = DEFAULT_CPU_HZ)]
    cpu_hz: f64,

    /// Load address of the program
    #[arg(long, default_value_t = DEFAULT_PROGRAM_OFFSET, value_parser = maybe_hex::<u16>)]
    offset: u16,

    /// Fail on CALL deeper than this (unbounded if omitted)
    #[arg(long)]
    stack_limit: Option<usize>,

    /// Seed for a reproducible random number sequence
    #[arg(long)]
    seed: Option<u64>,
}

impl MachineArgs {
    fn build(&self, beeper: Arc<dyn Beeper>) -> anyhow::Result<Machine> {
        let rom = std::fs::read(&self.rom_path).context("Failed to read ROM file")?;

        let config = Config::default()
            .with_cpu_hz(self.cpu_hz)
            .with_program_offset(self.offset)
            .with_stack_limit(self.stack_limit);

        let mut machine = Machine::new(config, beeper).context("Invalid machine configuration")?;
        if let Some(seed) = self.seed {
            machine = machine.with_random_source(Box::new(SeededRandom::new(seed)));
        }
        machine
            .load(&rom)
            .context("Failed to load ROM into CHIP-8 memory")?;

        Ok(machine)
    }
}

fn init_logging(verbose: u8, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Off);
    match verbose {
        0 => {}
        1 => {
            builder.filter_module("chip8_vm", LevelFilter::Debug);
        }
        _ => {
            builder.filter_module("chip8_vm", LevelFilter::Trace);
        }
    }
    builder.parse_default_env();

    if let Some(path) = log_file {
        let file = File::create(path).context("Failed to create log file")?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.log_file.as_ref())?;

    match args.mode {
        Mode::Run(machine_args) => window::run(&machine_args),
        Mode::Debug(machine_args) => tui::run(&machine_args),
        Mode::Dis { rom_path, base } => {
            let rom = std::fs::read(&rom_path).context("Failed to read ROM file")?;
            print!("{}", disassemble_to_string(&rom, base));
            Ok(())
        }
    }
}
