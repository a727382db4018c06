//! Command language and executor behind the interactive debugger.

mod commands;
mod executor;

pub use commands::*;
pub use executor::*;
