//! Source-level debugging engine for small instruction-set machines.
//!
//! A [`debugger::Controller`] drives either a line-oriented toy CPU or a
//! Z80-class CPU loaded from Intel HEX plus an assembler listing, and is
//! reachable through a Debug Adapter Protocol server or a terminal console.

pub mod console;
pub mod dap;
pub mod debugger;
pub mod error;
pub mod loader;
pub mod machine;

pub use error::{DebugError, Result};
