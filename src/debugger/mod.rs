mod breakpoints;
mod controller;
mod session;
mod stepping;

pub use breakpoints::Breakpoints;
pub use controller::{run_until_stop, tiny_source, Controller, LoadSummary};
pub use session::{MachineKind, Session};
pub use stepping::{HaltState, RunResult, Stop, StopEvent, StopReason};
