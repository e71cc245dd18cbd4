//! Instruction-level machines the debugger can drive.
//!
//! Each machine only promises the [`Machine`] contract: reset, execute one
//! instruction, and expose its program counter and register snapshot. The
//! controller never looks further inside.

mod tiny;
mod z80;

pub use tiny::{validate_program, TinyCpu};
pub use z80::{Flags, Z80Cpu, Z80Registers};

/// Register contents after a step, shaped per architecture.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineState {
    Accumulator(i64),
    Registers(Z80Registers),
}

/// Already-applied effect of one instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub halted: bool,
    pub pc: usize,
    pub state: MachineState,
}

pub trait Machine {
    /// Put the machine back in its freshly loaded state.
    fn reset(&mut self);

    /// Execute one instruction. Never fails: programs that misbehave degrade
    /// to an advance with no other effect.
    fn step(&mut self) -> StepResult;

    fn pc(&self) -> usize;

    fn state(&self) -> MachineState;

    fn is_halted(&self) -> bool;

    fn snapshot(&self) -> StepResult {
        StepResult {
            halted: self.is_halted(),
            pc: self.pc(),
            state: self.state(),
        }
    }
}
