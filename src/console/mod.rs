//! Line-oriented debugging console for running the engine from a terminal.

use crate::debugger::{Controller, Stop, StopEvent};
use crate::error::DebugError;
use crate::machine::MachineState;
use log::debug;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Step(usize),
    Continue,
    /// Replace all breakpoints with these source lines.
    Break(Vec<usize>),
    Registers,
    Where,
    Validate,
    Restart,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  step [n] | s [n]     execute n instructions (default 1)
  continue | c         run until breakpoint or halt
  break [line...]      replace breakpoints (no lines clears them)
  regs | r             show registers
  where | w            show current source line
  validate             list static problems in a toy program
  restart              reset the machine, keep breakpoints
  quit | q             leave";

/// Parse one console line. Blank input yields `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let words = shlex::split(line).ok_or_else(|| format!("Unbalanced quotes in: {line}"))?;
    let Some((first, rest)) = words.split_first() else {
        return Ok(None);
    };

    let numbers = |args: &[String]| -> Result<Vec<usize>, String> {
        args.iter()
            .map(|a| a.parse::<usize>().map_err(|_| format!("Not a line number: {a}")))
            .collect()
    };

    let command = match first.to_lowercase().as_str() {
        "step" | "s" | "next" | "n" => {
            let count = numbers(rest)?.first().copied().unwrap_or(1);
            ConsoleCommand::Step(count)
        }
        "continue" | "c" => ConsoleCommand::Continue,
        "break" | "b" => ConsoleCommand::Break(numbers(rest)?),
        "regs" | "r" => ConsoleCommand::Registers,
        "where" | "w" => ConsoleCommand::Where,
        "validate" => ConsoleCommand::Validate,
        "restart" => ConsoleCommand::Restart,
        "help" | "h" | "?" => ConsoleCommand::Help,
        "quit" | "q" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(command))
}

/// Interactive front end over a loaded [`Controller`].
pub struct Console<W: Write> {
    controller: Controller,
    output: W,
    terminated: bool,
}

impl<W: Write> Console<W> {
    pub fn new(controller: Controller, output: W) -> Self {
        Self {
            controller,
            output,
            terminated: false,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Read commands until `quit`, end of input, or the program terminates.
    pub fn run<R: BufRead>(&mut self, input: R) -> io::Result<()> {
        if let Ok(Some(stop)) = self.controller.entry_stop() {
            self.report(&stop)?;
        } else if self.controller.is_loaded() {
            self.execute(ConsoleCommand::Continue)?;
        }

        for line in input.lines() {
            if self.terminated {
                break;
            }
            let line = line?;
            match parse_command(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => self.execute(command)?,
                Ok(None) => {}
                Err(message) => writeln!(self.output, "{message}")?,
            }
        }
        self.controller.disconnect();
        Ok(())
    }

    pub fn execute(&mut self, command: ConsoleCommand) -> io::Result<()> {
        debug!("Console command {:?}", command);
        match command {
            ConsoleCommand::Step(count) => {
                for _ in 0..count.max(1) {
                    match self.controller.step() {
                        Ok(stop) => {
                            let done = stop.event != StopEvent::Step;
                            self.report(&stop)?;
                            if done {
                                break;
                            }
                        }
                        Err(e) => return self.error(e),
                    }
                }
            }
            ConsoleCommand::Continue => match self.controller.continue_execution() {
                Ok(stop) => self.report(&stop)?,
                Err(e) => return self.error(e),
            },
            ConsoleCommand::Break(lines) => {
                let source = self
                    .controller
                    .session()
                    .map(|s| s.source_path().to_path_buf())
                    .unwrap_or_else(PathBuf::new);
                let verified = self.controller.set_breakpoints(&lines, &source);
                for (line, ok) in lines.iter().zip(verified) {
                    let status = if ok { "set" } else { "not verified" };
                    writeln!(self.output, "Breakpoint at line {line}: {status}")?;
                }
            }
            ConsoleCommand::Registers => match self.controller.snapshot() {
                Ok(snapshot) => self.print_state(snapshot.pc, &snapshot.state)?,
                Err(e) => return self.error(e),
            },
            ConsoleCommand::Where => match self.controller.pc_line() {
                Ok(line) => writeln!(self.output, "At line {line}")?,
                Err(e) => return self.error(e),
            },
            ConsoleCommand::Validate => match self.controller.validate() {
                Ok(diagnostics) if diagnostics.is_empty() => {
                    writeln!(self.output, "No problems found")?
                }
                Ok(diagnostics) => {
                    for diagnostic in diagnostics {
                        writeln!(self.output, "{diagnostic}")?;
                    }
                }
                Err(e) => return self.error(e),
            },
            ConsoleCommand::Restart => match self.controller.restart() {
                Ok(_) => writeln!(self.output, "Restarted")?,
                Err(e) => return self.error(e),
            },
            ConsoleCommand::Help => writeln!(self.output, "{HELP}")?,
            ConsoleCommand::Quit => self.terminated = true,
        }
        Ok(())
    }

    fn error(&mut self, e: DebugError) -> io::Result<()> {
        writeln!(self.output, "Error: {e}")
    }

    fn report(&mut self, stop: &Stop) -> io::Result<()> {
        let line = self.controller.pc_line().unwrap_or(1);
        match stop.event.reason() {
            Some(reason) => writeln!(
                self.output,
                "Stopped ({reason}) at line {line}, pc {}",
                stop.result.pc
            ),
            None => {
                self.terminated = true;
                writeln!(self.output, "Program terminated")
            }
        }
    }

    fn print_state(&mut self, pc: usize, state: &MachineState) -> io::Result<()> {
        match state {
            MachineState::Accumulator(acc) => writeln!(self.output, "pc={pc} acc={acc}"),
            MachineState::Registers(regs) => {
                let flags = regs.flags();
                writeln!(
                    self.output,
                    "pc={:04X} sp={:04X} a={:02X} f={:02X} b={:02X} c={:02X} d={:02X} e={:02X} h={:02X} l={:02X} ix={:04X} iy={:04X} i={:02X} r={:02X}",
                    regs.pc, regs.sp, regs.a, regs.f, regs.b, regs.c, regs.d, regs.e,
                    regs.h, regs.l, regs.ix, regs.iy, regs.i, regs.r
                )?;
                writeln!(
                    self.output,
                    "flags: S={} Z={} Y={} H={} X={} P/V={} N={} C={}",
                    u8::from(flags.sign),
                    u8::from(flags.zero),
                    u8::from(flags.y),
                    u8::from(flags.half_carry),
                    u8::from(flags.x),
                    u8::from(flags.parity_overflow),
                    u8::from(flags.subtract),
                    u8::from(flags.carry)
                )
            }
        }
    }
}
