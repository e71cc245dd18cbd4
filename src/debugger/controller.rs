use super::breakpoints::Breakpoints;
use super::session::{MachineKind, Session};
use super::stepping::{RunResult, Stop, StopEvent, StopReason};
use crate::error::{DebugError, Result};
use crate::loader::{load_program, LaunchConfig, ProgramSource};
use crate::machine::{Machine, MachineState, StepResult};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// What a successful load tells the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub kind: MachineKind,
    pub source_path: PathBuf,
    pub pc: usize,
    /// Static diagnostics of a toy program; loading never fails on them.
    pub diagnostics: Vec<String>,
}

/// Execute until the instruction at pc carries a breakpoint or the machine
/// halts.
///
/// The breakpoint check happens before each instruction executes, so a stop
/// leaves pc on the breakpoint address. `resume_from` exempts that address
/// for the first instruction only, letting a run leave a breakpoint it is
/// parked on. There is no step limit.
pub fn run_until_stop(
    machine: &mut dyn Machine,
    breakpoints: &Breakpoints,
    resume_from: Option<usize>,
) -> RunResult {
    if machine.is_halted() {
        return RunResult {
            reason: StopReason::Halt,
            result: machine.snapshot(),
        };
    }

    let mut first = true;
    loop {
        let pc = machine.pc();
        let exempt = first && resume_from == Some(pc);
        first = false;

        if !exempt && breakpoints.contains(pc) {
            return RunResult {
                reason: StopReason::Breakpoint,
                result: machine.snapshot(),
            };
        }

        let result = machine.step();
        if result.halted {
            return RunResult {
                reason: StopReason::Halt,
                result,
            };
        }
    }
}

/// Machine-agnostic debugging engine a front end drives.
///
/// Holds at most one [`Session`]; every request that needs a program fails
/// with [`DebugError::NoProgramLoaded`] until one is loaded, without
/// disturbing the controller.
#[derive(Default)]
pub struct Controller {
    session: Option<Session>,
    stop_on_entry: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the artifacts named by `config` and load them.
    pub fn launch(&mut self, config: &LaunchConfig) -> Result<LoadSummary> {
        self.session = None;
        let source = load_program(config)?;
        self.load(source, config.stop_on_entry)
    }

    /// Replace whatever is loaded with `source`.
    ///
    /// On failure nothing stays loaded.
    pub fn load(&mut self, source: ProgramSource, stop_on_entry: bool) -> Result<LoadSummary> {
        self.session = None;
        let session = Session::from_source(source).map_err(|e| {
            info!("Load failed: {}", e);
            e
        })?;

        let summary = LoadSummary {
            kind: session.kind(),
            source_path: session.source_path().to_path_buf(),
            pc: session.machine().pc(),
            diagnostics: session.diagnostics().to_vec(),
        };
        self.session = Some(session);
        self.stop_on_entry = stop_on_entry;
        Ok(summary)
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Result<&mut Session> {
        self.session.as_mut().ok_or(DebugError::NoProgramLoaded)
    }

    fn session_ref(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(DebugError::NoProgramLoaded)
    }

    pub fn stop_on_entry(&self) -> bool {
        self.stop_on_entry
    }

    /// Stop to report right after a launch, if the launch asked for one.
    pub fn entry_stop(&self) -> Result<Option<Stop>> {
        let session = self.session_ref()?;
        if !self.stop_on_entry {
            return Ok(None);
        }
        Ok(Some(Stop {
            event: StopEvent::Entry,
            result: session.machine.snapshot(),
        }))
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<Stop> {
        let session = self.session_mut()?;
        let result = session.machine.step();
        session.parked_at = None;

        let event = if result.halted {
            session.halt.report()
        } else {
            session.halt.clear();
            StopEvent::Step
        };
        debug!("Step -> {:?} at pc {}", event, result.pc);
        Ok(Stop { event, result })
    }

    /// Run until a breakpoint or halt.
    pub fn continue_execution(&mut self) -> Result<Stop> {
        let session = self.session_mut()?;
        let RunResult { reason, result } = run_until_stop(
            session.machine.as_mut(),
            &session.breakpoints,
            session.parked_at,
        );

        let event = match reason {
            StopReason::Breakpoint => {
                session.halt.clear();
                session.parked_at = Some(result.pc);
                StopEvent::Breakpoint
            }
            StopReason::Halt => {
                session.parked_at = None;
                session.halt.report()
            }
        };
        info!("Stopped: {:?} at pc {}", event, result.pc);
        Ok(Stop { event, result })
    }

    /// Replace the breakpoint set with the given source lines.
    ///
    /// Returns one verified flag per requested line, in request order. A
    /// line verifies only if it maps to an address and `source_path` names
    /// the loaded program.
    pub fn set_breakpoints(&mut self, lines: &[usize], source_path: &Path) -> Vec<bool> {
        let Some(session) = self.session.as_mut() else {
            debug!("Breakpoints requested with no program loaded");
            return vec![false; lines.len()];
        };

        session.breakpoints.clear();
        let same_source = source_path == session.source_path;

        lines
            .iter()
            .map(|&line| {
                let address = session.address_map.address_for_line(line);
                match address.filter(|_| same_source) {
                    Some(address) => {
                        session.breakpoints.add(address);
                        debug!("Line {} verified at address 0x{:04X}", line, address);
                        true
                    }
                    None => {
                        debug!("Line {} of {} not verified", line, source_path.display());
                        false
                    }
                }
            })
            .collect()
    }

    /// Source line of the current pc; unmapped addresses show as line 1.
    pub fn pc_line(&self) -> Result<usize> {
        let session = self.session_ref()?;
        Ok(session
            .address_map
            .line_for_address(session.machine.pc())
            .unwrap_or(1))
    }

    pub fn pc(&self) -> Result<usize> {
        Ok(self.session_ref()?.machine.pc())
    }

    pub fn state(&self) -> Result<MachineState> {
        Ok(self.session_ref()?.machine.state())
    }

    pub fn snapshot(&self) -> Result<StepResult> {
        Ok(self.session_ref()?.machine.snapshot())
    }

    /// Static diagnostics for the loaded toy program.
    pub fn validate(&self) -> Result<Vec<String>> {
        let session = self.session_ref()?;
        Ok(match session.kind {
            MachineKind::Tiny => session.diagnostics.clone(),
            MachineKind::Z80 => Vec::new(),
        })
    }

    /// Runs are synchronous, so there is never anything to interrupt.
    pub fn pause(&self) {
        debug!("Pause requested; execution is already stopped");
    }

    /// Back to the freshly loaded state, keeping breakpoints.
    pub fn restart(&mut self) -> Result<StepResult> {
        let session = self.session_mut()?;
        session.machine.reset();
        session.halt.clear();
        session.parked_at = None;
        Ok(session.machine.snapshot())
    }

    /// Drop the loaded program. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            info!("Session released");
        }
    }
}

/// Convenience for loading toy program text that is already in memory.
pub fn tiny_source<S: AsRef<str>>(path: impl Into<PathBuf>, lines: &[S]) -> ProgramSource {
    ProgramSource::Tiny {
        path: path.into(),
        lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
    }
}

