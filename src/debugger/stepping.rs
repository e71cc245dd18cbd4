use crate::machine::StepResult;

/// Why `run_until_stop` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint,
    Halt,
}

/// What the front end is told after a step, continue or launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopEvent {
    Entry,
    Step,
    Breakpoint,
    Halt,
    /// The machine had already reported its halt; the session is over.
    Terminated,
}

impl StopEvent {
    /// Reason string of a `stopped` event, `None` for termination.
    pub fn reason(self) -> Option<&'static str> {
        match self {
            StopEvent::Entry => Some("entry"),
            StopEvent::Step => Some("step"),
            StopEvent::Breakpoint => Some("breakpoint"),
            StopEvent::Halt => Some("halt"),
            StopEvent::Terminated => None,
        }
    }
}

/// Two-phase halt reporting: the first halt is shown as a stop at the halting
/// instruction, any later attempt to go on terminates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HaltState {
    #[default]
    Running,
    Reported,
    Terminated,
}

impl HaltState {
    /// Record a halted machine and pick the event to emit for it.
    pub fn report(&mut self) -> StopEvent {
        match self {
            HaltState::Running => {
                *self = HaltState::Reported;
                StopEvent::Halt
            }
            HaltState::Reported | HaltState::Terminated => {
                *self = HaltState::Terminated;
                StopEvent::Terminated
            }
        }
    }

    pub fn clear(&mut self) {
        *self = HaltState::Running;
    }

    pub fn is_reported(self) -> bool {
        self != HaltState::Running
    }
}

/// Outcome of a free run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub reason: StopReason,
    pub result: StepResult,
}

/// Outcome of any controller request that moves the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub event: StopEvent,
    pub result: StepResult,
}
