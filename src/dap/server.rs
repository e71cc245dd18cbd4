use super::protocol::{write_message, DapMessage, DapMessageContent};
use crate::debugger::{Controller, Stop};
use crate::error::DebugError;
use crate::loader::LaunchConfig;
use crate::machine::MachineState;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const THREAD_ID: u64 = 1;
const REGISTERS_REF: u64 = 1;

/// Whether the server should keep reading requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Debug Adapter Protocol front door for a [`Controller`].
///
/// Requests are handled one at a time on the calling thread; runs block
/// until they stop.
pub struct DapServer<W: Write> {
    seq: u64,
    controller: Controller,
    writer: W,
}

impl<W: Write> DapServer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            seq: 0,
            controller: Controller::new(),
            writer,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn handle(&mut self, msg: DapMessage) -> io::Result<Flow> {
        let DapMessageContent::Request { command, arguments } = msg.content else {
            debug!("Ignoring non-request message");
            return Ok(Flow::Continue);
        };
        let seq = msg.seq;
        debug!("Request #{}: {}", seq, command);

        match command.as_str() {
            "initialize" => self.handle_initialize(seq, command)?,
            "launch" | "attach" => self.handle_launch(seq, command, arguments)?,
            "setBreakpoints" => self.handle_set_breakpoints(seq, command, arguments)?,
            "configurationDone" => self.handle_configuration_done(seq, command)?,
            "threads" => self.handle_threads(seq, command)?,
            "stackTrace" => self.handle_stack_trace(seq, command)?,
            "scopes" => self.handle_scopes(seq, command)?,
            "variables" => self.handle_variables(seq, command, arguments)?,
            "continue" => self.handle_continue(seq, command)?,
            "next" | "stepIn" | "stepOut" => self.handle_step(seq, command)?,
            "pause" => {
                self.controller.pause();
                self.send_response(seq, command, true, None)?;
            }
            "disconnect" | "terminate" => {
                self.controller.disconnect();
                self.send_response(seq, command, true, None)?;
                return Ok(Flow::Exit);
            }
            _ => {
                warn!("Unhandled DAP command: {}", command);
                self.send_error_response(seq, command, "Unsupported request".to_string())?;
            }
        }
        Ok(Flow::Continue)
    }

    pub fn send_response(
        &mut self,
        request_seq: u64,
        command: String,
        success: bool,
        body: Option<Value>,
    ) -> io::Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success,
                command,
                message: None,
                body,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    fn send_error_response(
        &mut self,
        request_seq: u64,
        command: String,
        message: String,
    ) -> io::Result<()> {
        warn!("{} failed: {}", command, message);
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq,
                success: false,
                command,
                message: Some(message),
                body: None,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    pub fn send_event(&mut self, event: &str, body: Option<Value>) -> io::Result<()> {
        let msg = DapMessage {
            seq: self.next_seq(),
            msg_type: "event".to_string(),
            content: DapMessageContent::Event {
                event: event.to_string(),
                body,
            },
        };
        write_message(&mut self.writer, &msg)
    }

    fn emit_stop(&mut self, stop: &Stop) -> io::Result<()> {
        match stop.event.reason() {
            Some(reason) => self.send_event(
                "stopped",
                Some(json!({
                    "reason": reason,
                    "threadId": THREAD_ID,
                    "allThreadsStopped": true
                })),
            ),
            None => self.send_event("terminated", None),
        }
    }

    fn handle_initialize(&mut self, seq: u64, command: String) -> io::Result<()> {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsSingleThreadExecutionRequests": true,
            "supportsStepBack": false,
            "supportsFunctionBreakpoints": false,
            "supportsConditionalBreakpoints": false,
            "supportsSetVariable": false,
        });
        self.send_response(seq, command, true, Some(body))?;
        self.send_event("initialized", None)
    }

    fn handle_launch(&mut self, seq: u64, command: String, args: Option<Value>) -> io::Result<()> {
        let config = match serde_json::from_value::<LaunchConfig>(args.unwrap_or_else(|| json!({})))
        {
            Ok(config) => config,
            Err(e) => {
                let err = DebugError::InvalidLaunch {
                    message: e.to_string(),
                };
                return self.send_error_response(seq, command, err.to_string());
            }
        };

        match self.controller.launch(&config) {
            Ok(summary) => {
                info!(
                    "Launched {} ({:?}), pc {}",
                    summary.source_path.display(),
                    summary.kind,
                    summary.pc
                );
                self.send_response(seq, command, true, None)?;
                if let Ok(Some(stop)) = self.controller.entry_stop() {
                    self.emit_stop(&stop)?;
                }
                Ok(())
            }
            Err(e) => self.send_error_response(seq, command, e.to_string()),
        }
    }

    fn handle_set_breakpoints(
        &mut self,
        seq: u64,
        command: String,
        args: Option<Value>,
    ) -> io::Result<()> {
        let source_path = args
            .as_ref()
            .and_then(|v| v.get("source"))
            .and_then(|v| v.get("path"))
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
            .unwrap_or_default();

        let lines: Vec<usize> = args
            .as_ref()
            .and_then(|v| v.get("breakpoints"))
            .and_then(|v| v.as_array())
            .map(|bps| {
                bps.iter()
                    .map(|bp| bp.get("line").and_then(|v| v.as_u64()).unwrap_or(0) as usize)
                    .collect()
            })
            .unwrap_or_default();

        let verified = self.controller.set_breakpoints(&lines, &source_path);
        let breakpoints: Vec<Value> = lines
            .iter()
            .zip(verified)
            .map(|(line, verified)| json!({ "verified": verified, "line": line }))
            .collect();

        self.send_response(
            seq,
            command,
            true,
            Some(json!({ "breakpoints": breakpoints })),
        )
    }

    fn handle_configuration_done(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(seq, command, true, None)?;
        if self.controller.is_loaded() && !self.controller.stop_on_entry() {
            if let Ok(stop) = self.controller.continue_execution() {
                self.emit_stop(&stop)?;
            }
        }
        Ok(())
    }

    fn handle_threads(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "threads": [
                    {
                        "id": THREAD_ID,
                        "name": "Main Thread"
                    }
                ]
            })),
        )
    }

    fn handle_stack_trace(&mut self, seq: u64, command: String) -> io::Result<()> {
        let mut frames = Vec::new();

        if let (Some(session), Ok(line)) = (self.controller.session(), self.controller.pc_line()) {
            let path = session.source_path();
            frames.push(json!({
                "id": 0,
                "name": "main",
                "line": line,
                "column": 1,
                "source": {
                    "name": file_name(path),
                    "path": path.to_string_lossy()
                }
            }));
        }

        let total = frames.len();
        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "stackFrames": frames,
                "totalFrames": total
            })),
        )
    }

    fn handle_scopes(&mut self, seq: u64, command: String) -> io::Result<()> {
        self.send_response(
            seq,
            command,
            true,
            Some(json!({
                "scopes": [
                    {
                        "name": "Registers",
                        "variablesReference": REGISTERS_REF,
                        "expensive": false
                    }
                ]
            })),
        )
    }

    fn handle_variables(&mut self, seq: u64, command: String, args: Option<Value>) -> io::Result<()> {
        let var_ref = args
            .as_ref()
            .and_then(|v| v.get("variablesReference"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let variables = match (var_ref, self.controller.snapshot()) {
            (REGISTERS_REF, Ok(snapshot)) => register_variables(snapshot.pc, &snapshot.state),
            _ => Vec::new(),
        };

        self.send_response(
            seq,
            command,
            true,
            Some(json!({ "variables": variables })),
        )
    }

    fn handle_continue(&mut self, seq: u64, command: String) -> io::Result<()> {
        match self.controller.continue_execution() {
            Ok(stop) => {
                self.send_response(
                    seq,
                    command,
                    true,
                    Some(json!({ "allThreadsContinued": true })),
                )?;
                self.emit_stop(&stop)
            }
            Err(e) => self.send_error_response(seq, command, e.to_string()),
        }
    }

    fn handle_step(&mut self, seq: u64, command: String) -> io::Result<()> {
        match self.controller.step() {
            Ok(stop) => {
                self.send_response(seq, command, true, None)?;
                self.emit_stop(&stop)
            }
            Err(e) => self.send_error_response(seq, command, e.to_string()),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn variable(name: &str, value: String) -> Value {
    json!({ "name": name, "value": value, "variablesReference": 0 })
}

/// Register view shown in the front end's variables pane.
pub fn register_variables(pc: usize, state: &MachineState) -> Vec<Value> {
    match state {
        MachineState::Accumulator(acc) => vec![
            variable("pc", pc.to_string()),
            variable("acc", acc.to_string()),
        ],
        MachineState::Registers(regs) => {
            let word = |v: u16| format!("0x{v:04x}");
            let byte = |v: u8| format!("0x{v:02x}");
            vec![
                variable("pc", word(regs.pc)),
                variable("sp", word(regs.sp)),
                variable("a", byte(regs.a)),
                variable("f", byte(regs.flags().to_byte())),
                variable("b", byte(regs.b)),
                variable("c", byte(regs.c)),
                variable("d", byte(regs.d)),
                variable("e", byte(regs.e)),
                variable("h", byte(regs.h)),
                variable("l", byte(regs.l)),
                variable("ix", word(regs.ix)),
                variable("iy", word(regs.iy)),
                variable("i", byte(regs.i)),
                variable("r", byte(regs.r)),
            ]
        }
    }
}
