// tests/dap_tests.rs
// Debug adapter framing and request handling

use serde_json::{json, Value};
use std::cell::RefCell;
use std::fs;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tinycpu_debugger::dap::{
    read_message, register_variables, write_message, DapMessage, DapMessageContent, DapServer,
    Flow,
};
use tinycpu_debugger::machine::{MachineState, Z80Registers};

fn frame(body: &Value) -> String {
    let json = body.to_string();
    format!("Content-Length: {}\r\n\r\n{}", json.len(), json)
}

fn request(seq: u64, command: &str, arguments: Option<Value>) -> DapMessage {
    DapMessage {
        seq,
        msg_type: "request".to_string(),
        content: DapMessageContent::Request {
            command: command.to_string(),
            arguments,
        },
    }
}

/// Split framed server output back into JSON bodies.
fn frames(output: &[u8]) -> Vec<Value> {
    let text = std::str::from_utf8(output).expect("output is UTF-8");
    let mut rest = text;
    let mut bodies = Vec::new();
    while let Some(header_end) = rest.find("\r\n\r\n") {
        let length: usize = rest[..header_end]
            .trim()
            .strip_prefix("Content-Length:")
            .expect("Content-Length header")
            .trim()
            .parse()
            .expect("numeric length");
        let start = header_end + 4;
        bodies.push(serde_json::from_str(&rest[start..start + length]).expect("JSON body"));
        rest = &rest[start + length..];
    }
    bodies
}

/// Writer the test can read while the server still owns it.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Harness {
    server: DapServer<SharedBuffer>,
    output: SharedBuffer,
    next_seq: u64,
}

impl Harness {
    fn new() -> Self {
        let output = SharedBuffer::default();
        Self {
            server: DapServer::new(output.clone()),
            output,
            next_seq: 1,
        }
    }

    /// Send one request and return the frames it produced.
    fn send(&mut self, command: &str, arguments: Option<Value>) -> (Flow, Vec<Value>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let flow = self
            .server
            .handle(request(seq, command, arguments))
            .expect("in-memory writes succeed");
        let written = std::mem::take(&mut *self.output.0.borrow_mut());
        (flow, frames(&written))
    }
}

fn program_file(name: &str, lines: &[&str]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tinycpu_dap_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("prog.tasm");
    fs::write(&path, lines.join("\n")).expect("write program");
    path
}

fn assert_response(frame: &Value, command: &str, success: bool) {
    assert_eq!(frame["type"], "response", "{frame}");
    assert_eq!(frame["command"], command, "{frame}");
    assert_eq!(frame["success"], success, "{frame}");
}

fn assert_stopped(frame: &Value, reason: &str) {
    assert_eq!(frame["type"], "event", "{frame}");
    assert_eq!(frame["event"], "stopped", "{frame}");
    assert_eq!(frame["body"]["reason"], reason, "{frame}");
    assert_eq!(frame["body"]["threadId"], 1);
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn test_read_framed_request() {
        let input = frame(&json!({
            "seq": 7,
            "type": "request",
            "command": "setBreakpoints",
            "arguments": { "breakpoints": [{ "line": 3 }] }
        }));
        let mut reader = Cursor::new(input.into_bytes());

        let msg = read_message(&mut reader).expect("io").expect("one message");
        assert_eq!(msg.seq, 7);
        assert_eq!(msg.msg_type, "request");
        match msg.content {
            DapMessageContent::Request { command, arguments } => {
                assert_eq!(command, "setBreakpoints");
                assert_eq!(arguments.expect("arguments")["breakpoints"][0]["line"], 3);
            }
            other => panic!("parsed as {:?}", other),
        }

        assert!(read_message(&mut reader).expect("io").is_none());
    }

    #[test]
    fn test_request_without_arguments() {
        let input = frame(&json!({ "seq": 1, "type": "request", "command": "threads" }));
        let msg = read_message(&mut Cursor::new(input.into_bytes()))
            .expect("io")
            .expect("message");
        assert!(matches!(
            msg.content,
            DapMessageContent::Request { arguments: None, .. }
        ));
    }

    #[test]
    fn test_malformed_body_is_skipped() {
        let bad = "Content-Length: 9\r\n\r\nnot json!";
        let good = frame(&json!({ "seq": 2, "type": "request", "command": "pause" }));
        let mut reader = Cursor::new(format!("{bad}{good}").into_bytes());

        let msg = read_message(&mut reader).expect("io").expect("second message");
        assert_eq!(msg.seq, 2);
    }

    #[test]
    fn test_empty_input_is_end_of_stream() {
        let mut reader = Cursor::new(Vec::new());
        assert!(read_message(&mut reader).expect("io").is_none());
    }

    #[test]
    fn test_write_frames_response() {
        let msg = DapMessage {
            seq: 3,
            msg_type: "response".to_string(),
            content: DapMessageContent::Response {
                request_seq: 2,
                success: true,
                command: "threads".to_string(),
                message: None,
                body: None,
            },
        };
        let mut out = Vec::new();
        write_message(&mut out, &msg).expect("write");

        let text = String::from_utf8(out.clone()).expect("UTF-8");
        assert!(text.starts_with("Content-Length: "));
        let bodies = frames(&out);
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0],
            json!({
                "seq": 3,
                "type": "response",
                "request_seq": 2,
                "success": true,
                "command": "threads"
            })
        );
    }

    #[test]
    fn test_response_round_trips_as_response() {
        let input = frame(&json!({
            "seq": 4,
            "type": "response",
            "request_seq": 1,
            "success": true,
            "command": "initialize"
        }));
        let msg = read_message(&mut Cursor::new(input.into_bytes()))
            .expect("io")
            .expect("message");
        assert!(matches!(msg.content, DapMessageContent::Response { request_seq: 1, .. }));
    }
}

#[cfg(test)]
mod server_tests {
    use super::*;

    #[test]
    fn test_initialize_announces_capabilities() {
        let mut dap = Harness::new();
        let (flow, out) = dap.send("initialize", Some(json!({ "adapterID": "tinycpu" })));

        assert_eq!(flow, Flow::Continue);
        assert_eq!(out.len(), 2);
        assert_response(&out[0], "initialize", true);
        assert_eq!(out[0]["request_seq"], 1);
        assert_eq!(out[0]["body"]["supportsConfigurationDoneRequest"], true);
        assert_eq!(out[1]["event"], "initialized");
        assert!(out[1]["seq"].as_u64() > out[0]["seq"].as_u64());
    }

    #[test]
    fn test_full_session() {
        let path = program_file("session", &["LOAD 10", "ADD 5", "HALT"]);
        let path_text = path.to_string_lossy().into_owned();
        let mut dap = Harness::new();
        dap.send("initialize", None);

        let (_, out) = dap.send("launch", Some(json!({ "program": path_text })));
        assert_eq!(out.len(), 2);
        assert_response(&out[0], "launch", true);
        assert_stopped(&out[1], "entry");

        let (_, out) = dap.send(
            "setBreakpoints",
            Some(json!({
                "source": { "path": path_text },
                "breakpoints": [{ "line": 2 }, { "line": 40 }]
            })),
        );
        assert_response(&out[0], "setBreakpoints", true);
        assert_eq!(
            out[0]["body"]["breakpoints"],
            json!([
                { "verified": true, "line": 2 },
                { "verified": false, "line": 40 }
            ])
        );

        let (_, out) = dap.send("configurationDone", None);
        assert_eq!(out.len(), 1, "stop on entry holds the run");

        let (_, out) = dap.send("threads", None);
        assert_eq!(out[0]["body"]["threads"][0]["id"], 1);

        let (_, out) = dap.send("continue", Some(json!({ "threadId": 1 })));
        assert_response(&out[0], "continue", true);
        assert_stopped(&out[1], "breakpoint");

        let (_, out) = dap.send("stackTrace", Some(json!({ "threadId": 1 })));
        let frame = &out[0]["body"]["stackFrames"][0];
        assert_eq!(frame["line"], 2);
        assert_eq!(frame["name"], "main");
        assert_eq!(frame["source"]["name"], "prog.tasm");
        assert_eq!(frame["source"]["path"], path_text.as_str());
        assert_eq!(out[0]["body"]["totalFrames"], 1);

        let (_, out) = dap.send("scopes", Some(json!({ "frameId": 0 })));
        let reference = out[0]["body"]["scopes"][0]["variablesReference"].clone();
        assert_eq!(out[0]["body"]["scopes"][0]["name"], "Registers");

        let (_, out) = dap.send("variables", Some(json!({ "variablesReference": reference })));
        assert_eq!(
            out[0]["body"]["variables"],
            json!([
                { "name": "pc", "value": "1", "variablesReference": 0 },
                { "name": "acc", "value": "10", "variablesReference": 0 }
            ])
        );

        let (_, out) = dap.send("next", Some(json!({ "threadId": 1 })));
        assert_response(&out[0], "next", true);
        assert_stopped(&out[1], "step");

        let (_, out) = dap.send("continue", Some(json!({ "threadId": 1 })));
        assert_stopped(&out[1], "halt");

        let (_, out) = dap.send("continue", Some(json!({ "threadId": 1 })));
        assert_eq!(out[1]["event"], "terminated");

        let (flow, out) = dap.send("disconnect", None);
        assert_eq!(flow, Flow::Exit);
        assert_response(&out[0], "disconnect", true);
        assert!(!dap.server.controller().is_loaded());
    }

    #[test]
    fn test_configuration_done_runs_without_entry_stop() {
        let path = program_file("no_entry", &["LOAD 1", "HALT"]);
        let mut dap = Harness::new();

        let (_, out) = dap.send(
            "launch",
            Some(json!({ "program": path, "stopOnEntry": false })),
        );
        assert_eq!(out.len(), 1);

        let (_, out) = dap.send("configurationDone", None);
        assert_eq!(out.len(), 2);
        assert_response(&out[0], "configurationDone", true);
        assert_stopped(&out[1], "halt");
    }

    #[test]
    fn test_launch_failure_is_an_error_response() {
        let mut dap = Harness::new();

        let (flow, out) = dap.send("launch", Some(json!({})));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out.len(), 1);
        assert_response(&out[0], "launch", false);
        assert!(out[0]["message"]
            .as_str()
            .expect("message")
            .contains("asm"));

        let (_, out) = dap.send("launch", Some(json!({ "program": "/nonexistent/prog.tasm" })));
        assert_response(&out[0], "launch", false);
        assert!(!dap.server.controller().is_loaded());

        let (_, out) = dap.send("launch", Some(json!({ "entry": "not a number" })));
        assert_response(&out[0], "launch", false);
    }

    #[test]
    fn test_requests_before_launch() {
        let mut dap = Harness::new();

        let (_, out) = dap.send("continue", None);
        assert_response(&out[0], "continue", false);
        assert_eq!(out[0]["message"], "No program loaded");

        let (_, out) = dap.send("next", None);
        assert_response(&out[0], "next", false);

        let (_, out) = dap.send(
            "setBreakpoints",
            Some(json!({ "source": { "path": "/a.tasm" }, "breakpoints": [{ "line": 1 }] })),
        );
        assert_response(&out[0], "setBreakpoints", true);
        assert_eq!(out[0]["body"]["breakpoints"][0]["verified"], false);

        let (_, out) = dap.send("stackTrace", None);
        assert_eq!(out[0]["body"]["stackFrames"], json!([]));

        let (_, out) = dap.send("variables", Some(json!({ "variablesReference": 1 })));
        assert_eq!(out[0]["body"]["variables"], json!([]));

        let (_, out) = dap.send("pause", None);
        assert_response(&out[0], "pause", true);
    }

    #[test]
    fn test_unknown_command() {
        let mut dap = Harness::new();
        let (flow, out) = dap.send("evaluate", Some(json!({ "expression": "acc" })));
        assert_eq!(flow, Flow::Continue);
        assert_response(&out[0], "evaluate", false);
        assert_eq!(out[0]["message"], "Unsupported request");
    }

    #[test]
    fn test_non_request_is_ignored() {
        let mut dap = Harness::new();
        let event = DapMessage {
            seq: 1,
            msg_type: "event".to_string(),
            content: DapMessageContent::Event {
                event: "output".to_string(),
                body: None,
            },
        };
        let flow = dap.server.handle(event).expect("no io");
        assert_eq!(flow, Flow::Continue);
        assert!(dap.output.0.borrow().is_empty());
    }

    #[test]
    fn test_z80_registers_render_as_hex() {
        let regs = Z80Registers {
            pc: 0x0105,
            sp: 0xFFFF,
            a: 0x2A,
            f: 0x41,
            ix: 0x1234,
            ..Z80Registers::default()
        };
        let vars = register_variables(0x105, &MachineState::Registers(regs));

        let value = |name: &str| {
            vars.iter()
                .find(|v| v["name"] == name)
                .map(|v| v["value"].clone())
                .unwrap_or(Value::Null)
        };
        assert_eq!(vars.len(), 14);
        assert_eq!(value("pc"), "0x0105");
        assert_eq!(value("sp"), "0xffff");
        assert_eq!(value("a"), "0x2a");
        assert_eq!(value("f"), "0x41");
        assert_eq!(value("b"), "0x00");
        assert_eq!(value("ix"), "0x1234");
    }
}
