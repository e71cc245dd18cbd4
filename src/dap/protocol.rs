use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Write};

#[derive(Debug, Serialize, Deserialize)]
pub struct DapMessage {
    pub seq: u64,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub content: DapMessageContent,
}

#[derive(Debug, Serialize, Deserialize)]
// Tried in order: a response also carries `command`, so it must come first.
#[serde(untagged)]
pub enum DapMessageContent {
    Response {
        request_seq: u64,
        success: bool,
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
    Event {
        event: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
    Request {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments: Option<Value>,
    },
}

const CONTENT_LENGTH: &str = "Content-Length:";

/// Read one `Content-Length` framed message.
///
/// Returns `Ok(None)` at end of input. Bodies that are not valid DAP JSON are
/// skipped.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<DapMessage>> {
    loop {
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            if let Some(len) = line.strip_prefix(CONTENT_LENGTH) {
                content_length = len.trim().parse().unwrap_or(0);
            }
        }

        if content_length == 0 {
            continue;
        }

        let mut buffer = vec![0u8; content_length];
        reader.read_exact(&mut buffer)?;
        match serde_json::from_slice(&buffer) {
            Ok(msg) => return Ok(Some(msg)),
            Err(e) => log::warn!("Discarding malformed DAP message: {}", e),
        }
    }
}

pub fn write_message<W: Write>(writer: &mut W, msg: &DapMessage) -> io::Result<()> {
    let json = serde_json::to_string(msg)?;
    write!(writer, "{} {}\r\n\r\n{}", CONTENT_LENGTH, json.len(), json)?;
    writer.flush()
}
