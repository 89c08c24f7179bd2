//! Worker wire protocol: one JSON object per line in each direction.
//!
//! Request: `{"id":1,"action":"compile","created_ms":1700000000000,"payload":{...}}`
//! Response: `{"id":1,"result":{...}}` or `{"id":1,"error":"..."}`

use std::fmt;
use std::io::{self, BufRead};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound for one protocol line (objects travel base64-encoded).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    Compile,
    Assemble,
    Decompile,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Compile => "compile",
            JobAction::Assemble => "assemble",
            JobAction::Decompile => "decompile",
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: u64,
    pub action: JobAction,
    /// Submission time, milliseconds since the Unix epoch
    pub created_ms: i64,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// Read one line, enforcing [`MAX_MESSAGE_SIZE`].
///
/// Returns `Ok(None)` on EOF. An oversized line is consumed and reported as
/// `InvalidData` so the stream stays in sync.
pub fn read_line_limited(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(b) => b,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return if buf.is_empty() { Ok(None) } else { into_line(buf).map(Some) };
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if buf.len() + pos > MAX_MESSAGE_SIZE {
                    reader.consume(pos + 1);
                    return Err(too_large());
                }
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                return into_line(buf).map(Some);
            }
            None => {
                let len = available.len();
                if buf.len() + len > MAX_MESSAGE_SIZE {
                    reader.consume(len);
                    skip_until_newline(reader);
                    return Err(too_large());
                }
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

fn into_line(mut buf: Vec<u8>) -> io::Result<String> {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8"))
}

fn too_large() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "Message exceeds size limit")
}

fn skip_until_newline(reader: &mut impl BufRead) {
    loop {
        match reader.fill_buf() {
            Ok(b) if b.is_empty() => break,
            Ok(b) => {
                if let Some(pos) = b.iter().position(|&c| c == b'\n') {
                    reader.consume(pos + 1);
                    break;
                }
                let len = b.len();
                reader.consume(len);
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_request_wire_format() {
        let req = JobRequest {
            id: 7,
            action: JobAction::Compile,
            created_ms: 1_700_000_000_000,
            payload: json!({"compiler_id": "dummy"}),
        };
        let line = serde_json::to_string(&req).unwrap();
        assert!(line.starts_with(r#"{"id":7,"action":"compile""#));
        let back: JobRequest = serde_json::from_str(&line).unwrap();
        assert_eq!(back.action, JobAction::Compile);
        assert_eq!(back.payload["compiler_id"], "dummy");
    }

    #[test]
    fn test_response_variants() {
        let ok = serde_json::to_string(&JobResponse::ok(1, json!({"success": true}))).unwrap();
        assert_eq!(ok, r#"{"id":1,"result":{"success":true}}"#);
        let err = serde_json::to_string(&JobResponse::err(2, "boom")).unwrap();
        assert_eq!(err, r#"{"id":2,"error":"boom"}"#);

        let parsed: JobResponse = serde_json::from_str(r#"{"id":3,"error":"bad"}"#).unwrap();
        assert_eq!(parsed.into_result(), Err("bad".to_string()));
        let parsed: JobResponse = serde_json::from_str(r#"{"id":4,"result":5}"#).unwrap();
        assert_eq!(parsed.into_result(), Ok(json!(5)));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let line = r#"{"id":1,"action":"link","created_ms":0,"payload":null}"#;
        assert!(serde_json::from_str::<JobRequest>(line).is_err());
    }

    #[test]
    fn test_read_line_limited() {
        let mut reader = Cursor::new(b"first\r\nsecond\nlast".to_vec());
        assert_eq!(read_line_limited(&mut reader).unwrap().as_deref(), Some("first"));
        assert_eq!(read_line_limited(&mut reader).unwrap().as_deref(), Some("second"));
        assert_eq!(read_line_limited(&mut reader).unwrap().as_deref(), Some("last"));
        assert_eq!(read_line_limited(&mut reader).unwrap(), None);
    }
}
