//! Response draining and decoding
//!
//! The service sends no length or chunk framing. A response is every byte
//! received until the peer closes its side; the whole payload is then
//! decoded as JSON, falling back to raw text.

use std::fmt;
use std::io::{self, ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tracing::{debug, warn};

/// Read from `reader` until it reports end of stream.
///
/// A zero-length read is the only termination condition. Interrupted reads
/// are retried; any other error is returned and the bytes read so far are
/// dropped.
pub fn read_until_close<R: Read>(reader: &mut R, chunk_size: usize) -> io::Result<Bytes> {
    let mut response = BytesMut::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    debug!("Response drained: {} bytes", response.len());
    Ok(response.freeze())
}

/// Decoded response from the service
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Payload parsed as JSON (object, array or scalar)
    Json(Value),
    /// Payload that was not valid JSON, as text
    Raw(String),
}

impl Reply {
    /// Decode a complete response payload.
    ///
    /// Never fails: anything that does not parse as JSON comes back as
    /// `Reply::Raw` and a warning is logged.
    pub fn decode(payload: &[u8]) -> Reply {
        let text = String::from_utf8_lossy(payload);
        match serde_json::from_str(&text) {
            Ok(value) => Reply::Json(value),
            Err(e) => {
                warn!("Failed to parse response: {}", e);
                Reply::Raw(text.into_owned())
            }
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Reply::Json(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Reply::Json(value) => Some(value),
            Reply::Raw(_) => None,
        }
    }

    /// Indented JSON rendering; raw text is rendered as a JSON string
    pub fn to_pretty(&self) -> String {
        let rendered = match self {
            Reply::Json(value) => serde_json::to_string_pretty(value),
            Reply::Raw(text) => serde_json::to_string(text),
        };
        // Serializing a Value or a str cannot fail
        rendered.unwrap_or_default()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read, with an interruption first
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_read_until_close() {
        let mut cursor = Cursor::new(b"{\"ok\":true}".to_vec());
        let bytes = read_until_close(&mut cursor, 8192).unwrap();
        assert_eq!(&bytes[..], b"{\"ok\":true}");
    }

    #[test]
    fn test_read_across_small_chunks() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader = Trickle { data: data.clone(), pos: 0, step: 7, interrupted: false };
        let bytes = read_until_close(&mut reader, 16).unwrap();
        assert_eq!(&bytes[..], &data[..]);
    }

    #[test]
    fn test_read_empty_stream() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_until_close(&mut cursor, 8192).unwrap().is_empty());
    }

    #[test]
    fn test_read_error_propagates() {
        let err = read_until_close(&mut Broken, 8192).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionReset);
    }

    #[test]
    fn test_decode_json() {
        let reply = Reply::decode(br#"[{"key":6,"line":"x"}]"#);
        assert_eq!(reply, Reply::Json(json!([{"key": 6, "line": "x"}])));
        assert!(reply.is_json());
    }

    #[test]
    fn test_decode_scalar() {
        assert_eq!(Reply::decode(b"42"), Reply::Json(json!(42)));
    }

    #[test]
    fn test_decode_falls_back_to_text() {
        let reply = Reply::decode(b"Dataset not found");
        assert_eq!(reply, Reply::Raw("Dataset not found".to_string()));
        assert!(reply.as_json().is_none());
    }

    #[test]
    fn test_decode_empty_is_raw() {
        assert_eq!(Reply::decode(b""), Reply::Raw(String::new()));
    }

    #[test]
    fn test_pretty_rendering() {
        assert_eq!(Reply::Raw("oops".to_string()).to_pretty(), "\"oops\"");
        assert_eq!(
            Reply::Json(json!({"status": "ok"})).to_string(),
            "{\n  \"status\": \"ok\"\n}"
        );
    }
}
