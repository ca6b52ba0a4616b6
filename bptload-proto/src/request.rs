//! Request framing
//!
//! Request format (CRLF line endings):
//!   METHOD SP PATH SP HTTP/1.1
//!   Host: HOST
//!   [Content-Length: LEN]          only with a body
//!   [Content-Type: application/json]
//!   <blank line>
//!   [BODY]
//!
//! Paths are sent as-is. Nothing is percent-encoded, so every segment must
//! already be valid; `DatasetName` enforces this for the dataset segment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProtoError, ProtoResult};

/// HTTP method used by the dataset endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Post,
    Get,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Get => "GET",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dataset identifier, safe to splice into a request path unescaped
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetName(String);

impl DatasetName {
    pub fn new(name: impl Into<String>) -> ProtoResult<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name
                .chars()
                .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace() || c.is_control());
        if valid {
            Ok(DatasetName(name))
        } else {
            Err(ProtoError::InvalidDatasetName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key/line pair submitted in a bulk insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: u64,
    pub line: String,
}

#[derive(Serialize)]
struct BulkBody<'a> {
    entries: &'a [Entry],
}

/// One request to the dataset service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Compact JSON text; `None` means no body framing at all
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attach a JSON body, serialized compactly
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> ProtoResult<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    /// `POST /dataset/{name}/create/order/{order}`
    pub fn create(name: &DatasetName, order: usize) -> Self {
        Request::new(Method::Post, format!("/dataset/{}/create/order/{}", name, order))
    }

    /// `POST /dataset/{name}/bulk` with `{"entries": [...]}`
    pub fn bulk(name: &DatasetName, entries: &[Entry]) -> ProtoResult<Self> {
        Request::new(Method::Post, format!("/dataset/{}/bulk", name))
            .with_json(&BulkBody { entries })
    }

    /// `GET /dataset/{name}/range/start/{start}/end/{end}`
    pub fn range(name: &DatasetName, start: u64, end: u64) -> Self {
        Request::new(
            Method::Get,
            format!("/dataset/{}/range/start/{}/end/{}", name, start, end),
        )
    }

    /// `DELETE /dataset/{name}/key/{key}`
    pub fn delete(name: &DatasetName, key: u64) -> Self {
        Request::new(Method::Delete, format!("/dataset/{}/key/{}", name, key))
    }

    /// `GET /dataset/{name}/search/key/{key}`
    pub fn search(name: &DatasetName, key: u64) -> Self {
        Request::new(Method::Get, format!("/dataset/{}/search/key/{}", name, key))
    }

    /// Serialize to wire bytes, sending `host` in the Host header
    pub fn to_bytes(&self, host: &str) -> Vec<u8> {
        let body_len = self.body.as_ref().map_or(0, String::len);
        let mut buf = Vec::with_capacity(self.path.len() + host.len() + body_len + 96);

        // Request line
        buf.extend_from_slice(self.method.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.path.as_bytes());
        buf.extend_from_slice(b" HTTP/1.1\r\n");

        buf.extend_from_slice(b"Host: ");
        buf.extend_from_slice(host.as_bytes());
        buf.extend_from_slice(b"\r\n");

        match &self.body {
            Some(body) => {
                // Declared length is in bytes, not characters
                buf.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
                buf.extend_from_slice(b"Content-Type: application/json\r\n");
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(body.as_bytes());
            }
            None => buf.extend_from_slice(b"\r\n"),
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> DatasetName {
        DatasetName::new("people").unwrap()
    }

    #[test]
    fn test_request_without_body() {
        let bytes = Request::range(&name(), 5, 15).to_bytes("localhost");
        assert_eq!(
            bytes,
            b"GET /dataset/people/range/start/5/end/15 HTTP/1.1\r\nHost: localhost\r\n\r\n"
        );
    }

    #[test]
    fn test_no_body_headers_without_body() {
        let bytes = Request::delete(&name(), 7).to_bytes("db.local");
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("Content-Length"));
        assert!(!text.contains("Content-Type"));
        assert!(text.ends_with("\r\n\r\n"));
        assert_eq!(text.find("\r\n\r\n").unwrap() + 4, text.len());
    }

    #[test]
    fn test_request_with_body() {
        let entries = vec![Entry { key: 0, line: "a,b".to_string() }];
        let bytes = Request::bulk(&name(), &entries).unwrap().to_bytes("localhost");
        let body = r#"{"entries":[{"key":0,"line":"a,b"}]}"#;
        let expected = format!(
            "POST /dataset/people/bulk HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nContent-Type: application/json\r\n\r\n{}",
            body.len(),
            body
        );
        assert_eq!(bytes, expected.as_bytes());
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let entries = vec![
            Entry { key: 3, line: "café,naïve".to_string() },
            Entry { key: 4, line: "£5".to_string() },
        ];
        let request = Request::bulk(&name(), &entries).unwrap();
        let bytes = request.to_bytes("localhost");
        let text = String::from_utf8(bytes).unwrap();

        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        let declared: usize = head
            .lines()
            .find_map(|l| l.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(declared, body.len());
        assert!(body.chars().count() < body.len());
    }

    #[test]
    fn test_empty_object_body_is_still_framed() {
        let request = Request::new(Method::Post, "/x")
            .with_json(&serde_json::json!({}))
            .unwrap();
        let text = String::from_utf8(request.to_bytes("h")).unwrap();
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\n{}"));
    }

    #[test]
    fn test_endpoint_paths() {
        let n = name();
        assert_eq!(Request::create(&n, 3).path, "/dataset/people/create/order/3");
        assert_eq!(Request::create(&n, 3).method, Method::Post);
        assert_eq!(Request::bulk(&n, &[]).unwrap().path, "/dataset/people/bulk");
        assert_eq!(Request::delete(&n, 13).path, "/dataset/people/key/13");
        assert_eq!(Request::delete(&n, 13).method, Method::Delete);
        assert_eq!(Request::search(&n, 6).path, "/dataset/people/search/key/6");
        assert_eq!(Request::search(&n, 6).method, Method::Get);
    }

    #[test]
    fn test_dataset_name_validation() {
        assert!(DatasetName::new("sales_2024-q1").is_ok());
        assert!(DatasetName::new("").is_err());
        assert!(DatasetName::new("a/b").is_err());
        assert!(DatasetName::new("a b").is_err());
        assert!(DatasetName::new("a?b").is_err());
        assert!(DatasetName::new("a\tb").is_err());
    }
}
