//! TCP transport for the dataset service
//!
//! Provides both sync and async clients:
//! - `DatasetClient` - Synchronous client using std::net::TcpStream
//! - `AsyncDatasetClient` - Async client using tokio::net::TcpStream
//!
//! Every call opens a fresh connection, writes one request, drains the
//! response until the service closes the connection, and drops the socket.

use std::io::{ErrorKind, Write};
use std::net::TcpStream;
use std::time::Duration;

use bptload_proto::{read_until_close, Method, Reply, Request, DEFAULT_HOST, DEFAULT_PORT, READ_CHUNK_SIZE};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Anything that can carry a request to the service and return its reply
pub trait Transport {
    fn send(&mut self, request: &Request) -> ClientResult<Reply>;
}

// ============================================================================
// Sync Client
// ============================================================================

/// Synchronous client for the dataset service
#[derive(Debug, Clone)]
pub struct DatasetClient {
    host: String,
    port: u16,
    read_timeout: Option<Duration>,
}

impl Default for DatasetClient {
    fn default() -> Self {
        DatasetClient::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl DatasetClient {
    /// Client for the service at `host:port`. `host` is also sent as the
    /// Host header. Reads block indefinitely until a timeout is set.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        DatasetClient {
            host: host.into(),
            port,
            read_timeout: None,
        }
    }

    /// Bound each socket read. `None` or a zero duration disables the bound.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Send a request built from its parts. `body` is serialized compactly.
    pub fn send_request(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Reply> {
        let mut request = Request::new(method, path);
        if let Some(body) = body {
            request = request.with_json(body)?;
        }
        self.execute(&request)
    }

    /// Send one request over a new connection and decode the reply
    pub fn execute(&self, request: &Request) -> ClientResult<Reply> {
        let wire = request.to_bytes(&self.host);
        info!("{} {}", request.method, request.path);
        debug!("Sending request:\n{}", String::from_utf8_lossy(&wire));

        let addr = self.addr();
        // Dropped on every return path, which closes the connection
        let mut stream = TcpStream::connect(&addr)
            .map_err(|source| ClientError::Connect { addr: addr.clone(), source })?;
        stream.set_read_timeout(self.read_timeout).map_err(ClientError::Read)?;

        // Send request
        stream.write_all(&wire).map_err(ClientError::Write)?;
        stream.flush().map_err(ClientError::Write)?;

        // Read response until the peer closes
        let payload = read_until_close(&mut stream, READ_CHUNK_SIZE).map_err(|e| {
            match (e.kind(), self.read_timeout) {
                (ErrorKind::WouldBlock | ErrorKind::TimedOut, Some(timeout)) => ClientError::Timeout(timeout),
                _ => ClientError::Read(e),
            }
        })?;

        Ok(Reply::decode(&payload))
    }
}

impl Transport for DatasetClient {
    fn send(&mut self, request: &Request) -> ClientResult<Reply> {
        self.execute(request)
    }
}

// ============================================================================
// Async Client (requires async feature)
// ============================================================================

#[cfg(feature = "async")]
pub use async_client::AsyncDatasetClient;

#[cfg(feature = "async")]
mod async_client {
    use super::*;
    use bytes::BytesMut;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Async client for the dataset service
    ///
    /// Same contract as `DatasetClient`; uses tokio::net::TcpStream.
    #[derive(Debug, Clone)]
    pub struct AsyncDatasetClient {
        host: String,
        port: u16,
        read_timeout: Option<Duration>,
    }

    impl AsyncDatasetClient {
        pub fn new(host: impl Into<String>, port: u16) -> Self {
            AsyncDatasetClient {
                host: host.into(),
                port,
                read_timeout: None,
            }
        }

        /// Bound the whole response drain. `None` or zero disables it.
        pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
            self.read_timeout = timeout.filter(|d| !d.is_zero());
            self
        }

        pub fn addr(&self) -> String {
            format!("{}:{}", self.host, self.port)
        }

        pub async fn send_request(
            &self,
            method: Method,
            path: &str,
            body: Option<&Value>,
        ) -> ClientResult<Reply> {
            let mut request = Request::new(method, path);
            if let Some(body) = body {
                request = request.with_json(body)?;
            }
            self.execute(&request).await
        }

        /// Send one request over a new connection and decode the reply
        pub async fn execute(&self, request: &Request) -> ClientResult<Reply> {
            let wire = request.to_bytes(&self.host);
            info!("{} {}", request.method, request.path);
            debug!("Sending request:\n{}", String::from_utf8_lossy(&wire));

            let addr = self.addr();
            let mut stream = tokio::net::TcpStream::connect(&addr)
                .await
                .map_err(|source| ClientError::Connect { addr: addr.clone(), source })?;

            // Send request
            stream.write_all(&wire).await.map_err(ClientError::Write)?;
            stream.flush().await.map_err(ClientError::Write)?;

            // Read response until the peer closes
            let payload = match self.read_timeout {
                Some(timeout) => tokio::time::timeout(timeout, Self::drain(&mut stream))
                    .await
                    .map_err(|_| ClientError::Timeout(timeout))??,
                None => Self::drain(&mut stream).await?,
            };

            Ok(Reply::decode(&payload))
        }

        async fn drain(stream: &mut tokio::net::TcpStream) -> ClientResult<BytesMut> {
            let mut response = BytesMut::with_capacity(READ_CHUNK_SIZE);
            loop {
                let n = stream.read_buf(&mut response).await.map_err(ClientError::Read)?;
                if n == 0 {
                    break;
                }
                response.reserve(READ_CHUNK_SIZE);
            }
            debug!("Response drained: {} bytes", response.len());
            Ok(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_defaults() {
        let client = DatasetClient::default();
        assert_eq!(client.addr(), "localhost:6667");
        assert_eq!(client.read_timeout(), None);
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let client = DatasetClient::new("h", 1).with_read_timeout(Some(Duration::ZERO));
        assert_eq!(client.read_timeout(), None);

        let client = DatasetClient::new("h", 1).with_read_timeout(Some(Duration::from_secs(3)));
        assert_eq!(client.read_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_connect_failure_is_surfaced() {
        // Grab a free port, then release it so nothing is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = DatasetClient::new("127.0.0.1", port);
        let err = client.send_request(Method::Get, "/dataset/x/search/key/1", None).unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }
}
