//! bptload wire protocol
//!
//! Hand-built HTTP/1.1 framing for the dataset service. Requests are
//! serialized to bytes without an HTTP library; responses have no length
//! framing and end when the peer closes the connection.

pub mod error;
pub mod request;
pub mod response;

pub use error::{ProtoError, ProtoResult};
pub use request::{DatasetName, Entry, Method, Request};
pub use response::{read_until_close, Reply};

/// Host the service listens on unless configured otherwise
pub const DEFAULT_HOST: &str = "localhost";
/// Port the service listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 6667;
/// Size of a single socket read while draining a response
pub const READ_CHUNK_SIZE: usize = 8192;
