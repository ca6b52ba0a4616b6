//! bptload Client Library
//!
//! Talks to the B+Tree dataset service one connection per request and
//! drives the CSV load-and-probe workflow on top of that transport.

pub mod client;
pub mod error;
pub mod workload;

pub use client::{DatasetClient, Transport};
#[cfg(feature = "async")]
pub use client::AsyncDatasetClient;
pub use error::{ClientError, ClientResult};
pub use workload::{CsvInput, NoPacer, Pacer, Pacing, Phase, RunSummary, SleepPacer, Step};
pub use bptload_proto::{DatasetName, Entry, Method, Reply, Request, DEFAULT_HOST, DEFAULT_PORT};
