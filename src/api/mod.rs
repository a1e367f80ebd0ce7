//! Remote API access
//!
//! Every endpoint answers with the `{success, data, message}` envelope. Reads go
//! through [`crate::source::RecordFetcher`], writes through [`RecordWriter`].

pub mod client;
pub mod endpoints;
pub mod writes;

pub use client::ApiClient;
pub use writes::{perform_write, RecordWriter, WriteError, WriteMethod, WriteNotices, WriteRequest};
