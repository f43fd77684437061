//! HTTP plumbing shared by the REST and GraphQL clients.

pub mod http;
pub mod ndjson;

pub use http::{HttpTransport, TransportError};
