//! # server-api
//!
//! Client access layer for a local interception server that speaks one of two protocols:
//! a REST API (newer servers) or a GraphQL API (older servers).
//!
//! ## Overview
//!
//! Callers talk to a single [`ServerApi`] value. On first use it waits until the server has
//! been announced ready, resolves the session credential, asks the server for its version
//! and picks the matching protocol client. Every later call goes straight to that client.
//!
//! ## Key Features
//!
//! - **Version negotiation**: REST first, GraphQL second, retried until one answers
//! - **Credential resolution**: location query parameter or shared keychain store
//! - **Capability checks**: request sending is REST-only and fails fast elsewhere
//! - **Streaming**: NDJSON response event streams from the REST API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use server_api::{ExecutionContext, ServerApi};
//!
//! #[tokio::main]
//! async fn main() -> server_api::Result<()> {
//!     let location = url::Url::parse("http://localhost:8080/?authToken=abc").unwrap();
//!     let api = ServerApi::new(ExecutionContext::foreground(location))?;
//!
//!     api.announce_server_ready();
//!     let version = api.get_server_version().await?;
//!     println!("server {} via {:?}", version, api.negotiated_protocol());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`facade`] | [`ServerApi`] and its builder |
//! | [`negotiation`] | Version probing, compatibility policy, diagnostics sinks |
//! | [`client`] | Protocol client traits, REST and GraphQL implementations |
//! | [`auth`] | Execution contexts, credential resolution, persistent stores |
//! | [`readiness`] | One-shot readiness gate |
//! | [`transport`] | HTTP transport and NDJSON decoding |
//! | [`types`] | Wire types (config, interceptors, request events) |
//! | [`config`] | Runtime configuration |

pub mod auth;
pub mod client;
pub mod config;
pub mod facade;
pub mod negotiation;
pub mod readiness;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use auth::{AuthToken, CredentialResolver, ExecutionContext, KeyValueStore};
pub use client::{ApiClient, ClientFactory, Protocol, RequestSender, ServerBackend};
pub use config::ServerApiConfig;
pub use facade::{ServerApi, ServerApiBuilder};
pub use negotiation::{CompatibilityPolicy, NegotiationEvent, NegotiationSink};
pub use readiness::ReadinessGate;
pub use types::{
    ActivationResult, RequestDefinition, RequestOptions, ResponseStreamEvent, ServerConfig,
    ServerInterceptor,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of fallible items.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{ActivationError, Error, ErrorContext};
