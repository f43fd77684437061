//! Protocol clients.
//!
//! The server speaks one of two mutually exclusive protocols. Both clients share the
//! [`ServerBackend`] capability set; only the REST client can also send application
//! requests ([`RequestSender`]). [`ApiClient`] is the closed variant over the two.

pub mod graphql;
pub mod rest;

pub use graphql::GraphQlApiClient;
pub use rest::RestApiClient;

use crate::auth::AuthToken;
use crate::config::ServerApiConfig;
use crate::transport::HttpTransport;
use crate::types::{
    ActivationResult, NetworkInterfaces, RequestDefinition, RequestOptions, ResponseStreamEvent,
    ServerConfig, ServerInterceptor,
};
use crate::{BoxStream, Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Which protocol a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Rest,
    GraphQl,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Rest => f.write_str("REST"),
            Protocol::GraphQl => f.write_str("GraphQL"),
        }
    }
}

/// Operations every protocol client supports.
#[async_trait]
pub trait ServerBackend: Send + Sync {
    async fn get_server_version(&self) -> Result<String>;

    async fn get_config(&self, proxy_port: u16) -> Result<ServerConfig>;

    async fn get_network_interfaces(&self) -> Result<NetworkInterfaces>;

    async fn get_interceptors(&self, proxy_port: u16) -> Result<Vec<ServerInterceptor>>;

    /// `Ok(None)` when the interceptor has no detailed metadata.
    async fn get_detailed_interceptor_metadata(&self, id: &str) -> Result<Option<Value>>;

    async fn activate_interceptor(
        &self,
        id: &str,
        proxy_port: u16,
        options: Option<Value>,
    ) -> Result<ActivationResult>;

    async fn trigger_server_update(&self) -> Result<()>;
}

/// Sending application-level requests through the server (REST only).
#[async_trait]
pub trait RequestSender: Send + Sync {
    async fn send_request(
        &self,
        definition: &RequestDefinition,
        options: &RequestOptions,
    ) -> Result<BoxStream<'static, ResponseStreamEvent>>;
}

/// A protocol client, tagged with the protocol it speaks.
///
/// `Rest` holds two views of the same client object: the shared capability set and the
/// REST-only request capability.
#[derive(Clone)]
pub enum ApiClient {
    Rest {
        api: Arc<dyn ServerBackend>,
        requests: Arc<dyn RequestSender>,
    },
    GraphQl {
        api: Arc<dyn ServerBackend>,
    },
}

impl ApiClient {
    pub fn rest<C>(client: Arc<C>) -> Self
    where
        C: ServerBackend + RequestSender + 'static,
    {
        ApiClient::Rest {
            api: client.clone(),
            requests: client,
        }
    }

    pub fn graphql<C>(client: Arc<C>) -> Self
    where
        C: ServerBackend + 'static,
    {
        ApiClient::GraphQl { api: client }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            ApiClient::Rest { .. } => Protocol::Rest,
            ApiClient::GraphQl { .. } => Protocol::GraphQl,
        }
    }

    pub fn backend(&self) -> &dyn ServerBackend {
        match self {
            ApiClient::Rest { api, .. } | ApiClient::GraphQl { api } => api.as_ref(),
        }
    }

    /// The request capability, present only on the REST variant.
    pub fn as_request_sender(&self) -> Option<&dyn RequestSender> {
        match self {
            ApiClient::Rest { requests, .. } => Some(requests.as_ref()),
            ApiClient::GraphQl { .. } => None,
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("protocol", &self.protocol())
            .finish()
    }
}

/// One client per protocol, built for the same credential. The variants are fixed by
/// construction: `rest` is always [`ApiClient::Rest`], `graphql` always [`ApiClient::GraphQl`].
pub struct CandidateClients {
    rest: ApiClient,
    graphql: ApiClient,
}

impl CandidateClients {
    pub fn new<R, G>(rest: Arc<R>, graphql: Arc<G>) -> Self
    where
        R: ServerBackend + RequestSender + 'static,
        G: ServerBackend + 'static,
    {
        Self {
            rest: ApiClient::rest(rest),
            graphql: ApiClient::graphql(graphql),
        }
    }

    pub fn rest(&self) -> &ApiClient {
        &self.rest
    }

    pub fn graphql(&self) -> &ApiClient {
        &self.graphql
    }

    pub fn into_selected(self, protocol: Protocol) -> ApiClient {
        match protocol {
            Protocol::Rest => self.rest,
            Protocol::GraphQl => self.graphql,
        }
    }
}

/// Builds the candidate clients negotiation chooses between.
pub trait ClientFactory: Send + Sync {
    fn build(&self, auth_token: Option<AuthToken>) -> Result<CandidateClients>;
}

/// Default factory: HTTP clients against the configured origin, sharing one connection pool.
pub struct HttpClientFactory {
    config: ServerApiConfig,
}

impl HttpClientFactory {
    pub fn new(config: ServerApiConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, auth_token: Option<AuthToken>) -> Result<CandidateClients> {
        let transport = Arc::new(HttpTransport::new(&self.config, auth_token)?);
        Ok(CandidateClients::new(
            Arc::new(RestApiClient::new(transport.clone())),
            Arc::new(GraphQlApiClient::new(
                transport,
                self.config.graphql_path.clone(),
            )),
        ))
    }
}

/// Pull a named member out of a response object and deserialize it.
pub(crate) fn take_field<T: DeserializeOwned>(body: &mut Value, name: &str, source: &str) -> Result<T> {
    let value = body
        .as_object_mut()
        .and_then(|obj| obj.remove(name))
        .ok_or_else(|| {
            Error::protocol_with_context(
                format!("response is missing '{}'", name),
                ErrorContext::new()
                    .with_field_path(name)
                    .with_source(source),
            )
        })?;
    Ok(serde_json::from_value(value)?)
}
