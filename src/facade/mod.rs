//! The public entry point.
//!
//! [`ServerApi`] hides which protocol the server speaks. Every operation first waits for the
//! memoized negotiation (readiness, credential, version probe), then forwards to the
//! selected client.

pub mod builder;

pub use builder::ServerApiBuilder;

use crate::auth::{CredentialResolver, ExecutionContext};
use crate::client::{ApiClient, Protocol};
use crate::negotiation::VersionNegotiator;
use crate::readiness::ReadinessGate;
use crate::types::{
    ActivationResult, NetworkInterfaces, RequestDefinition, RequestOptions, ResponseStreamEvent,
    ServerConfig, ServerInterceptor,
};
use crate::{ActivationError, BoxStream, Error, Result};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::warn;

pub struct ServerApi {
    credentials: CredentialResolver,
    readiness: ReadinessGate,
    negotiator: VersionNegotiator,
    client: OnceCell<ApiClient>,
}

impl ServerApi {
    /// A facade with default configuration and HTTP clients.
    pub fn new(context: ExecutionContext) -> Result<Self> {
        ServerApiBuilder::new(context).build()
    }

    pub fn builder(context: ExecutionContext) -> ServerApiBuilder {
        ServerApiBuilder::new(context)
    }

    pub(crate) fn from_parts(
        credentials: CredentialResolver,
        readiness: ReadinessGate,
        negotiator: VersionNegotiator,
    ) -> Self {
        Self {
            credentials,
            readiness,
            negotiator,
            client: OnceCell::new(),
        }
    }

    /// The negotiated client. The first caller runs negotiation; concurrent callers wait for
    /// it, later callers get the stored client. A failed negotiation is not stored.
    pub async fn client(&self) -> Result<&ApiClient> {
        self.client
            .get_or_try_init(|| async {
                let token = self.credentials.resolve().await;
                self.negotiator.negotiate(token, &self.readiness).await
            })
            .await
    }

    /// Run negotiation now instead of on first use.
    pub async fn initialize(&self) -> Result<Protocol> {
        Ok(self.client().await?.protocol())
    }

    pub fn negotiated_protocol(&self) -> Option<Protocol> {
        self.client.get().map(ApiClient::protocol)
    }

    /// Mark the server as started. Only the first call has an effect.
    pub fn announce_server_ready(&self) {
        self.readiness.signal_ready();
    }

    pub async fn wait_until_server_ready(&self) {
        self.readiness.await_ready().await;
    }

    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    pub async fn get_server_version(&self) -> Result<String> {
        self.client().await?.backend().get_server_version().await
    }

    pub async fn get_config(&self, proxy_port: u16) -> Result<ServerConfig> {
        self.client().await?.backend().get_config(proxy_port).await
    }

    pub async fn get_network_interfaces(&self) -> Result<NetworkInterfaces> {
        self.client().await?.backend().get_network_interfaces().await
    }

    pub async fn get_interceptors(&self, proxy_port: u16) -> Result<Vec<ServerInterceptor>> {
        self.client()
            .await?
            .backend()
            .get_interceptors(proxy_port)
            .await
    }

    pub async fn get_detailed_interceptor_metadata(&self, id: &str) -> Result<Option<Value>> {
        self.client()
            .await?
            .backend()
            .get_detailed_interceptor_metadata(id)
            .await
    }

    /// Activate an interceptor and return its success metadata.
    ///
    /// A reported failure becomes [`Error::Activation`] carrying every field the backend
    /// attached to it.
    pub async fn activate_interceptor(
        &self,
        id: &str,
        proxy_port: u16,
        options: Option<Value>,
    ) -> Result<Value> {
        let result = self
            .client()
            .await?
            .backend()
            .activate_interceptor(id, proxy_port, options)
            .await?;

        if !result.is_success() {
            warn!(
                interceptor = id,
                proxy_port,
                result = %result.to_value(),
                "Interceptor activation failed"
            );
        }

        match result {
            ActivationResult::Success { metadata } => Ok(metadata),
            ActivationResult::Failure { fields } => Err(ActivationError::new(id, fields).into()),
        }
    }

    /// Have the server send a request and stream back what happens. Only the REST API
    /// can do this; against a GraphQL server it fails without touching the network.
    pub async fn send_request(
        &self,
        definition: &RequestDefinition,
        options: &RequestOptions,
    ) -> Result<BoxStream<'static, ResponseStreamEvent>> {
        let client = self.client().await?;
        match client.as_request_sender() {
            Some(sender) => sender.send_request(definition, options).await,
            None => Err(Error::Unsupported {
                operation: "send_request",
                protocol: client.protocol(),
            }),
        }
    }

    /// Ask the server to update itself. Advisory: failures are logged and dropped.
    pub async fn trigger_server_update(&self) {
        let outcome = match self.client().await {
            Ok(client) => client.backend().trigger_server_update().await,
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            warn!(error = %e, "Failed to trigger server update");
        }
    }

    pub fn execution_context(&self) -> &ExecutionContext {
        self.credentials.context()
    }
}
