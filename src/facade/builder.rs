use super::ServerApi;
use crate::auth::{CredentialResolver, ExecutionContext};
use crate::client::{ClientFactory, HttpClientFactory};
use crate::config::ServerApiConfig;
use crate::negotiation::{
    tracing_sink, CompatibilityPolicy, NegotiationSink, ProbeSettings, VersionNegotiator,
};
use crate::readiness::ReadinessGate;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ServerApi`].
///
/// Everything except the execution context has a default: configuration from
/// [`ServerApiConfig::default`], HTTP clients, `tracing` diagnostics, and a fresh
/// readiness gate.
pub struct ServerApiBuilder {
    context: ExecutionContext,
    config: ServerApiConfig,
    factory: Option<Arc<dyn ClientFactory>>,
    sink: Arc<dyn NegotiationSink>,
    readiness: Option<ReadinessGate>,
}

impl ServerApiBuilder {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            config: ServerApiConfig::default(),
            factory: None,
            sink: tracing_sink(),
            readiness: None,
        }
    }

    pub fn config(mut self, config: ServerApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Shortcut for overriding just the probe retry delay.
    pub fn probe_retry_delay(mut self, delay: Duration) -> Self {
        self.config.probe_retry_delay = delay;
        self
    }

    /// Replace the HTTP clients, e.g. with in-process fakes.
    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Inject a negotiation sink. Default forwards to `tracing`.
    pub fn negotiation_sink(mut self, sink: Arc<dyn NegotiationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share a readiness gate with whoever launches the server.
    pub fn readiness(mut self, gate: ReadinessGate) -> Self {
        self.readiness = Some(gate);
        self
    }

    /// Fails only when the configured REST version range does not parse.
    pub fn build(self) -> Result<ServerApi> {
        let policy = CompatibilityPolicy::new(&self.config.rest_supported)?;
        let settings = ProbeSettings {
            retry_delay: self.config.probe_retry_delay,
        };
        let factory = match self.factory {
            Some(factory) => factory,
            None => Arc::new(HttpClientFactory::new(self.config)),
        };

        Ok(ServerApi::from_parts(
            CredentialResolver::new(self.context),
            self.readiness.unwrap_or_default(),
            VersionNegotiator::new(factory, policy, settings, self.sink),
        ))
    }
}
