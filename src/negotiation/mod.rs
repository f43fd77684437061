//! Server version negotiation.
//!
//! Once the server is announced ready, both candidate clients are built and the server is
//! asked for its version, REST first, then GraphQL. Rounds where neither answers are
//! repeated after a fixed pause, with no attempt bound. The version that comes back picks
//! the protocol through the [`CompatibilityPolicy`].

pub mod events;
pub mod policy;

pub use events::{
    tracing_sink, InMemoryNegotiationSink, NegotiationEvent, NegotiationSink,
    NoopNegotiationSink, TracingNegotiationSink,
};
pub use policy::{CompatibilityPolicy, DEFAULT_REST_API_SUPPORTED};

use crate::auth::AuthToken;
use crate::client::{ApiClient, ClientFactory, Protocol};
use crate::readiness::ReadinessGate;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Pause after a round in which both probes failed.
    pub retry_delay: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_millis(100),
        }
    }
}

pub struct VersionNegotiator {
    factory: Arc<dyn ClientFactory>,
    policy: CompatibilityPolicy,
    settings: ProbeSettings,
    sink: Arc<dyn NegotiationSink>,
}

impl VersionNegotiator {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        policy: CompatibilityPolicy,
        settings: ProbeSettings,
        sink: Arc<dyn NegotiationSink>,
    ) -> Self {
        Self {
            factory,
            policy,
            settings,
            sink,
        }
    }

    pub fn policy(&self) -> &CompatibilityPolicy {
        &self.policy
    }

    /// Wait for readiness, then discover the server version and return the matching client.
    ///
    /// Probe failures are reported to the sink and retried; they never surface here. The
    /// only error is a failure to build the candidate clients.
    pub async fn negotiate(
        &self,
        credential: Option<AuthToken>,
        gate: &ReadinessGate,
    ) -> Result<ApiClient> {
        gate.await_ready().await;

        let candidates = self.factory.build(credential)?;

        let mut attempt: u32 = 0;
        let (version, via) = loop {
            attempt = attempt.saturating_add(1);

            match candidates.rest().backend().get_server_version().await {
                Ok(version) => break (version, Protocol::Rest),
                Err(e) => {
                    self.report_failure(Protocol::Rest, attempt, &e).await;
                }
            }

            match candidates.graphql().backend().get_server_version().await {
                Ok(version) => break (version, Protocol::GraphQl),
                Err(e) => {
                    self.report_failure(Protocol::GraphQl, attempt, &e).await;
                }
            }

            tokio::time::sleep(self.settings.retry_delay).await;
        };

        self.sink
            .report(NegotiationEvent::VersionDiscovered {
                version: version.clone(),
                via,
            })
            .await;

        let protocol = if self.policy.supports_rest(&version) {
            Protocol::Rest
        } else {
            Protocol::GraphQl
        };

        self.sink
            .report(NegotiationEvent::BackendSelected { protocol, version })
            .await;

        Ok(candidates.into_selected(protocol))
    }

    async fn report_failure(&self, protocol: Protocol, attempt: u32, error: &crate::Error) {
        self.sink
            .report(NegotiationEvent::ProbeFailed {
                protocol,
                attempt,
                error: error.to_string(),
            })
            .await;
    }
}
