//! Negotiation progress events and the sinks that receive them.
//!
//! | Sink | Use |
//! |------|-----|
//! | [`TracingNegotiationSink`] | Default; forwards events to `tracing` |
//! | [`NoopNegotiationSink`] | Discards everything |
//! | [`InMemoryNegotiationSink`] | Collects events for assertions |

use crate::client::Protocol;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationEvent {
    /// A version probe failed; `attempt` counts probe rounds from 1.
    ProbeFailed {
        protocol: Protocol,
        attempt: u32,
        error: String,
    },
    /// A probe answered with the server version.
    VersionDiscovered { version: String, via: Protocol },
    /// Negotiation finished and a backend was chosen.
    BackendSelected { protocol: Protocol, version: String },
}

#[async_trait]
pub trait NegotiationSink: Send + Sync {
    async fn report(&self, event: NegotiationEvent);
}

pub struct NoopNegotiationSink;

#[async_trait]
impl NegotiationSink for NoopNegotiationSink {
    async fn report(&self, _: NegotiationEvent) {}
}

pub struct TracingNegotiationSink;

#[async_trait]
impl NegotiationSink for TracingNegotiationSink {
    async fn report(&self, event: NegotiationEvent) {
        match event {
            NegotiationEvent::ProbeFailed {
                protocol,
                attempt,
                error,
            } => debug!(%protocol, attempt, %error, "Server version probe failed"),
            NegotiationEvent::VersionDiscovered { version, via } => {
                debug!(%version, %via, "Server version discovered")
            }
            NegotiationEvent::BackendSelected { protocol, version } => {
                info!(%protocol, %version, "Using {} server API", protocol)
            }
        }
    }
}

/// Returns the default sink.
pub fn tracing_sink() -> Arc<dyn NegotiationSink> {
    Arc::new(TracingNegotiationSink)
}

#[derive(Default)]
pub struct InMemoryNegotiationSink {
    events: RwLock<Vec<NegotiationEvent>>,
}

impl InMemoryNegotiationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NegotiationEvent> {
        self.events
            .read()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn probe_failures(&self, protocol: Protocol) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NegotiationEvent::ProbeFailed { protocol: p, .. } if *p == protocol))
            .count()
    }
}

#[async_trait]
impl NegotiationSink for InMemoryNegotiationSink {
    async fn report(&self, event: NegotiationEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink_collects_in_order() {
        let sink = InMemoryNegotiationSink::new();
        sink.report(NegotiationEvent::ProbeFailed {
            protocol: Protocol::Rest,
            attempt: 1,
            error: "connection refused".to_string(),
        })
        .await;
        sink.report(NegotiationEvent::BackendSelected {
            protocol: Protocol::GraphQl,
            version: "1.0.0".to_string(),
        })
        .await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(sink.probe_failures(Protocol::Rest), 1);
        assert_eq!(sink.probe_failures(Protocol::GraphQl), 0);
        assert!(matches!(
            events[1],
            NegotiationEvent::BackendSelected {
                protocol: Protocol::GraphQl,
                ..
            }
        ));
    }
}
