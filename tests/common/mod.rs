//! In-process fakes for negotiation and facade tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use server_api::client::{CandidateClients, ClientFactory, RequestSender, ServerBackend};
use server_api::negotiation::{InMemoryNegotiationSink, NoopNegotiationSink};
use server_api::types::{
    ActivationResult, NetworkInterfaces, RequestDefinition, RequestOptions, ResponseStreamEvent,
    ServerConfig, ServerInterceptor,
};
use server_api::{
    AuthToken, BoxStream, Error, ExecutionContext, ReadinessGate, Result, ServerApi,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// A scripted backend. Version probes fail `failing_probes` times before answering.
pub struct FakeBackend {
    version: Option<String>,
    failing_probes: usize,
    activation: Mutex<Value>,
    update_fails: bool,
    pub version_calls: AtomicUsize,
    pub interceptor_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    pub activations: Mutex<Vec<(String, u16, Option<Value>)>>,
}

impl FakeBackend {
    pub fn new(version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            failing_probes: 0,
            activation: Mutex::new(Value::Bool(true)),
            update_fails: false,
            version_calls: AtomicUsize::new(0),
            interceptor_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            activations: Mutex::new(Vec::new()),
        }
    }

    /// Never answers a version probe.
    pub fn unreachable() -> Self {
        Self {
            version: None,
            ..Self::new("0.0.0")
        }
    }

    pub fn failing_probes(mut self, n: usize) -> Self {
        self.failing_probes = n;
        self
    }

    pub fn activation_result(self, raw: Value) -> Self {
        *self.activation.lock().unwrap() = raw;
        self
    }

    pub fn update_fails(mut self) -> Self {
        self.update_fails = true;
        self
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }
}

fn refused() -> Error {
    Error::Api {
        status: 503,
        code: None,
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl ServerBackend for FakeBackend {
    async fn get_server_version(&self) -> Result<String> {
        let call = self.version_calls.fetch_add(1, Ordering::SeqCst);
        match &self.version {
            Some(v) if call >= self.failing_probes => Ok(v.clone()),
            _ => Err(refused()),
        }
    }

    async fn get_config(&self, _proxy_port: u16) -> Result<ServerConfig> {
        Ok(serde_json::from_value(serde_json::json!({
            "certificatePath": "/tmp/ca.pem"
        }))?)
    }

    async fn get_network_interfaces(&self) -> Result<NetworkInterfaces> {
        Ok(NetworkInterfaces::new())
    }

    async fn get_interceptors(&self, _proxy_port: u16) -> Result<Vec<ServerInterceptor>> {
        self.interceptor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ServerInterceptor {
            id: "fresh-chrome".to_string(),
            version: "1.0.0".to_string(),
            metadata: None,
            is_activable: true,
            is_active: false,
        }])
    }

    async fn get_detailed_interceptor_metadata(&self, _id: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn activate_interceptor(
        &self,
        id: &str,
        proxy_port: u16,
        options: Option<Value>,
    ) -> Result<ActivationResult> {
        self.activations
            .lock()
            .unwrap()
            .push((id.to_string(), proxy_port, options));
        let raw = self.activation.lock().unwrap().clone();
        ActivationResult::from_value(raw)
    }

    async fn trigger_server_update(&self) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.update_fails {
            Err(refused())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RequestSender for FakeBackend {
    async fn send_request(
        &self,
        _definition: &RequestDefinition,
        _options: &RequestOptions,
    ) -> Result<BoxStream<'static, ResponseStreamEvent>> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let events = vec![Ok(ResponseStreamEvent::ResponseEnd {
            timing_events: None,
        })];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// Hands out the same two fakes on every build and records what it was asked for.
pub struct FakeFactory {
    pub rest: Arc<FakeBackend>,
    pub graphql: Arc<FakeBackend>,
    pub builds: AtomicUsize,
    pub tokens: Mutex<Vec<Option<String>>>,
}

impl FakeFactory {
    pub fn new(rest: FakeBackend, graphql: FakeBackend) -> Arc<Self> {
        Arc::new(Self {
            rest: Arc::new(rest),
            graphql: Arc::new(graphql),
            builds: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ClientFactory for FakeFactory {
    fn build(&self, auth_token: Option<AuthToken>) -> Result<CandidateClients> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .push(auth_token.map(|t| t.as_str().to_string()));
        Ok(CandidateClients::new(self.rest.clone(), self.graphql.clone()))
    }
}

pub fn foreground(location: &str) -> ExecutionContext {
    ExecutionContext::foreground(Url::parse(location).unwrap())
}

/// A facade over `factory` with zero probe delay and no log output.
pub fn facade(factory: Arc<FakeFactory>) -> ServerApi {
    ServerApi::builder(foreground("http://localhost/?authToken=test-token"))
        .client_factory(factory)
        .negotiation_sink(Arc::new(NoopNegotiationSink))
        .probe_retry_delay(Duration::ZERO)
        .build()
        .unwrap()
}

pub fn facade_with_sink(
    factory: Arc<FakeFactory>,
    sink: Arc<InMemoryNegotiationSink>,
    gate: ReadinessGate,
) -> ServerApi {
    ServerApi::builder(foreground("http://localhost/"))
        .client_factory(factory)
        .negotiation_sink(sink)
        .readiness(gate)
        .probe_retry_delay(Duration::ZERO)
        .build()
        .unwrap()
}
