//! Version negotiation against scripted backends.

mod common;

use common::{facade, facade_with_sink, FakeBackend, FakeFactory};
use server_api::negotiation::{InMemoryNegotiationSink, NegotiationEvent};
use server_api::{Protocol, ReadinessGate};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_pending, assert_ready, task};

#[tokio::test]
async fn test_rest_selected_when_version_in_range() {
    let factory = FakeFactory::new(FakeBackend::new("1.14.0"), FakeBackend::new("1.14.0"));
    let api = facade(factory.clone());
    api.announce_server_ready();

    assert_eq!(api.initialize().await.unwrap(), Protocol::Rest);
    assert_eq!(factory.graphql.version_calls(), 0);
}

#[tokio::test]
async fn test_graphql_selected_when_version_below_range() {
    // Older servers answer the version probe on either endpoint.
    let factory = FakeFactory::new(FakeBackend::new("1.10.3"), FakeBackend::new("1.10.3"));
    let api = facade(factory.clone());
    api.announce_server_ready();

    assert_eq!(api.initialize().await.unwrap(), Protocol::GraphQl);
    assert_eq!(api.negotiated_protocol(), Some(Protocol::GraphQl));
}

#[tokio::test]
async fn test_custom_range_boundaries() {
    for (version, expected) in [("0.1.20", Protocol::Rest), ("0.1.10", Protocol::GraphQl)] {
        let factory = FakeFactory::new(FakeBackend::new(version), FakeBackend::new(version));
        let api = server_api::ServerApi::builder(common::foreground("http://localhost/"))
            .config(server_api::ServerApiConfig::new().with_rest_supported(">=0.1.18"))
            .client_factory(factory)
            .negotiation_sink(Arc::new(server_api::negotiation::NoopNegotiationSink))
            .build()
            .unwrap();
        api.announce_server_ready();
        assert_eq!(api.initialize().await.unwrap(), expected, "version {}", version);
    }
}

#[tokio::test]
async fn test_rest_failures_fall_back_to_graphql_version() {
    let factory = FakeFactory::new(
        FakeBackend::unreachable(),
        FakeBackend::new("1.0.0").failing_probes(2),
    );
    let sink = Arc::new(InMemoryNegotiationSink::new());
    let gate = ReadinessGate::new();
    let api = facade_with_sink(factory.clone(), sink.clone(), gate.clone());
    gate.signal_ready();

    assert_eq!(api.initialize().await.unwrap(), Protocol::GraphQl);

    // REST was probed once per round and never produced a version.
    assert_eq!(factory.rest.version_calls(), 3);
    assert_eq!(factory.graphql.version_calls(), 3);
    assert_eq!(sink.probe_failures(Protocol::Rest), 3);
    assert_eq!(sink.probe_failures(Protocol::GraphQl), 2);

    let events = sink.events();
    assert!(events.contains(&NegotiationEvent::VersionDiscovered {
        version: "1.0.0".to_string(),
        via: Protocol::GraphQl,
    }));
    assert_eq!(
        events.last(),
        Some(&NegotiationEvent::BackendSelected {
            protocol: Protocol::GraphQl,
            version: "1.0.0".to_string(),
        })
    );
}

#[tokio::test]
async fn test_rest_probe_precedes_graphql_each_round() {
    let factory = FakeFactory::new(
        FakeBackend::new("1.14.0").failing_probes(1),
        FakeBackend::unreachable(),
    );
    let sink = Arc::new(InMemoryNegotiationSink::new());
    let gate = ReadinessGate::new();
    let api = facade_with_sink(factory.clone(), sink.clone(), gate.clone());
    gate.signal_ready();

    assert_eq!(api.initialize().await.unwrap(), Protocol::Rest);

    let failures: Vec<(Protocol, u32)> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            NegotiationEvent::ProbeFailed {
                protocol, attempt, ..
            } => Some((protocol, attempt)),
            _ => None,
        })
        .collect();
    assert_eq!(failures, vec![(Protocol::Rest, 1), (Protocol::GraphQl, 1)]);
}

#[tokio::test]
async fn test_negotiation_waits_for_readiness() {
    let factory = FakeFactory::new(FakeBackend::new("1.14.0"), FakeBackend::new("1.14.0"));
    let api = facade(factory.clone());

    let mut init = task::spawn(api.initialize());
    assert_pending!(init.poll());
    assert_eq!(factory.builds(), 0);
    assert_eq!(factory.rest.version_calls(), 0);

    api.announce_server_ready();
    assert!(init.is_woken());
    assert_eq!(assert_ready!(init.poll()).unwrap(), Protocol::Rest);
    assert_eq!(factory.builds(), 1);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_negotiation() {
    let factory = FakeFactory::new(FakeBackend::new("1.14.0"), FakeBackend::new("1.14.0"));
    let api = facade(factory.clone());

    let (interceptors, config, interfaces, _) = tokio::join!(
        api.get_interceptors(8000),
        api.get_config(8000),
        api.get_network_interfaces(),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            api.announce_server_ready();
        }
    );

    assert_eq!(interceptors.unwrap()[0].id, "fresh-chrome");
    assert_eq!(config.unwrap().certificate_path, "/tmp/ca.pem");
    assert!(interfaces.unwrap().is_empty());

    assert_eq!(factory.builds(), 1);
    assert_eq!(factory.rest.version_calls(), 1);
    assert_eq!(factory.rest.interceptor_calls.load(Ordering::SeqCst), 1);

    // Later calls reuse the stored client.
    api.get_interceptors(8001).await.unwrap();
    assert_eq!(factory.builds(), 1);
    assert_eq!(factory.rest.version_calls(), 1);
}

#[tokio::test]
async fn test_credential_is_passed_to_client_factory() {
    let factory = FakeFactory::new(FakeBackend::new("1.14.0"), FakeBackend::new("1.14.0"));
    let api = facade(factory.clone());
    api.announce_server_ready();
    api.initialize().await.unwrap();

    assert_eq!(
        *factory.tokens.lock().unwrap(),
        vec![Some("test-token".to_string())]
    );
}

#[tokio::test]
async fn test_invalid_rest_range_fails_at_build() {
    let factory = FakeFactory::new(FakeBackend::new("1.14.0"), FakeBackend::new("1.14.0"));
    let result = server_api::ServerApi::builder(common::foreground("http://localhost/"))
        .config(server_api::ServerApiConfig::new().with_rest_supported("not a range"))
        .client_factory(factory)
        .build();
    assert!(matches!(result, Err(server_api::Error::Configuration { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_failed_rounds_pause_for_the_retry_delay() {
    let factory = FakeFactory::new(
        FakeBackend::unreachable(),
        FakeBackend::new("1.0.0").failing_probes(3),
    );
    let api = server_api::ServerApi::builder(common::foreground("http://localhost/"))
        .client_factory(factory.clone())
        .negotiation_sink(Arc::new(server_api::negotiation::NoopNegotiationSink))
        .probe_retry_delay(Duration::from_millis(100))
        .build()
        .unwrap();
    api.announce_server_ready();

    let started = tokio::time::Instant::now();
    assert_eq!(api.initialize().await.unwrap(), Protocol::GraphQl);

    // Three failed rounds, one pause after each; the fourth round succeeds without one.
    assert_eq!(started.elapsed(), Duration::from_millis(300));
    assert_eq!(factory.rest.version_calls(), 4);
    assert_eq!(factory.graphql.version_calls(), 4);
}
