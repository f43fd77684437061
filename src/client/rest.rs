use super::{take_field, RequestSender, ServerBackend};
use crate::transport::{ndjson::decode_ndjson, HttpTransport};
use crate::types::{
    ActivationResult, NetworkInterfaces, RequestDefinition, RequestOptions, ResponseStreamEvent,
    ServerConfig, ServerInterceptor,
};
use crate::{BoxStream, Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

const SOURCE: &str = "rest_client";

/// Client for servers exposing the resource-oriented REST API.
pub struct RestApiClient {
    transport: Arc<HttpTransport>,
}

impl RestApiClient {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    async fn get_field<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        field: &str,
    ) -> Result<T> {
        let mut body: Value = self.transport.get_json(path, query).await?;
        take_field(&mut body, field, SOURCE)
    }
}

/// Percent-encode one path segment; only unreserved characters pass through.
fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[async_trait]
impl ServerBackend for RestApiClient {
    async fn get_server_version(&self) -> Result<String> {
        self.get_field("/version", &[], "version").await
    }

    async fn get_config(&self, proxy_port: u16) -> Result<ServerConfig> {
        self.get_field("/config", &[("proxyPort", proxy_port.to_string())], "config")
            .await
    }

    async fn get_network_interfaces(&self) -> Result<NetworkInterfaces> {
        self.get_field("/network-interfaces", &[], "networkInterfaces")
            .await
    }

    async fn get_interceptors(&self, proxy_port: u16) -> Result<Vec<ServerInterceptor>> {
        self.get_field(
            "/interceptors",
            &[("proxyPort", proxy_port.to_string())],
            "interceptors",
        )
        .await
    }

    async fn get_detailed_interceptor_metadata(&self, id: &str) -> Result<Option<Value>> {
        let path = format!("/interceptors/{}/metadata", encode_segment(id));
        let metadata: Value = self.get_field(&path, &[], "interceptorMetadata").await?;
        Ok(Some(metadata).filter(|m| !m.is_null()))
    }

    async fn activate_interceptor(
        &self,
        id: &str,
        proxy_port: u16,
        options: Option<Value>,
    ) -> Result<ActivationResult> {
        let path = format!(
            "/interceptors/{}/activate/{}",
            encode_segment(id),
            proxy_port
        );
        let mut body: Value = self
            .transport
            .post_json(&path, &options.unwrap_or_else(|| json!({})))
            .await?;
        let result: Value = take_field(&mut body, "result", SOURCE)?;
        ActivationResult::from_value(result)
    }

    async fn trigger_server_update(&self) -> Result<()> {
        self.transport.post_empty("/update", &json!({})).await
    }
}

#[async_trait]
impl RequestSender for RestApiClient {
    async fn send_request(
        &self,
        definition: &RequestDefinition,
        options: &RequestOptions,
    ) -> Result<BoxStream<'static, ResponseStreamEvent>> {
        let body = json!({
            "request": definition,
            "options": options,
        });
        let bytes = self.transport.post_stream("/client/send", &body).await?;

        let events = decode_ndjson(bytes).map(|item| {
            item.and_then(|value| {
                serde_json::from_value::<ResponseStreamEvent>(value).map_err(Error::from)
            })
        });
        Ok(Box::pin(events))
    }
}
