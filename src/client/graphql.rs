//! Client for servers that only speak the legacy GraphQL API.

use super::{take_field, ServerBackend};
use crate::transport::HttpTransport;
use crate::types::{ActivationResult, NetworkInterfaces, ServerConfig, ServerInterceptor};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const SOURCE: &str = "graphql_client";

const VERSION_QUERY: &str = "query getVersion { version }";

const CONFIG_QUERY: &str = "query getConfig($proxyPort: Int!) {
    config {
        certificatePath
        certificateContent
        certificateFingerprint
    }
    networkInterfaces
    systemProxy {
        proxyUrl
        noProxy
    }
    dnsServers(proxyPort: $proxyPort)
    ruleParameterKeys
}";

const INTERFACES_QUERY: &str = "query getNetworkInterfaces { networkInterfaces }";

const INTERCEPTORS_QUERY: &str = "query getInterceptors($proxyPort: Int!) {
    interceptors {
        id
        version
        metadata
        isActivable
        isActive(proxyPort: $proxyPort)
    }
}";

const METADATA_QUERY: &str = "query getDetailedInterceptorMetadata($id: ID!) {
    interceptor(id: $id) {
        metadata(type: DETAILED)
    }
}";

const ACTIVATE_MUTATION: &str =
    "mutation Activate($id: ID!, $proxyPort: Int!, $options: Json) {
    activateInterceptor(id: $id, proxyPort: $proxyPort, options: $options)
}";

const UPDATE_MUTATION: &str = "mutation TriggerUpdate { triggerUpdate }";

pub struct GraphQlApiClient {
    transport: Arc<HttpTransport>,
    path: String,
}

impl GraphQlApiClient {
    pub fn new(transport: Arc<HttpTransport>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }

    /// Run one query and return its `data` object. A non-empty `errors` array fails the
    /// whole call, even when partial data came back.
    async fn query(&self, query: &str, variables: Value) -> Result<Value> {
        let body = json!({ "query": query, "variables": variables });
        let mut response: Value = self.transport.post_json(&self.path, &body).await?;

        if let Some(Value::Array(errors)) = response.get("errors") {
            if !errors.is_empty() {
                let messages = errors
                    .iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                            .unwrap_or_else(|| e.to_string())
                    })
                    .collect();
                return Err(Error::GraphQl { messages });
            }
        }

        match response.get_mut("data").map(Value::take) {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(Error::protocol_with_context(
                "GraphQL response has no data",
                ErrorContext::new()
                    .with_field_path("data")
                    .with_source(SOURCE),
            )),
        }
    }
}

#[async_trait]
impl ServerBackend for GraphQlApiClient {
    async fn get_server_version(&self) -> Result<String> {
        let mut data = self.query(VERSION_QUERY, json!({})).await?;
        take_field(&mut data, "version", SOURCE)
    }

    async fn get_config(&self, proxy_port: u16) -> Result<ServerConfig> {
        let mut data = self
            .query(CONFIG_QUERY, json!({ "proxyPort": proxy_port }))
            .await?;

        // The legacy schema spreads the config across several root fields.
        let mut merged: Map<String, Value> = match data.get_mut("config").map(Value::take) {
            Some(Value::Object(config)) => config,
            _ => {
                return Err(Error::protocol_with_context(
                    "response is missing 'config'",
                    ErrorContext::new()
                        .with_field_path("data.config")
                        .with_source(SOURCE),
                ))
            }
        };
        for key in [
            "networkInterfaces",
            "systemProxy",
            "dnsServers",
            "ruleParameterKeys",
        ] {
            match data.get_mut(key).map(Value::take) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    merged.insert(key.to_string(), value);
                }
            }
        }

        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    async fn get_network_interfaces(&self) -> Result<NetworkInterfaces> {
        let mut data = self.query(INTERFACES_QUERY, json!({})).await?;
        take_field(&mut data, "networkInterfaces", SOURCE)
    }

    async fn get_interceptors(&self, proxy_port: u16) -> Result<Vec<ServerInterceptor>> {
        let mut data = self
            .query(INTERCEPTORS_QUERY, json!({ "proxyPort": proxy_port }))
            .await?;
        take_field(&mut data, "interceptors", SOURCE)
    }

    async fn get_detailed_interceptor_metadata(&self, id: &str) -> Result<Option<Value>> {
        let data = self.query(METADATA_QUERY, json!({ "id": id })).await?;
        Ok(data
            .get("interceptor")
            .and_then(|i| i.get("metadata"))
            .filter(|m| !m.is_null())
            .cloned())
    }

    async fn activate_interceptor(
        &self,
        id: &str,
        proxy_port: u16,
        options: Option<Value>,
    ) -> Result<ActivationResult> {
        let mut data = self
            .query(
                ACTIVATE_MUTATION,
                json!({ "id": id, "proxyPort": proxy_port, "options": options }),
            )
            .await?;
        let result: Value = take_field(&mut data, "activateInterceptor", SOURCE)?;
        ActivationResult::from_value(result)
    }

    async fn trigger_server_update(&self) -> Result<()> {
        self.query(UPDATE_MUTATION, json!({})).await?;
        Ok(())
    }
}
