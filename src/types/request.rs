//! Application-level requests sent through the server, and the events it streams back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request for the server to send on the client's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDefinition {
    pub method: String,
    pub url: String,
    /// Header pairs in send order; duplicates are allowed.
    pub headers: Vec<(String, String)>,
    #[serde(with = "super::base64_bytes", default)]
    pub raw_body: Vec<u8>,
}

impl RequestDefinition {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            raw_body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = body.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalCa {
    /// PEM-encoded certificate.
    pub cert: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCertificate {
    #[serde(with = "super::base64_bytes")]
    pub pfx: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

/// Transport options for [`RequestDefinition`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Hostnames for which upstream TLS errors are ignored.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_host_https_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_additional_cas: Vec<AdditionalCa>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<ClientCertificate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_options: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
}

/// One event of the response stream returned by `send_request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponseStreamEvent {
    #[serde(rename_all = "camelCase")]
    RequestStart {
        #[serde(default)]
        start_time: Option<f64>,
        #[serde(default)]
        timing_events: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    ResponseHead {
        status_code: u16,
        #[serde(default)]
        status_message: Option<String>,
        #[serde(default)]
        headers: Option<Value>,
        #[serde(default)]
        raw_headers: Vec<(String, String)>,
    },
    #[serde(rename_all = "camelCase")]
    ResponseBodyPart {
        #[serde(with = "super::base64_bytes")]
        raw_body: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    ResponseTrailers {
        #[serde(default)]
        raw_trailers: Vec<(String, String)>,
    },
    #[serde(rename_all = "camelCase")]
    ResponseEnd {
        #[serde(default)]
        timing_events: Option<Value>,
    },
    Error { error: StreamError },
}

impl ResponseStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ResponseEnd { .. } | Self::Error { .. })
    }
}
