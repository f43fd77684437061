//! Server configuration payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Network interfaces keyed by interface name, as reported by the server host.
pub type NetworkInterfaces = BTreeMap<String, Vec<NetworkInterfaceInfo>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterfaceInfo {
    pub address: String,
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub cidr: Option<String>,
    /// `family`, `scopeid` and anything else the host reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProxy {
    pub proxy_url: String,
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

/// Configuration the server exposes to clients for a given proxy port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub certificate_path: String,
    #[serde(default)]
    pub certificate_content: Option<String>,
    #[serde(default)]
    pub certificate_fingerprint: Option<String>,
    #[serde(default)]
    pub network_interfaces: NetworkInterfaces,
    #[serde(default)]
    pub system_proxy: Option<SystemProxy>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    #[serde(default)]
    pub rule_parameter_keys: Vec<String>,
}
