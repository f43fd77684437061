//! # Types Module
//!
//! Payload types exchanged with the server. The negotiation layer passes these through
//! untouched; only [`ActivationResult`] is inspected, by the facade.
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`server`] | Server configuration and network interfaces |
//! | [`interceptor`] | Interceptor descriptors and activation results |
//! | [`request`] | Request definitions/options for `send_request` and its response events |

pub mod interceptor;
pub mod request;
pub mod server;

pub use interceptor::{ActivationResult, ServerInterceptor};
pub use request::{
    AdditionalCa, ClientCertificate, RequestDefinition, RequestOptions, ResponseStreamEvent,
    StreamError,
};
pub use server::{NetworkInterfaceInfo, NetworkInterfaces, ServerConfig, SystemProxy};

/// Serde helper for byte buffers carried as base64 strings on the wire.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
