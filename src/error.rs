use crate::client::Protocol;
use serde_json::{Map, Value};
use thiserror::Error;

/// Structured error context for configuration and protocol failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "rest_supported", "data.interceptors")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config", "graphql_client")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A backend-reported interceptor activation failure.
///
/// `id` is stable (`activate-interceptor-{interceptor}`) so callers can match on it,
/// while `fields` keeps whatever diagnostic payload the backend attached.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ActivationError {
    pub id: String,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl ActivationError {
    pub fn new(interceptor_id: &str, fields: Map<String, Value>) -> Self {
        Self {
            id: format!("activate-interceptor-{}", interceptor_id),
            message: format!("Failed to activate interceptor {}", interceptor_id),
            fields,
        }
    }

    /// Look up one of the merged backend fields (e.g. `"error"`, `"code"`).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Unified error type for the server API layer.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Server API error: HTTP {status}{}: {message}", format_code(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("GraphQL error: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("{0}")]
    Activation(#[from] ActivationError),

    #[error("{operation} is not supported by the {protocol} API client")]
    Unsupported {
        operation: &'static str,
        protocol: Protocol,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Unexpected response: {message}{}", format_context(.context))]
    Protocol {
        message: String,
        context: ErrorContext,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_code(code: &Option<String>) -> String {
    match code {
        Some(c) => format!(" ({})", c),
        None => String::new(),
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new protocol (unexpected response shape) error with structured context
    pub fn protocol_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Protocol {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Protocol { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The activation failure details, if this is one.
    pub fn as_activation(&self) -> Option<&ActivationError> {
        match self {
            Error::Activation(e) => Some(e),
            _ => None,
        }
    }
}
