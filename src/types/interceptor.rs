//! Interceptor descriptors and activation outcomes.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInterceptor {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub is_activable: bool,
    #[serde(default)]
    pub is_active: bool,
}

/// Outcome of an interceptor activation as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationResult {
    Success { metadata: Value },
    /// Every diagnostic field the backend attached to the failure.
    Failure { fields: Map<String, Value> },
}

impl ActivationResult {
    /// Interpret a raw activation result.
    ///
    /// Accepts the object form `{ "success": bool, "metadata": ..., ... }` and the bare
    /// boolean older servers return. On failure, members of a `metadata` object are lifted
    /// alongside the other result members so callers can read e.g. `fields["error"]`
    /// regardless of nesting; top-level members win on conflict.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(true) => Ok(Self::Success {
                metadata: Value::Null,
            }),
            Value::Bool(false) => Ok(Self::Failure { fields: Map::new() }),
            Value::Object(mut obj) => {
                let success = match obj.remove("success") {
                    Some(Value::Bool(b)) => b,
                    other => {
                        return Err(Error::protocol_with_context(
                            "activation result has no boolean 'success' field",
                            ErrorContext::new()
                                .with_field_path("success")
                                .with_details(format!("{:?}", other))
                                .with_source("activation_result"),
                        ))
                    }
                };

                if success {
                    return Ok(Self::Success {
                        metadata: obj.remove("metadata").unwrap_or(Value::Null),
                    });
                }

                let mut fields = Map::new();
                if let Some(Value::Object(metadata)) = obj.get("metadata") {
                    for (k, v) in metadata {
                        fields.insert(k.clone(), v.clone());
                    }
                }
                for (k, v) in obj {
                    fields.insert(k, v);
                }
                Ok(Self::Failure { fields })
            }
            other => Err(Error::protocol_with_context(
                "unexpected activation result",
                ErrorContext::new()
                    .with_details(other.to_string())
                    .with_source("activation_result"),
            )),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The result in its wire shape, for logging.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success { metadata } => {
                serde_json::json!({ "success": true, "metadata": metadata })
            }
            Self::Failure { fields } => {
                let mut obj = fields.clone();
                obj.insert("success".to_string(), Value::Bool(false));
                Value::Object(obj)
            }
        }
    }
}
