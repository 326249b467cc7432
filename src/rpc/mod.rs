//! RPC surface for desktop mode
//!
//! Mirrors the remote procedure calls of the online backend. Every call
//! answers with the same envelope: `{ "data": ..., "error": null }` on
//! success, `{ "data": null, "error": { "message": ... } }` otherwise.

pub mod dispatcher;

pub use dispatcher::{RpcDispatcher, RpcFunction, RpcParams};

use serde::{Deserialize, Serialize};

/// Error half of the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Result envelope: exactly one of `data` / `error` is non-null
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResult {
    pub data: serde_json::Value,
    pub error: Option<RpcError>,
}

impl RpcResult {
    pub fn ok(data: impl Into<serde_json::Value>) -> Self {
        Self {
            data: data.into(),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            data: serde_json::Value::Null,
            error: Some(RpcError {
                message: message.into(),
                code: None,
            }),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.code = Some(code.into());
        }
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
