//! JSON-RPC 2.0 message types shared by all provider transports.

use hivekit_core::{HivekitError, HivekitResult};
use serde::{Deserialize, Serialize};

/// Protocol revision sent during the session handshake.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Request id, used to correlate the response.
    pub id: u64,
    /// Method name, e.g. `tools/call`.
    pub method: String,
    /// Optional method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Builds a request with the given id, method, and parameters.
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// Builds a JSON-RPC notification payload (no id, no response expected).
pub fn notification(method: &str, params: Option<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params.unwrap_or_else(|| serde_json::json!({})),
    })
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol marker, unchecked.
    #[serde(default)]
    pub jsonrpc: String,
    /// Correlation id; absent for server notifications.
    pub id: Option<u64>,
    /// Success payload.
    pub result: Option<serde_json::Value>,
    /// Failure payload.
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Unwraps the success payload, converting a provider-side error object
    /// into a [`HivekitError::Provider`]. A missing `result` yields `null`.
    pub fn into_result(self) -> HivekitResult<serde_json::Value> {
        if let Some(err) = self.error {
            return Err(HivekitError::Provider(format!(
                "JSON-RPC error {}: {}",
                err.code, err.message
            )));
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    pub data: Option<serde_json::Value>,
}

/// One capability advertised by a provider (`tools/list` entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDef {
    /// Provider-local capability name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// JSON schema for the capability's arguments.
    #[serde(default = "default_input_schema", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn default_input_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// One content block of a capability call result.
#[derive(Debug, Clone, Deserialize)]
pub struct CallContent {
    /// Block type, e.g. `text` or `image`.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text payload for `text` blocks.
    #[serde(default)]
    pub text: String,
    /// Encoded payload for non-text blocks.
    #[serde(default)]
    pub data: Option<String>,
}

/// Structured result of a capability call (`tools/call` response).
#[derive(Debug, Clone, Deserialize)]
pub struct CallResult {
    /// Ordered content blocks.
    #[serde(default)]
    pub content: Vec<CallContent>,
    /// True if the provider flagged this result as an error.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl CallResult {
    /// Normalizes the result into plain text: textual blocks are joined with
    /// newlines, non-textual blocks become a byte-count placeholder.
    pub fn render_text(&self) -> String {
        self.content
            .iter()
            .map(|block| {
                if block.content_type == "text" {
                    block.text.clone()
                } else {
                    let bytes = block.data.as_deref().map_or(0, str::len);
                    format!("[{} content: {} bytes]", block.content_type, bytes)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Handshake response from the provider's `initialize` method.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    /// Protocol revision the provider speaks.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Provider self-identification, if given.
    #[serde(default, rename = "serverInfo")]
    pub server_info: Option<ServerInfo>,
}

/// Provider self-identification from the handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    /// Provider-reported name.
    pub name: String,
    /// Provider-reported version.
    #[serde(default)]
    pub version: String,
}

/// Parameters for the `initialize` handshake request.
pub fn initialize_params() -> serde_json::Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "hivekit",
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}
