//! The shared session-capability contract all transports implement.

use crate::protocol::{CallResult, CapabilityDef};
use async_trait::async_trait;
use hivekit_core::HivekitResult;
use std::time::Duration;

/// Bound applied to every outbound request so a stalled provider surfaces
/// as an error instead of hanging the caller.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An established session with one tool provider.
///
/// Transports differ only in how the session is established; discovery and
/// invocation go through this trait, so the manager never needs to know
/// which transport is behind a connection.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Lists the capabilities this provider exposes.
    async fn list_capabilities(&self) -> HivekitResult<Vec<CapabilityDef>>;

    /// Invokes one capability by its provider-local name.
    async fn call_capability(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> HivekitResult<CallResult>;

    /// Tears the session down. Best-effort; errors are reported, not fatal.
    async fn close(&mut self) -> HivekitResult<()>;
}

/// Extracts the capability list from a `tools/list` result payload.
pub(crate) fn parse_capability_list(result: serde_json::Value) -> HivekitResult<Vec<CapabilityDef>> {
    let tools = result
        .get("tools")
        .cloned()
        .unwrap_or_else(|| serde_json::json!([]));
    Ok(serde_json::from_value(tools)?)
}

/// Extracts the structured call result from a `tools/call` result payload.
pub(crate) fn parse_call_result(result: serde_json::Value) -> HivekitResult<CallResult> {
    Ok(serde_json::from_value(result)?)
}
