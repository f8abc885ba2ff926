//! Streamable HTTP transport: JSON-RPC POSTed to a single URL.
//!
//! Each request is one POST. The provider may answer with a plain JSON body
//! or with an SSE body whose events carry the JSON-RPC response; both are
//! handled transparently. A provider-assigned session id, when present, is
//! echoed on every subsequent request.

use crate::config::ProviderConfig;
use crate::protocol::{
    initialize_params, notification, CallResult, CapabilityDef, InitializeResult, JsonRpcRequest,
    JsonRpcResponse,
};
use crate::session::{parse_call_result, parse_capability_list, ProviderSession, REQUEST_TIMEOUT};
use crate::sse::SseParser;
use async_trait::async_trait;
use futures_util::StreamExt;
use hivekit_core::{HivekitError, HivekitResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// A session with a provider reached over streamable HTTP.
pub struct HttpSession {
    http: reqwest::Client,
    url: String,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
    provider: String,
}

impl HttpSession {
    /// Performs the initialization handshake against the configured URL.
    pub async fn connect(config: &ProviderConfig) -> HivekitResult<Self> {
        config.validate()?;
        let url = config
            .url
            .clone()
            .ok_or_else(|| HivekitError::Config(format!("provider '{}' has no url", config.name)))?;

        let session = Self {
            http: reqwest::Client::new(),
            url,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
            provider: config.name.clone(),
        };

        let resp = session
            .request("initialize", Some(initialize_params()))
            .await?;
        let init: InitializeResult = serde_json::from_value(resp.into_result()?)?;
        info!(
            provider = %session.provider,
            protocol = %init.protocol_version,
            "HTTP provider initialized"
        );
        session.notify("notifications/initialized", None).await?;

        Ok(session)
    }

    /// Sends one request and returns the correlated response, whether it
    /// arrives as a JSON body or over an SSE body.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> HivekitResult<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        tokio::time::timeout(REQUEST_TIMEOUT, self.post_rpc(&req))
            .await
            .map_err(|_| {
                HivekitError::Provider(format!(
                    "request '{method}' to provider '{}' timed out",
                    self.provider
                ))
            })?
    }

    async fn post_rpc(&self, req: &JsonRpcRequest) -> HivekitResult<JsonRpcResponse> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(req);
        if let Some(sid) = self.session_id.lock().await.clone() {
            builder = builder.header(SESSION_HEADER, sid);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| HivekitError::Http(format!("POST to {} failed: {e}", self.url)))?;
        if !resp.status().is_success() {
            return Err(HivekitError::Http(format!(
                "provider '{}' answered '{}' with status {}",
                self.provider,
                req.method,
                resp.status()
            )));
        }

        if let Some(sid) = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().await = Some(sid.to_string());
        }

        let is_event_stream = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if is_event_stream {
            read_streamed_response(resp, req.id, &self.provider).await
        } else {
            resp.json::<JsonRpcResponse>().await.map_err(|e| {
                HivekitError::Http(format!(
                    "invalid JSON-RPC body from provider '{}': {e}",
                    self.provider
                ))
            })
        }
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> HivekitResult<()> {
        let mut builder = self.http.post(&self.url).json(&notification(method, params));
        if let Some(sid) = self.session_id.lock().await.clone() {
            builder = builder.header(SESSION_HEADER, sid);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| HivekitError::Http(format!("POST to {} failed: {e}", self.url)))?;
        if !resp.status().is_success() {
            return Err(HivekitError::Http(format!(
                "provider '{}' rejected notification with status {}",
                self.provider,
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Scans an SSE response body for the JSON-RPC response with the wanted id.
async fn read_streamed_response(
    resp: reqwest::Response,
    want_id: u64,
    provider: &str,
) -> HivekitResult<JsonRpcResponse> {
    let mut stream = resp.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| HivekitError::Http(format!("error reading response body: {e}")))?;
        for event in parser.feed(&String::from_utf8_lossy(&chunk)) {
            match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                Ok(rpc) if rpc.id == Some(want_id) => return Ok(rpc),
                Ok(_) => {}
                Err(e) => {
                    debug!(provider = %provider, error = %e, "ignoring non-JSON-RPC event");
                }
            }
        }
    }

    Err(HivekitError::Provider(format!(
        "provider '{provider}' closed the response stream without answering"
    )))
}

#[async_trait]
impl ProviderSession for HttpSession {
    async fn list_capabilities(&self) -> HivekitResult<Vec<CapabilityDef>> {
        let resp = self.request("tools/list", None).await?;
        parse_capability_list(resp.into_result()?)
    }

    async fn call_capability(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> HivekitResult<CallResult> {
        let params = serde_json::json!({ "name": name, "arguments": args });
        let resp = self.request("tools/call", Some(params)).await?;
        parse_call_result(resp.into_result()?)
    }

    async fn close(&mut self) -> HivekitResult<()> {
        // Session teardown is advisory; the provider may not support DELETE.
        let sid = self.session_id.lock().await.take();
        if let Some(sid) = sid {
            let result = self
                .http
                .delete(&self.url)
                .header(SESSION_HEADER, sid)
                .send()
                .await;
            if let Err(e) = result {
                debug!(provider = %self.provider, error = %e, "session DELETE failed");
            }
        }
        Ok(())
    }
}
