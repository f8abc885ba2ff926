//! Server-push transport: a long-lived SSE stream plus a POST endpoint.
//!
//! The provider is reached with a GET that stays open as an event stream.
//! Its first `endpoint` event names the URL requests must be POSTed to;
//! responses come back over the stream and are matched to callers by
//! request id.

use crate::config::ProviderConfig;
use crate::protocol::{
    initialize_params, notification, CallResult, CapabilityDef, InitializeResult, JsonRpcRequest,
    JsonRpcResponse,
};
use crate::session::{parse_call_result, parse_capability_list, ProviderSession, REQUEST_TIMEOUT};
use async_trait::async_trait;
use futures_util::StreamExt;
use hivekit_core::{HivekitError, HivekitResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// How long to wait for the provider to announce its POST endpoint.
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub(crate) event: String,
    pub(crate) data: String,
}

/// Incremental SSE parser fed with raw body chunks.
///
/// Handles `event:`/`data:` fields, multi-line data accumulation, comment
/// lines, and CRLF endings. Unknown fields are ignored.
pub(crate) struct SseParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self {
            buffer: String::new(),
            event: None,
            data: Vec::new(),
        }
    }

    /// Feeds a chunk and returns every event completed by it.
    pub(crate) fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim_end_matches('\r').to_string();
            self.buffer.drain(..=pos);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(SseEvent {
                        event: self.event.take().unwrap_or_else(|| "message".to_string()),
                        data: self.data.join("\n"),
                    });
                    self.data.clear();
                } else {
                    self.event = None;
                }
            } else if line.starts_with(':') {
                // comment / keep-alive
            } else if let Some(value) = line.strip_prefix("event:") {
                self.event = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }

        events
    }
}

/// A session with a provider reached over server-push SSE.
pub struct SseSession {
    http: reqwest::Client,
    endpoint: String,
    pending: PendingMap,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    provider: String,
}

impl SseSession {
    /// Opens the event stream, waits for the endpoint announcement, and
    /// performs the initialization handshake.
    pub async fn connect(config: &ProviderConfig) -> HivekitResult<Self> {
        config.validate()?;
        let url = config
            .url
            .clone()
            .ok_or_else(|| HivekitError::Config(format!("provider '{}' has no url", config.name)))?;

        let http = reqwest::Client::new();
        let resp = http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| HivekitError::Http(format!("SSE connect to {url} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(HivekitError::Http(format!(
                "SSE connect to {url} failed with status {}",
                resp.status()
            )));
        }

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(pump_events(
            resp,
            pending.clone(),
            endpoint_tx,
            config.name.clone(),
        ));

        let announced = tokio::time::timeout(ENDPOINT_TIMEOUT, endpoint_rx)
            .await
            .map_err(|_| {
                reader.abort();
                HivekitError::Provider(format!(
                    "provider '{}' never announced its endpoint",
                    config.name
                ))
            })?
            .map_err(|_| {
                HivekitError::Provider(format!(
                    "event stream from provider '{}' closed during setup",
                    config.name
                ))
            })?;

        let session = Self {
            http,
            endpoint: resolve_endpoint(&url, &announced),
            pending,
            next_id: AtomicU64::new(1),
            reader,
            provider: config.name.clone(),
        };

        let init = session.initialize().await?;
        info!(
            provider = %session.provider,
            protocol = %init.protocol_version,
            endpoint = %session.endpoint,
            "SSE provider initialized"
        );
        session.notify("notifications/initialized", None).await?;

        Ok(session)
    }

    async fn initialize(&self) -> HivekitResult<InitializeResult> {
        let resp = self.request("initialize", Some(initialize_params())).await?;
        Ok(serde_json::from_value(resp.into_result()?)?)
    }

    /// POSTs a request to the announced endpoint and waits (bounded) for the
    /// matching response on the event stream.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> HivekitResult<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let resp = match self.http.post(&self.endpoint).json(&req).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.pending.lock().await.remove(&id);
                return Err(HivekitError::Http(format!(
                    "POST to {} failed: {e}",
                    self.endpoint
                )));
            }
        };
        if !resp.status().is_success() {
            self.pending.lock().await.remove(&id);
            return Err(HivekitError::Http(format!(
                "provider '{}' rejected '{method}' with status {}",
                self.provider,
                resp.status()
            )));
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(HivekitError::Provider(format!(
                "event stream from provider '{}' closed before answering '{method}'",
                self.provider
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(HivekitError::Provider(format!(
                    "request '{method}' to provider '{}' timed out",
                    self.provider
                )))
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> HivekitResult<()> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&notification(method, params))
            .send()
            .await
            .map_err(|e| HivekitError::Http(format!("POST to {} failed: {e}", self.endpoint)))?;
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

/// Reads the event stream, announcing the endpoint once and routing JSON-RPC
/// responses to pending callers.
async fn pump_events(
    resp: reqwest::Response,
    pending: PendingMap,
    endpoint_tx: oneshot::Sender<String>,
    provider: String,
) {
    let mut stream = resp.bytes_stream();
    let mut parser = SseParser::new();
    let mut endpoint_tx = Some(endpoint_tx);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(provider = %provider, error = %e, "error reading event stream");
                break;
            }
        };

        for event in parser.feed(&String::from_utf8_lossy(&chunk)) {
            if event.event == "endpoint" {
                if let Some(tx) = endpoint_tx.take() {
                    let _ = tx.send(event.data);
                }
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(&event.data) {
                Ok(rpc) => {
                    if let Some(id) = rpc.id {
                        if let Some(tx) = pending.lock().await.remove(&id) {
                            let _ = tx.send(rpc);
                        }
                    }
                }
                Err(e) => {
                    debug!(provider = %provider, error = %e, "ignoring non-JSON-RPC event");
                }
            }
        }
    }

    debug!(provider = %provider, "event stream ended");
}

/// Resolves the announced endpoint against the stream URL. Absolute URLs are
/// taken as-is; paths are joined to the stream URL's origin.
fn resolve_endpoint(base: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let origin = match base.find("://") {
        Some(i) => match base[i + 3..].find('/') {
            Some(j) => &base[..i + 3 + j],
            None => base,
        },
        None => base,
    };
    format!("{}/{}", origin.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}

#[async_trait]
impl ProviderSession for SseSession {
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
        self.reader.abort();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_single_event() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: endpoint\ndata: /messages?session=1\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "endpoint");
        assert_eq!(events[0].data, "/messages?session=1");
    }

    #[test]
    fn test_parser_default_event_name() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: {\"id\":1}\n\n");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn test_parser_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed("event: mess").is_empty());
        assert!(parser.feed("age\ndata: hel").is_empty());
        let events = parser.feed("lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_parser_multiline_data_and_comments() {
        let mut parser = SseParser::new();
        let events = parser.feed(": keep-alive\ndata: line 1\ndata: line 2\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line 1\nline 2");
    }

    #[test]
    fn test_parser_crlf_lines() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: ok\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn test_resolve_endpoint_absolute() {
        assert_eq!(
            resolve_endpoint("http://localhost:9000/sse", "https://other/messages"),
            "https://other/messages"
        );
    }

    #[test]
    fn test_resolve_endpoint_path() {
        assert_eq!(
            resolve_endpoint("http://localhost:9000/sse", "/messages?session=7"),
            "http://localhost:9000/messages?session=7"
        );
    }

    #[test]
    fn test_resolve_endpoint_relative() {
        assert_eq!(
            resolve_endpoint("http://localhost:9000/sse", "messages"),
            "http://localhost:9000/messages"
        );
    }
}
