//! Subprocess transport: JSON-RPC over a provider's standard streams.

use crate::config::ProviderConfig;
use crate::protocol::{
    initialize_params, notification, CallResult, CapabilityDef, InitializeResult, JsonRpcRequest,
    JsonRpcResponse,
};
use crate::session::{parse_call_result, parse_capability_list, ProviderSession, REQUEST_TIMEOUT};
use async_trait::async_trait;
use hivekit_core::{HivekitError, HivekitResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// A session with a provider spawned as a subprocess.
///
/// Requests are written as newline-delimited JSON to the child's stdin; a
/// background task reads stdout and routes responses to waiting callers by
/// request id.
#[derive(Debug)]
pub struct StdioSession {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    provider: String,
}

impl StdioSession {
    /// Spawns the configured command and performs the initialization handshake.
    pub async fn connect(config: &ProviderConfig) -> HivekitResult<Self> {
        config.validate()?;
        let command = config
            .command
            .as_deref()
            .ok_or_else(|| HivekitError::Config(format!("provider '{}' has no command", config.name)))?;

        let mut cmd = Command::new(command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            HivekitError::Provider(format!("failed to spawn '{command}': {e}"))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HivekitError::Provider("subprocess stdin not available".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HivekitError::Provider("subprocess stdout not available".into()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_responses(stdout, pending.clone(), config.name.clone()));

        let session = Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            reader,
            provider: config.name.clone(),
        };

        let init = session.initialize().await?;
        info!(
            provider = %session.provider,
            protocol = %init.protocol_version,
            "stdio provider initialized"
        );
        session
            .notify("notifications/initialized", None)
            .await?;

        Ok(session)
    }

    async fn initialize(&self) -> HivekitResult<InitializeResult> {
        let resp = self.request("initialize", Some(initialize_params())).await?;
        Ok(serde_json::from_value(resp.into_result()?)?)
    }

    /// Sends a request and waits (bounded) for the matching response.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> HivekitResult<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        let payload = serde_json::to_string(&req)?;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.send_line(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(HivekitError::Provider(format!(
                "provider '{}' closed before answering '{method}'",
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

    /// Sends a notification; no response is expected.
    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> HivekitResult<()> {
        let payload = serde_json::to_string(&notification(method, params))?;
        self.send_line(&payload).await
    }

    async fn send_line(&self, payload: &str) -> HivekitResult<()> {
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| HivekitError::Provider(format!("write to provider stdin failed: {e}")))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| HivekitError::Provider(format!("write to provider stdin failed: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| HivekitError::Provider(format!("flush of provider stdin failed: {e}")))?;
        Ok(())
    }
}

/// Reads stdout lines and routes JSON-RPC responses to pending callers.
async fn read_responses(
    stdout: tokio::process::ChildStdout,
    pending: PendingMap,
    provider: String,
) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!(provider = %provider, "provider stdout closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                    Ok(resp) => {
                        // Server notifications carry no id and are dropped.
                        if let Some(id) = resp.id {
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let _ = tx.send(resp);
                            }
                        }
                    }
                    Err(e) => {
                        debug!(provider = %provider, error = %e, "ignoring non-JSON-RPC output line");
                    }
                }
            }
            Err(e) => {
                error!(provider = %provider, error = %e, "error reading provider stdout");
                break;
            }
        }
    }
}

#[async_trait]
impl ProviderSession for StdioSession {
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
        let mut child = self.child.lock().await;
        child
            .kill()
            .await
            .map_err(|e| HivekitError::Provider(format!("failed to kill provider process: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::TransportKind;

    fn stdio_config(command: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: "files".to_string(),
            transport: TransportKind::Stdio,
            command: command.map(String::from),
            args: vec![],
            url: None,
            env: HashMap::new(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_command() {
        let err = StdioSession::connect(&stdio_config(None)).await.unwrap_err();
        assert!(err.to_string().contains("command"));
    }

    #[tokio::test]
    async fn test_connect_nonexistent_binary_fails() {
        let err = StdioSession::connect(&stdio_config(Some("/nonexistent/provider-bin")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
