//! Connection lifecycle management and the unified capability registry.

use crate::config::{ProviderConfig, TransportKind};
use crate::http::HttpSession;
use crate::session::ProviderSession;
use crate::sse::SseSession;
use crate::stdio::StdioSession;
use chrono::{DateTime, Utc};
use hivekit_core::HivekitResult;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// Lifecycle state of one provider connection.
///
/// `Failed` is terminal for the session; there is no automatic retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No session established (initial and post-shutdown state).
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Session established and capabilities discovered.
    Connected,
    /// The connection attempt or discovery failed.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// One discovered capability, registered under a globally unique local name.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityDescriptor {
    /// Registry-wide unique name (`<prefix><provider>_<original>`, sanitized).
    pub local_name: String,
    /// Description shown to the model, tagged with the owning provider.
    pub description: String,
    /// Name of the provider that exposes this capability.
    pub provider: String,
    /// The capability's name on its own provider.
    pub original_name: String,
    /// JSON schema for the capability's arguments.
    pub input_schema: serde_json::Value,
}

/// Connection bookkeeping for one configured provider.
pub struct ProviderConnection {
    /// The configuration this connection was created from.
    pub config: ProviderConfig,
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Why the last connection attempt failed, if it did.
    pub last_error: Option<String>,
    /// When the session was established.
    pub connected_at: Option<DateTime<Utc>>,
    /// Capabilities discovered from this provider, in discovery order.
    pub capabilities: Vec<CapabilityDescriptor>,
    session: Option<Box<dyn ProviderSession>>,
}

impl ProviderConnection {
    fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            last_error: None,
            connected_at: None,
            capabilities: Vec::new(),
            session: None,
        }
    }
}

struct RegistryEntry {
    connection: usize,
    original_name: String,
}

/// Owns every provider connection and the unified capability registry.
///
/// `initialize` and `shutdown` take `&mut self` while `invoke` takes `&self`,
/// so the borrow checker enforces that registration fully precedes any shared
/// invocation.
pub struct ToolProviderManager {
    prefix: String,
    connections: Vec<ProviderConnection>,
    registry: HashMap<String, RegistryEntry>,
}

impl ToolProviderManager {
    /// Creates an empty manager; `prefix` is prepended to every local name.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            connections: Vec::new(),
            registry: HashMap::new(),
        }
    }

    /// Connects to every enabled provider and populates the registry.
    ///
    /// Disabled entries are filtered out before any connection attempt.
    /// A failure is isolated to its own provider: the connection is recorded
    /// as `Failed` with its error and the remaining providers still connect.
    /// When this returns, discovery is complete for every connected provider.
    pub async fn initialize(&mut self, configs: &[ProviderConfig]) {
        for config in configs {
            if !config.enabled {
                info!(provider = %config.name, "provider disabled, skipping");
                continue;
            }

            let mut conn = ProviderConnection::new(config.clone());
            conn.state = ConnectionState::Connecting;

            match establish(config).await {
                Ok(session) => match session.list_capabilities().await {
                    Ok(defs) => {
                        let index = self.connections.len();
                        for def in defs {
                            self.register(&mut conn, index, def);
                        }
                        conn.session = Some(session);
                        conn.state = ConnectionState::Connected;
                        conn.connected_at = Some(Utc::now());
                        info!(
                            provider = %config.name,
                            transport = %config.transport,
                            capabilities = conn.capabilities.len(),
                            "provider connected"
                        );
                    }
                    Err(e) => {
                        warn!(provider = %config.name, error = %e, "capability discovery failed");
                        conn.state = ConnectionState::Failed;
                        conn.last_error = Some(e.to_string());
                        let mut session = session;
                        let _ = session.close().await;
                    }
                },
                Err(e) => {
                    warn!(provider = %config.name, error = %e, "provider connection failed");
                    conn.state = ConnectionState::Failed;
                    conn.last_error = Some(e.to_string());
                }
            }

            self.connections.push(conn);
        }
    }

    fn register(&mut self, conn: &mut ProviderConnection, index: usize, def: crate::protocol::CapabilityDef) {
        let local_name = derive_local_name(&self.prefix, &conn.config.name, &def.name);
        if self.registry.contains_key(&local_name) {
            warn!(
                provider = %conn.config.name,
                capability = %def.name,
                local_name = %local_name,
                "capability name collision, keeping first registration"
            );
            return;
        }
        self.registry.insert(
            local_name.clone(),
            RegistryEntry {
                connection: index,
                original_name: def.name.clone(),
            },
        );
        conn.capabilities.push(CapabilityDescriptor {
            local_name,
            description: format!("[{}] {}", conn.config.name, def.description),
            provider: conn.config.name.clone(),
            original_name: def.name,
            input_schema: def.input_schema,
        });
    }

    /// Invokes a registered capability and returns its result as plain text.
    ///
    /// Every failure mode degrades to a descriptive text result: an
    /// unregistered name, a provider that is not connected, and any
    /// transport-level error all come back as text, never as an `Err`.
    pub async fn invoke(&self, local_name: &str, args: serde_json::Value) -> String {
        let Some(entry) = self.registry.get(local_name) else {
            return format!("Tool '{local_name}' is not registered");
        };
        let conn = &self.connections[entry.connection];
        if conn.state != ConnectionState::Connected {
            return format!("Provider '{}' is not connected", conn.config.name);
        }
        let Some(session) = conn.session.as_deref() else {
            return format!("Provider '{}' is not connected", conn.config.name);
        };

        match session.call_capability(&entry.original_name, args).await {
            Ok(result) if result.is_error => format!("Tool error: {}", result.render_text()),
            Ok(result) => result.render_text(),
            Err(e) => {
                warn!(capability = %local_name, error = %e, "capability invocation failed");
                format!("Tool call '{local_name}' failed: {e}")
            }
        }
    }

    /// Closes every session best-effort and returns to the uninitialized
    /// state. Per-connection close errors are logged and isolated.
    pub async fn shutdown(&mut self) {
        for conn in &mut self.connections {
            if let Some(mut session) = conn.session.take() {
                if let Err(e) = session.close().await {
                    warn!(provider = %conn.config.name, error = %e, "error closing provider session");
                }
            }
            conn.state = ConnectionState::Disconnected;
            conn.capabilities.clear();
        }
        self.connections.clear();
        self.registry.clear();
        info!("tool provider manager shut down");
    }

    /// All registered capabilities, across all connected providers.
    pub fn capabilities(&self) -> Vec<&CapabilityDescriptor> {
        self.connections
            .iter()
            .flat_map(|c| c.capabilities.iter())
            .collect()
    }

    /// Number of registered capabilities.
    pub fn capability_count(&self) -> usize {
        self.registry.len()
    }

    /// True if `local_name` is registered.
    pub fn has_capability(&self, local_name: &str) -> bool {
        self.registry.contains_key(local_name)
    }

    /// The tracked provider connections, in configuration order.
    pub fn connections(&self) -> &[ProviderConnection] {
        &self.connections
    }
}

async fn establish(config: &ProviderConfig) -> HivekitResult<Box<dyn ProviderSession>> {
    match config.transport {
        TransportKind::Stdio => Ok(Box::new(StdioSession::connect(config).await?)),
        TransportKind::Http => Ok(Box::new(HttpSession::connect(config).await?)),
        TransportKind::Sse => Ok(Box::new(SseSession::connect(config).await?)),
    }
}

/// Derives the globally unique local name for a capability. Characters
/// outside `[A-Za-z0-9_]` are mapped to `_` so the name stays callable.
fn derive_local_name(prefix: &str, provider: &str, original: &str) -> String {
    format!("{prefix}{provider}_{original}")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
