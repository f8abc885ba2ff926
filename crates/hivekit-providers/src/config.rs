//! Provider configuration loaded from a JSON document.

use hivekit_core::{HivekitError, HivekitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Transport mechanism used to reach a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Spawn a subprocess and speak JSON-RPC over its standard streams.
    Stdio,
    /// Streamable HTTP: JSON-RPC POSTed to a URL, responses as JSON or SSE.
    #[serde(alias = "streamable-http")]
    Http,
    /// Server-push SSE: a long-lived event stream plus a POST endpoint.
    Sse,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Http => write!(f, "http"),
            TransportKind::Sse => write!(f, "sse"),
        }
    }
}

/// Configuration for a single tool provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name; part of every derived capability name.
    pub name: String,
    /// How to establish a session with this provider.
    pub transport: TransportKind,
    /// Executable to spawn (required for `stdio`).
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to the spawned executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Endpoint URL (required for `http` and `sse`).
    #[serde(default)]
    pub url: Option<String>,
    /// Extra environment variables for spawned subprocesses.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Disabled entries are filtered out before any connection attempt.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    /// Checks that the fields required by the declared transport are present.
    pub fn validate(&self) -> HivekitResult<()> {
        match self.transport {
            TransportKind::Stdio if self.command.is_none() => Err(HivekitError::Config(format!(
                "stdio provider '{}' is missing 'command'",
                self.name
            ))),
            TransportKind::Http | TransportKind::Sse if self.url.is_none() => {
                Err(HivekitError::Config(format!(
                    "{} provider '{}' is missing 'url'",
                    self.transport, self.name
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Top-level provider settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Prefix prepended to every derived capability name. A non-empty
    /// default avoids accidental collisions with local capabilities.
    #[serde(default = "default_prefix")]
    pub tool_prefix: String,
    /// The configured providers.
    #[serde(default)]
    pub servers: Vec<ProviderConfig>,
}

fn default_prefix() -> String {
    "mcp_".to_string()
}

impl ProviderSettings {
    /// Parses a settings document from JSON.
    ///
    /// Malformed input is logged and degrades to the empty default, so a bad
    /// configuration file behaves like "no providers configured".
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<ProviderSettings>(json) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Malformed provider configuration, continuing with no providers");
                ProviderSettings {
                    tool_prefix: default_prefix(),
                    servers: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stdio_config_defaults() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"name":"files","transport":"stdio","command":"mcp-files"}"#)
                .unwrap();
        assert_eq!(config.transport, TransportKind::Stdio);
        assert!(config.enabled);
        assert!(config.args.is_empty());
        assert!(config.env.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_streamable_http_alias() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"name":"web","transport":"streamable-http","url":"http://localhost:9000/mcp"}"#,
        )
        .unwrap();
        assert_eq!(config.transport, TransportKind::Http);
    }

    #[test]
    fn test_validate_missing_command() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"name":"files","transport":"stdio"}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_url() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"name":"events","transport":"sse"}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_parse() {
        let json = r#"{
            "tool_prefix": "ext_",
            "servers": [
                {"name": "files", "transport": "stdio", "command": "mcp-files"},
                {"name": "web", "transport": "http", "url": "http://localhost:9000/mcp", "enabled": false}
            ]
        }"#;
        let settings = ProviderSettings::from_json(json);
        assert_eq!(settings.tool_prefix, "ext_");
        assert_eq!(settings.servers.len(), 2);
        assert!(!settings.servers[1].enabled);
    }

    #[test]
    fn test_settings_default_prefix() {
        let settings = ProviderSettings::from_json(r#"{"servers":[]}"#);
        assert_eq!(settings.tool_prefix, "mcp_");
    }

    #[test]
    fn test_malformed_settings_degrade_to_empty() {
        let settings = ProviderSettings::from_json("{not json");
        assert!(settings.servers.is_empty());
    }
}
