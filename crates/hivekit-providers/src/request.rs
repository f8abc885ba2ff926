//! Parsing of capability invocation requests emitted by the model.

use serde::Serialize;

/// A model's request to invoke one registered capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityRequest {
    /// Registry local name of the capability.
    pub name: String,
    /// Arguments to pass; `{}` when the request form carries none.
    pub args: serde_json::Value,
}

/// Recognizes a capability request in model output.
///
/// Two forms are accepted: a literal JSON object with an `"action"` or
/// `"tool"` key (arguments under `"args"` or `"input"`), or a line beginning
/// with `Action: <name>` (no arguments). Anything else returns `None` and the
/// raw text is the final answer.
pub fn parse_capability_request(text: &str) -> Option<CapabilityRequest> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            let name = value
                .get("action")
                .or_else(|| value.get("tool"))
                .and_then(|v| v.as_str());
            if let Some(name) = name {
                let args = value
                    .get("args")
                    .or_else(|| value.get("input"))
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({}));
                return Some(CapabilityRequest {
                    name: name.to_string(),
                    args,
                });
            }
        }
    }

    for line in trimmed.lines() {
        if let Some(rest) = line.trim().strip_prefix("Action:") {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(CapabilityRequest {
                    name: name.to_string(),
                    args: serde_json::json!({}),
                });
            }
        }
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_action_form() {
        let req = parse_capability_request(r#"{"action": "mcp_files_read", "args": {"path": "x"}}"#)
            .unwrap();
        assert_eq!(req.name, "mcp_files_read");
        assert_eq!(req.args["path"], "x");
    }

    #[test]
    fn test_json_tool_input_form() {
        let req = parse_capability_request(r#"{"tool": "mcp_web_fetch", "input": {"url": "u"}}"#)
            .unwrap();
        assert_eq!(req.name, "mcp_web_fetch");
        assert_eq!(req.args["url"], "u");
    }

    #[test]
    fn test_json_without_args_defaults_empty() {
        let req = parse_capability_request(r#"{"action": "mcp_sys_ping"}"#).unwrap();
        assert_eq!(req.args, serde_json::json!({}));
    }

    #[test]
    fn test_action_line_form() {
        let text = "I will check the files.\nAction: mcp_files_list\n";
        let req = parse_capability_request(text).unwrap();
        assert_eq!(req.name, "mcp_files_list");
        assert_eq!(req.args, serde_json::json!({}));
    }

    #[test]
    fn test_plain_text_is_not_a_request() {
        assert!(parse_capability_request("The answer is 42.").is_none());
    }

    #[test]
    fn test_json_without_action_key_is_not_a_request() {
        assert!(parse_capability_request(r#"{"result": "done"}"#).is_none());
    }

    #[test]
    fn test_empty_action_line_is_not_a_request() {
        assert!(parse_capability_request("Action:").is_none());
    }
}
