//! Specialist workers and the fixed worker registry.

use async_trait::async_trait;
use hivekit_core::{HivekitResult, Message, ModelClient};
use hivekit_providers::{parse_capability_request, ToolProviderManager};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Identity of the coding specialist.
pub const CODER_ID: &str = "coder";
/// Identity of the review specialist.
pub const REVIEWER_ID: &str = "reviewer";
/// Identity of the research specialist.
pub const RESEARCHER_ID: &str = "researcher";

const CODER_INSTRUCTION: &str = "You are a coding specialist. Produce clean, working code that \
solves the task, with brief notes only where the code is not self-evident.";
const REVIEWER_INSTRUCTION: &str = "You are a code review specialist. Analyze the given work for \
correctness, security, and maintainability, and report concrete findings.";
const RESEARCHER_INSTRUCTION: &str = "You are a research specialist. Gather and condense the \
information the task needs, citing sources where available.";

/// A stateless-per-call specialist that executes one delegated sub-task.
#[async_trait]
pub trait Worker: Send + Sync {
    /// The worker's fixed role identity.
    fn id(&self) -> &str;

    /// Executes one sub-task given the prior messages involving this worker.
    async fn execute(&self, task: &str, context: &[Message]) -> HivekitResult<String>;
}

/// A worker defined entirely by a role identity and a fixed instruction.
///
/// Every call builds one prompt (instruction, task, rendered context, and the
/// capability listing when tools are attached) and issues exactly one model
/// call. A worker with no context behaves identically to one with empty
/// context.
pub struct RoleWorker {
    id: String,
    instruction: String,
    client: Arc<dyn ModelClient>,
    tools: Option<Arc<ToolProviderManager>>,
}

impl RoleWorker {
    /// Creates a worker with an arbitrary identity and instruction.
    pub fn new(
        id: impl Into<String>,
        instruction: impl Into<String>,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            id: id.into(),
            instruction: instruction.into(),
            client,
            tools: None,
        }
    }

    /// The coding specialist.
    pub fn coder(client: Arc<dyn ModelClient>) -> Self {
        Self::new(CODER_ID, CODER_INSTRUCTION, client)
    }

    /// The review specialist.
    pub fn reviewer(client: Arc<dyn ModelClient>) -> Self {
        Self::new(REVIEWER_ID, REVIEWER_INSTRUCTION, client)
    }

    /// The research specialist.
    pub fn researcher(client: Arc<dyn ModelClient>) -> Self {
        Self::new(RESEARCHER_ID, RESEARCHER_INSTRUCTION, client)
    }

    /// Grants this worker access to the registered capabilities.
    pub fn with_tools(mut self, tools: Arc<ToolProviderManager>) -> Self {
        self.tools = Some(tools);
        self
    }

    fn build_prompt(&self, task: &str, context: &[Message]) -> String {
        let mut prompt = format!("{}\n\nTask: {task}", self.instruction);

        if let Some(tools) = &self.tools {
            let capabilities = tools.capabilities();
            if !capabilities.is_empty() {
                prompt.push_str("\n\nAvailable tools:");
                for cap in capabilities {
                    prompt.push_str(&format!("\n- {}: {}", cap.local_name, cap.description));
                }
                prompt.push_str(
                    "\nTo use a tool, respond with {\"action\": \"<tool name>\", \"args\": {...}}.",
                );
            }
        }

        if !context.is_empty() {
            prompt.push_str("\n\nPrevious messages:");
            for msg in context {
                prompt.push_str(&format!("\n[{}]: {}", msg.from, msg.content));
            }
        }

        prompt
    }
}

#[async_trait]
impl Worker for RoleWorker {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, task: &str, context: &[Message]) -> HivekitResult<String> {
        let prompt = self.build_prompt(task, context);
        let response = self.client.call(&prompt).await?;

        if let Some(tools) = &self.tools {
            if let Some(request) = parse_capability_request(&response) {
                info!(
                    worker = %self.id,
                    capability = %request.name,
                    "worker requested a capability"
                );
                return Ok(tools.invoke(&request.name, request.args).await);
            }
        }

        Ok(response)
    }
}

/// Fixed mapping from role identity to worker, built once at composition
/// time and read-only afterwards.
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
        }
    }

    /// Registers a worker under its own identity.
    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        self.workers.insert(worker.id().to_string(), worker);
    }

    /// Resolves a worker by identity.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(id).cloned()
    }

    /// Registered identities, unordered.
    pub fn ids(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// True if no workers are registered.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the standard three-role registry sharing one model client.
pub fn default_workers(client: Arc<dyn ModelClient>) -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    registry.register(Arc::new(RoleWorker::coder(client.clone())));
    registry.register(Arc::new(RoleWorker::reviewer(client.clone())));
    registry.register(Arc::new(RoleWorker::researcher(client)));
    registry
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hivekit_core::{CannedClient, MessageKind};

    #[tokio::test]
    async fn test_worker_single_call_returns_text() {
        let client = Arc::new(CannedClient::always("done"));
        let worker = RoleWorker::coder(client.clone());
        let result = worker.execute("write a parser", &[]).await.unwrap();
        assert_eq!(result, "done");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_prompt_includes_instruction_and_task() {
        let client = Arc::new(CannedClient::always("ok"));
        let worker = RoleWorker::reviewer(client.clone());
        worker.execute("check the parser", &[]).await.unwrap();
        let prompt = &client.prompts()[0];
        assert!(prompt.contains("code review specialist"));
        assert!(prompt.contains("Task: check the parser"));
        assert!(!prompt.contains("Previous messages"));
    }

    #[tokio::test]
    async fn test_prompt_renders_context_block() {
        let client = Arc::new(CannedClient::always("ok"));
        let worker = RoleWorker::coder(client.clone());
        let context = vec![Message::new(
            "router",
            "coder",
            MessageKind::Task,
            "earlier subtask",
            0,
        )];
        worker.execute("next step", &context).await.unwrap();
        let prompt = &client.prompts()[0];
        assert!(prompt.contains("Previous messages:"));
        assert!(prompt.contains("[router]: earlier subtask"));
    }

    #[tokio::test]
    async fn test_tool_request_without_tools_is_plain_text() {
        let client = Arc::new(CannedClient::always(r#"{"action": "mcp_x_y"}"#));
        let worker = RoleWorker::coder(client);
        let result = worker.execute("task", &[]).await.unwrap();
        assert_eq!(result, r#"{"action": "mcp_x_y"}"#);
    }

    #[test]
    fn test_registry_resolution() {
        let client: Arc<dyn ModelClient> = Arc::new(CannedClient::always("ok"));
        let registry = default_workers(client);
        assert_eq!(registry.len(), 3);
        assert!(registry.get(CODER_ID).is_some());
        assert!(registry.get(REVIEWER_ID).is_some());
        assert!(registry.get(RESEARCHER_ID).is_some());
        assert!(registry.get("x").is_none());
    }
}
