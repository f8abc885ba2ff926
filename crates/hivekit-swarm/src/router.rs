//! Delegation planning, plan parsing, and result synthesis.

use crate::worker::{CODER_ID, RESEARCHER_ID, REVIEWER_ID};
use hivekit_core::{HivekitResult, ModelClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Identity the router uses in the message log.
pub const ROUTER_ID: &str = "router";

const PLAN_INSTRUCTION: &str = "You are the router of a specialist swarm. Decompose the task \
into sub-tasks and assign each to one of the available agents: coder, reviewer, researcher. \
Respond with one block per assignment, in execution order, using exactly this format:\n\
DELEGATION:\n- agent: <agent id>\n- task: <sub-task>";

const SYNTHESIS_INSTRUCTION: &str = "You are the router of a specialist swarm. Combine the \
numbered delegation results below into one coherent final report. Resolve overlaps, keep \
concrete findings, and do not invent results that are not listed.";

// Keyword sets for the deterministic fallback, scanned in this fixed order.
const CODE_KEYWORDS: &[&str] = &["code", "implement", "build", "write", "fix", "refactor", "debug"];
const REVIEW_KEYWORDS: &[&str] = &["review", "audit", "security", "critique", "quality"];
const RESEARCH_KEYWORDS: &[&str] = &["research", "investigate", "search", "compare", "summarize", "learn"];

/// One (worker, sub-task) assignment produced by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Identity of the worker this sub-task is addressed to.
    pub worker_id: String,
    /// The sub-task text.
    pub subtask: String,
}

/// Plans delegations from a task and synthesizes the final report.
pub struct Router {
    client: Arc<dyn ModelClient>,
}

impl Router {
    /// Creates a router backed by the given model client.
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Produces the ordered delegation plan for a task.
    ///
    /// Issues one planning call and parses its line-oriented plan. If the
    /// call fails or nothing parses, the deterministic keyword fallback
    /// applies, so the returned plan is never empty.
    pub async fn plan_delegations(&self, task: &str) -> Vec<Delegation> {
        let prompt = format!("{PLAN_INSTRUCTION}\n\nTask: {task}");
        let parsed = match self.client.call(&prompt).await {
            Ok(response) => parse_plan(&response),
            Err(e) => {
                warn!(error = %e, "planning call failed, falling back to keyword matching");
                Vec::new()
            }
        };

        if parsed.is_empty() {
            let plan = fallback_delegations(task);
            info!(
                delegations = plan.len(),
                "no delegations parsed, keyword fallback applied"
            );
            return plan;
        }
        parsed
    }

    /// Merges the per-delegation results into one final report.
    ///
    /// Builds one prompt enumerating each (delegation, result) pair by
    /// 1-based index, with a literal `No result` placeholder for missing
    /// entries, and returns the model's output verbatim.
    pub async fn synthesize(
        &self,
        delegations: &[Delegation],
        results: &[String],
    ) -> HivekitResult<String> {
        let mut prompt = String::from(SYNTHESIS_INSTRUCTION);
        for (i, delegation) in delegations.iter().enumerate() {
            let result = results.get(i).map_or("No result", String::as_str);
            prompt.push_str(&format!(
                "\n\n{}. [{}] {}\nResult: {}",
                i + 1,
                delegation.worker_id,
                delegation.subtask,
                result
            ));
        }
        self.client.call(&prompt).await
    }
}

/// Parses the line-oriented delegation plan format.
///
/// A `- agent:` line opens a pending delegation, discarding any prior one
/// that never received its task; a `- task:` line completes and commits the
/// pending delegation. Lines are trimmed and anything outside the two forms
/// is ignored.
pub fn parse_plan(text: &str) -> Vec<Delegation> {
    let mut delegations = Vec::new();
    let mut pending: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(agent) = line.strip_prefix("- agent:") {
            pending = Some(agent.trim().to_string());
        } else if let Some(task) = line.strip_prefix("- task:") {
            if let Some(worker_id) = pending.take() {
                delegations.push(Delegation {
                    worker_id,
                    subtask: task.trim().to_string(),
                });
            }
        }
    }

    delegations
}

/// Derives delegations from keyword matching when no plan parsed.
///
/// Pure and deterministic: the same task text always yields the same list,
/// scanned in the fixed order code, review, research. Each matching set
/// contributes one delegation carrying the original task text; with no match
/// at all the task goes to the coder.
pub fn fallback_delegations(task: &str) -> Vec<Delegation> {
    let lowered = task.to_lowercase();
    let mut delegations = Vec::new();

    let sets: [(&str, &[&str]); 3] = [
        (CODER_ID, CODE_KEYWORDS),
        (REVIEWER_ID, REVIEW_KEYWORDS),
        (RESEARCHER_ID, RESEARCH_KEYWORDS),
    ];
    for (worker_id, keywords) in sets {
        if keywords.iter().any(|k| lowered.contains(k)) {
            delegations.push(Delegation {
                worker_id: worker_id.to_string(),
                subtask: task.to_string(),
            });
        }
    }

    if delegations.is_empty() {
        delegations.push(Delegation {
            worker_id: CODER_ID.to_string(),
            subtask: task.to_string(),
        });
    }

    delegations
}
