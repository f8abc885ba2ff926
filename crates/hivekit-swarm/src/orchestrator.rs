//! End-to-end execution protocol: plan, delegate, synthesize.

use crate::router::{Router, ROUTER_ID};
use crate::worker::WorkerRegistry;
use hivekit_core::{HivekitResult, MessageKind, MessageLog};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Composes the router, the worker registry, and the message log into the
/// end-to-end execution protocol.
///
/// Delegations run strictly sequentially, one outstanding model call at a
/// time, which keeps the message log a faithful audit trail of the run.
pub struct Orchestrator {
    router: Router,
    workers: WorkerRegistry,
    log: Arc<MessageLog>,
}

impl Orchestrator {
    /// Creates an orchestrator over a fixed worker registry.
    pub fn new(router: Router, workers: WorkerRegistry, log: Arc<MessageLog>) -> Self {
        Self {
            router,
            workers,
            log,
        }
    }

    /// The shared message log for this orchestrator.
    pub fn log(&self) -> &Arc<MessageLog> {
        &self.log
    }

    /// Runs the full protocol for one task and returns the final report.
    ///
    /// Partial failures never abort the run: an unknown worker or a failing
    /// worker call degrades to a descriptive result string and the batch
    /// continues through synthesis.
    pub async fn execute(&self, task: &str) -> HivekitResult<String> {
        info!(task = %task, "swarm run starting");

        let plan = self.router.plan_delegations(task).await;
        let mut results = Vec::with_capacity(plan.len());

        for delegation in &plan {
            self.log.append(
                ROUTER_ID,
                &delegation.worker_id,
                MessageKind::Task,
                &delegation.subtask,
            );

            let result = match self.workers.get(&delegation.worker_id) {
                None => {
                    warn!(worker = %delegation.worker_id, "delegation to unknown worker");
                    format!("Error: Unknown agent '{}'", delegation.worker_id)
                }
                Some(worker) => {
                    let context = self.log.query(&delegation.worker_id);
                    let text = match worker.execute(&delegation.subtask, &context).await {
                        Ok(text) => text,
                        Err(e) => {
                            error!(worker = %delegation.worker_id, error = %e, "worker call failed");
                            format!("Error executing task: {e}")
                        }
                    };
                    self.log
                        .append(&delegation.worker_id, ROUTER_ID, MessageKind::Result, &text);
                    text
                }
            };
            results.push(result);
        }

        let report = self.router.synthesize(&plan, &results).await?;
        info!(delegations = plan.len(), "swarm run complete");
        Ok(report)
    }
}
