//! Swarm orchestration for Hivekit.
//!
//! The [`Router`] decomposes a task into an ordered delegation plan, the
//! [`Orchestrator`] executes it against a fixed [`WorkerRegistry`] while
//! recording every exchange in the append-only message log, and the router
//! finally synthesizes the individual results into one report.

pub mod orchestrator;
pub mod router;
pub mod worker;

pub use orchestrator::Orchestrator;
pub use router::{Delegation, Router, ROUTER_ID};
pub use worker::{
    default_workers, RoleWorker, Worker, WorkerRegistry, CODER_ID, RESEARCHER_ID, REVIEWER_ID,
};
