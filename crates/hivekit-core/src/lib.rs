//! Core types and error definitions for the Hivekit swarm framework.
//!
//! This crate provides the foundational pieces shared across all Hivekit
//! crates: the unified error type, inter-agent message representations,
//! the append-only message log, and the model client abstraction.
//!
//! # Main types
//!
//! - [`HivekitError`] — Unified error enum for all Hivekit subsystems.
//! - [`HivekitResult`] — Convenience alias for `Result<T, HivekitError>`.
//! - [`Message`] / [`MessageKind`] — One inter-agent message.
//! - [`MessageLog`] — Ordered, append-only store of inter-agent messages.
//! - [`ModelClient`] — The language-model collaborator behind a narrow trait.

pub mod error;
pub mod llm;
pub mod log;
pub mod message;

pub use error::{HivekitError, HivekitResult};
pub use llm::{CannedClient, ModelClient};
pub use log::MessageLog;
pub use message::{Message, MessageKind};
