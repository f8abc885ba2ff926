//! Tool provider client management for Hivekit.
//!
//! A *provider* is an independent external process or service exposing named
//! capabilities over one of three transports: subprocess standard streams
//! ([`StdioSession`]), streamable HTTP ([`HttpSession`]), or server-push SSE
//! ([`SseSession`]). The [`ToolProviderManager`] owns one connection per
//! configured provider, discovers capabilities into a collision-free
//! registry, and exposes them as uniformly invocable operations.

pub mod config;
pub mod http;
pub mod manager;
pub mod protocol;
pub mod request;
pub mod session;
pub mod sse;
pub mod stdio;

pub use config::{ProviderConfig, ProviderSettings, TransportKind};
pub use http::HttpSession;
pub use manager::{
    CapabilityDescriptor, ConnectionState, ProviderConnection, ToolProviderManager,
};
pub use protocol::{CallContent, CallResult, CapabilityDef};
pub use request::{parse_capability_request, CapabilityRequest};
pub use session::ProviderSession;
pub use sse::SseSession;
pub use stdio::StdioSession;
