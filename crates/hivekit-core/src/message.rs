//! Inter-agent message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of an inter-agent [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A delegated sub-task, sent from the router to a worker.
    Task,
    /// A worker's result, sent back to the router.
    Result,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Task => write!(f, "task"),
            MessageKind::Result => write!(f, "result"),
        }
    }
}

/// A single message exchanged between agents during an orchestration run.
///
/// Messages are immutable once appended to the [`MessageLog`](crate::MessageLog);
/// `seq` is the log-assigned ordinal and is strictly increasing in append order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: Uuid,
    /// Identity of the sending agent.
    pub from: String,
    /// Identity of the receiving agent.
    pub to: String,
    /// Whether this is a delegated task or a result.
    pub kind: MessageKind,
    /// The textual content of the message.
    pub content: String,
    /// Log-assigned monotone sequence number.
    pub seq: u64,
    /// UTC timestamp of when the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message with the given participants, kind, and sequence number.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
        seq: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            kind,
            content: content.into(),
            seq,
            timestamp: Utc::now(),
        }
    }

    /// True if this message was sent by or addressed to `identity`.
    pub fn involves(&self, identity: &str) -> bool {
        self.from == identity || self.to == identity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new("router", "coder", MessageKind::Task, "write X", 0);
        assert_eq!(msg.from, "router");
        assert_eq!(msg.to, "coder");
        assert_eq!(msg.kind, MessageKind::Task);
        assert_eq!(msg.seq, 0);
    }

    #[test]
    fn test_message_involves() {
        let msg = Message::new("coder", "router", MessageKind::Result, "done", 3);
        assert!(msg.involves("coder"));
        assert!(msg.involves("router"));
        assert!(!msg.involves("reviewer"));
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::new("router", "coder", MessageKind::Task, "write X", 1);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"kind\":\"task\""));
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content, "write X");
        assert_eq!(parsed.kind, MessageKind::Task);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MessageKind::Task.to_string(), "task");
        assert_eq!(MessageKind::Result.to_string(), "result");
    }
}
