//! Append-only log of inter-agent messages.

use crate::message::{Message, MessageKind};
use parking_lot::Mutex;

struct LogInner {
    next_seq: u64,
    entries: Vec<Message>,
}

/// Ordered, append-only store of inter-agent messages.
///
/// Appends are serialized behind a mutex so sequence numbers stay strictly
/// increasing even with concurrent callers. Entries are immutable once
/// appended and live until [`MessageLog::reset`] or process exit.
pub struct MessageLog {
    inner: Mutex<LogInner>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LogInner {
                next_seq: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Appends a message and returns a copy of the stored entry.
    ///
    /// Always succeeds; the assigned sequence number is strictly greater than
    /// that of every previously appended message.
    pub fn append(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
    ) -> Message {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let msg = Message::new(from, to, kind, content, seq);
        inner.entries.push(msg.clone());
        msg
    }

    /// Returns all messages sent by or addressed to `identity`, in append order.
    pub fn query(&self, identity: &str) -> Vec<Message> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter(|m| m.involves(identity))
            .cloned()
            .collect()
    }

    /// Returns the full ordered sequence of messages.
    pub fn all(&self) -> Vec<Message> {
        self.inner.lock().entries.clone()
    }

    /// Clears all entries and resets sequence numbering.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.next_seq = 0;
    }

    /// Number of messages currently in the log.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if the log holds no messages.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_seq() {
        let log = MessageLog::new();
        let a = log.append("router", "coder", MessageKind::Task, "one");
        let b = log.append("coder", "router", MessageKind::Result, "two");
        assert!(b.seq > a.seq);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_query_matches_from_or_to() {
        let log = MessageLog::new();
        log.append("router", "coder", MessageKind::Task, "t1");
        log.append("router", "reviewer", MessageKind::Task, "t2");
        log.append("coder", "router", MessageKind::Result, "r1");

        let coder = log.query("coder");
        assert_eq!(coder.len(), 2);
        assert_eq!(coder[0].content, "t1");
        assert_eq!(coder[1].content, "r1");

        let reviewer = log.query("reviewer");
        assert_eq!(reviewer.len(), 1);
        assert!(log.query("unknown").is_empty());
    }

    #[test]
    fn test_query_preserves_append_order() {
        let log = MessageLog::new();
        for i in 0..10 {
            log.append("router", "coder", MessageKind::Task, format!("t{i}"));
        }
        let msgs = log.query("coder");
        let seqs: Vec<u64> = msgs.iter().map(|m| m.seq).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
    }

    #[test]
    fn test_reset_clears_and_restarts_numbering() {
        let log = MessageLog::new();
        log.append("router", "coder", MessageKind::Task, "t");
        log.reset();
        assert!(log.is_empty());
        let msg = log.append("router", "coder", MessageKind::Task, "t2");
        assert_eq!(msg.seq, 0);
    }

    #[test]
    fn test_concurrent_appends_keep_seq_unique() {
        use std::sync::Arc;

        let log = Arc::new(MessageLog::new());
        let mut handles = Vec::new();
        for t in 0..8 {
            let log = log.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    log.append("router", "coder", MessageKind::Task, format!("{t}-{i}"));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let all = log.all();
        assert_eq!(all.len(), 400);
        let mut seqs: Vec<u64> = all.iter().map(|m| m.seq).collect();
        seqs.sort_unstable();
        seqs.dedup();
        assert_eq!(seqs.len(), 400);
    }
}
