//! Per-conversation message buffer.
//!
//! Holds the unread backlog of every conversation until a summarize request
//! drains it. All mutation happens under one store-wide lock; the lock is a
//! synchronous mutex and no guard ever lives across an `.await`.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use super::record::MessageRecord;

/// Result of draining a conversation backlog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    /// Removed records, oldest first
    pub records: Vec<MessageRecord>,
    /// Whether the conversation had a backlog at all
    pub existed: bool,
}

impl Drained {
    fn empty() -> Self {
        Self::default()
    }
}

/// Concurrency-safe map from conversation id to its ordered backlog.
///
/// A key exists only while its backlog is non-empty.
#[derive(Debug, Default)]
pub struct ConversationBuffer {
    backlogs: Mutex<HashMap<String, Vec<MessageRecord>>>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the end of a conversation backlog.
    pub fn append(&self, conversation_id: &str, record: MessageRecord) {
        let mut backlogs = self.backlogs.lock();
        backlogs
            .entry(conversation_id.to_string())
            .or_default()
            .push(record);
    }

    /// Atomically remove and return the whole backlog of a conversation.
    ///
    /// Appends that land after this call belong to the next drain.
    pub fn drain_all(&self, conversation_id: &str) -> Drained {
        let removed = self.backlogs.lock().remove(conversation_id);
        match removed {
            Some(records) => {
                debug!(
                    "Drained {} records from conversation {}",
                    records.len(),
                    conversation_id
                );
                Drained {
                    records,
                    existed: true,
                }
            }
            None => Drained::empty(),
        }
    }

    /// Atomically put `records` back ahead of whatever is buffered now.
    ///
    /// Records appended since the drain stay after the restored ones.
    /// Restoring nothing leaves the store untouched.
    pub fn restore(&self, conversation_id: &str, records: Vec<MessageRecord>) {
        if records.is_empty() {
            return;
        }

        let count = records.len();
        let mut backlogs = self.backlogs.lock();
        let backlog = backlogs.entry(conversation_id.to_string()).or_default();
        let newer = std::mem::replace(backlog, records);
        backlog.extend(newer);
        drop(backlogs);

        debug!(
            "Restored {} records to conversation {}",
            count, conversation_id
        );
    }

    /// Number of records currently buffered for a conversation
    pub fn pending_count(&self, conversation_id: &str) -> usize {
        self.backlogs
            .lock()
            .get(conversation_id)
            .map_or(0, Vec::len)
    }

    /// Number of conversations that currently have a backlog
    pub fn conversation_count(&self) -> usize {
        self.backlogs.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(author: &str, text: &str) -> MessageRecord {
        MessageRecord::new(author, text).unwrap()
    }

    fn rendered(records: &[MessageRecord]) -> Vec<String> {
        records.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_append_then_drain_preserves_order() {
        let buffer = ConversationBuffer::new();
        buffer.append("g", record("A", "hi"));
        buffer.append("g", record("B", "yo"));

        let drained = buffer.drain_all("g");
        assert!(drained.existed);
        assert_eq!(rendered(&drained.records), vec!["A: hi", "B: yo"]);

        let again = buffer.drain_all("g");
        assert!(!again.existed);
        assert!(again.records.is_empty());
    }

    #[test]
    fn test_conversations_are_isolated() {
        let buffer = ConversationBuffer::new();
        buffer.append("g1", record("A", "one"));
        buffer.append("g2", record("B", "two"));

        assert_eq!(buffer.conversation_count(), 2);
        assert_eq!(rendered(&buffer.drain_all("g1").records), vec!["A: one"]);
        assert_eq!(buffer.pending_count("g2"), 1);
        assert_eq!(buffer.conversation_count(), 1);
    }

    #[test]
    fn test_restore_prepends_before_newer_records() {
        let buffer = ConversationBuffer::new();
        buffer.append("g", record("A", "hi"));
        buffer.append("g", record("B", "yo"));

        let drained = buffer.drain_all("g");
        buffer.append("g", record("C", "new"));
        buffer.restore("g", drained.records);

        assert_eq!(
            rendered(&buffer.drain_all("g").records),
            vec!["A: hi", "B: yo", "C: new"]
        );
    }

    #[test]
    fn test_restore_recreates_entry() {
        let buffer = ConversationBuffer::new();
        buffer.append("g", record("A", "hi"));
        let drained = buffer.drain_all("g");
        assert_eq!(buffer.conversation_count(), 0);

        buffer.restore("g", drained.records);
        assert_eq!(buffer.pending_count("g"), 1);
    }

    #[test]
    fn test_restore_empty_is_noop() {
        let buffer = ConversationBuffer::new();
        buffer.restore("g", Vec::new());

        assert_eq!(buffer.conversation_count(), 0);
        assert!(!buffer.drain_all("g").existed);
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let buffer = Arc::new(ConversationBuffer::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        buffer.append("g", record(&format!("w{worker}"), &format!("m{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = buffer.drain_all("g");
        assert_eq!(drained.records.len(), 2000);

        // Per-writer order survives interleaving
        let w0: Vec<_> = drained
            .records
            .iter()
            .filter(|r| r.author() == "w0")
            .map(|r| r.text().to_string())
            .collect();
        let expected: Vec<_> = (0..250).map(|i| format!("m{i}")).collect();
        assert_eq!(w0, expected);
    }

    #[test]
    fn test_concurrent_drains_take_each_record_once() {
        let buffer = Arc::new(ConversationBuffer::new());
        for i in 0..500 {
            buffer.append("g", record("A", &i.to_string()));
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let buffer = buffer.clone();
                std::thread::spawn(move || buffer.drain_all("g").records.len())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 500);
    }
}
