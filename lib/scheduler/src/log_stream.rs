//! Append-only, per-execution log streams with typed checkpoint records.
//!
//! Mirrors the dual-reader design of the originating system's log
//! streaming (a status poller racing a record reader into one consumer
//! channel), but with retained history instead of a Redis stream: a joiner
//! arriving after `closed` can still replay from position 0.

use flowforge_core::ExecId;
use flowforge_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The kind of one log stream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Standard output from a node-scoped command.
    Stdout,
    /// Standard error from a node-scoped command.
    Stderr,
    /// The merged result of one action.
    Result,
    /// A terminal action or execution error.
    Error,
    /// The execution (or one action) was cancelled.
    Cancelled,
    /// Terminal record for the stream; no further records follow.
    Closed,
}

/// One record in an execution's log stream.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// The action this record belongs to, if any.
    pub action_id: Option<String>,
    /// The node this record originated on, empty for the local/implicit node.
    pub node_name: String,
    /// The record's payload.
    pub value: String,
    /// The record's kind.
    pub kind: MessageKind,
}

impl StreamMessage {
    /// Builds the terminal `closed` record.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            action_id: None,
            node_name: String::new(),
            value: String::new(),
            kind: MessageKind::Closed,
        }
    }
}

struct Stream {
    history: Vec<StreamMessage>,
    sender: broadcast::Sender<StreamMessage>,
}

/// An in-process, append-only log sink keyed by [`ExecId`].
///
/// Backed by a retained record buffer fanned out through
/// `tokio::sync::broadcast`, so a reader joining after the stream closed
/// still observes the full history by replaying the buffer first.
#[derive(Default)]
pub struct LogSink {
    streams: Mutex<HashMap<ExecId, Stream>>,
}

impl LogSink {
    /// Creates an empty log sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a typed checkpoint record to `exec_id`'s stream, opening the
    /// stream on first use.
    pub fn checkpoint(&self, exec_id: ExecId, message: StreamMessage) {
        let mut streams = self.streams.lock().unwrap();
        let stream = streams.entry(exec_id).or_insert_with(|| Stream {
            history: Vec::new(),
            sender: broadcast::channel(256).0,
        });
        stream.history.push(message.clone());
        // No active subscribers is not an error; the history buffer is the
        // durable record.
        let _ = stream.sender.send(message);
    }

    /// Appends the terminal `closed` record.
    pub fn close(&self, exec_id: ExecId) {
        self.checkpoint(exec_id, StreamMessage::closed());
    }

    /// Returns the full retained history plus a receiver for records not
    /// yet observed, for a consumer to replay-then-follow.
    #[must_use]
    pub fn subscribe(&self, exec_id: ExecId) -> (Vec<StreamMessage>, broadcast::Receiver<StreamMessage>) {
        let mut streams = self.streams.lock().unwrap();
        let stream = streams.entry(exec_id).or_insert_with(|| Stream {
            history: Vec::new(),
            sender: broadcast::channel(256).0,
        });
        (stream.history.clone(), stream.sender.subscribe())
    }
}

/// Merges the retained record stream with a store-status poller into one
/// consumer channel.
///
/// Replays history, then races new records against a poll of the
/// execution's store status. Terminates when a `closed` record is read,
/// when the store status reaches a terminal state and every record queued
/// up to that point has drained (synthesizing a `closed` record if the
/// stream never got one -- a worker can crash mid-action without ever
/// calling [`LogSink::close`]), or when the consumer drops its receiver.
#[must_use]
pub fn stream_logs(
    sink: Arc<LogSink>,
    store: Arc<dyn Store>,
    exec_id: ExecId,
) -> mpsc::Receiver<StreamMessage> {
    let (tx, rx) = mpsc::channel(256);

    tokio::spawn(async move {
        let (history, mut records) = sink.subscribe(exec_id);

        for message in history {
            let closed = matches!(message.kind, MessageKind::Closed);
            if tx.send(message).await.is_err() {
                return;
            }
            if closed {
                return;
            }
        }

        let mut status_poll = tokio::time::interval(STATUS_POLL_INTERVAL);
        status_poll.tick().await; // the first tick fires immediately
        let mut terminal = false;

        loop {
            tokio::select! {
                record = records.recv() => {
                    match record {
                        Ok(message) => {
                            let closed = matches!(message.kind, MessageKind::Closed);
                            if tx.send(message).await.is_err() {
                                return;
                            }
                            if closed {
                                return;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
                _ = status_poll.tick(), if !terminal => {
                    if let Ok(execution) = store.get_execution(exec_id).await {
                        terminal = execution.status.is_terminal();
                    }
                }
            }

            if terminal {
                loop {
                    match records.try_recv() {
                        Ok(message) => {
                            let closed = matches!(message.kind, MessageKind::Closed);
                            if tx.send(message).await.is_err() {
                                return;
                            }
                            if closed {
                                return;
                            }
                        }
                        Err(_) => break,
                    }
                }
                let _ = tx.send(StreamMessage::closed()).await;
                return;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(kind: MessageKind, value: &str) -> StreamMessage {
        StreamMessage {
            action_id: Some("a".to_string()),
            node_name: String::new(),
            value: value.to_string(),
            kind,
        }
    }

    #[test]
    fn joiner_after_close_replays_full_history() {
        let sink = LogSink::new();
        let exec_id = ExecId::new();
        sink.checkpoint(exec_id, msg(MessageKind::Result, "one"));
        sink.close(exec_id);

        let (history, _rx) = sink.subscribe(exec_id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, "one");
        assert!(matches!(history[1].kind, MessageKind::Closed));
    }

    #[tokio::test]
    async fn live_subscriber_observes_subsequent_records() {
        let sink = LogSink::new();
        let exec_id = ExecId::new();
        let (history, mut rx) = sink.subscribe(exec_id);
        assert!(history.is_empty());

        sink.checkpoint(exec_id, msg(MessageKind::Stdout, "hello"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.value, "hello");
    }

    #[tokio::test]
    async fn stream_logs_stops_at_an_explicit_closed_record() {
        use flowforge_store::InMemoryStore;

        let sink = Arc::new(LogSink::new());
        let store = Arc::new(InMemoryStore::new());
        let exec_id = ExecId::new();

        sink.checkpoint(exec_id, msg(MessageKind::Stdout, "hello"));
        sink.close(exec_id);

        let mut rx = stream_logs(sink, store, exec_id);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.value, "hello");
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.kind, MessageKind::Closed));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn stream_logs_synthesizes_closed_when_store_status_goes_terminal() {
        use flowforge_core::{FlowId, NamespaceId};
        use flowforge_store::{Execution, ExecutionStatus, InMemoryStore};

        let sink = Arc::new(LogSink::new());
        let store = Arc::new(InMemoryStore::new());
        let exec_id = ExecId::new();

        store
            .create_execution(Execution::new(exec_id, FlowId::new(), NamespaceId::new()))
            .await
            .unwrap();
        sink.checkpoint(exec_id, msg(MessageKind::Result, "done"));

        let mut rx = stream_logs(sink, store.clone(), exec_id);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.value, "done");

        store
            .finish_execution(exec_id, ExecutionStatus::Completed, None)
            .await
            .unwrap();

        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("stream_logs should close once the store status goes terminal")
            .unwrap();
        assert!(matches!(closed.kind, MessageKind::Closed));
    }
}
