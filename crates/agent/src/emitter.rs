//! Ordered event delivery for one run.

use tokio::sync::mpsc;
use tracing::trace;

use crate::stream_event::AgentEvent;

/// The consumer hung up; the run should stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverClosed;

/// Sends a run's events to a single consumer, in order.
///
/// A detached emitter drops every event; it backs runs that only care about
/// the returned outcome.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: Option<mpsc::Sender<AgentEvent>>,
}

impl EventEmitter {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Deliver one event. Waits while the consumer's buffer is full.
    pub async fn emit(&self, event: AgentEvent) -> Result<(), ReceiverClosed> {
        trace!(event = event.event_type(), "Emitting agent event");
        match &self.tx {
            Some(tx) => tx.send(event).await.map_err(|_| ReceiverClosed),
            None => Ok(()),
        }
    }
}
