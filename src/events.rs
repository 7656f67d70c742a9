use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::entities::audit_log::EntityKind;

/// Events emitted by the lifecycle core. Consumers (the notification sink,
/// the binary's log drain) receive these through an [`EventSender`];
/// delivery is fire-and-forget and never affects the emitting operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A follow-up is due now for a non-terminal document.
    RelanceRequise {
        entity_ref: String,
        entity_kind: EntityKind,
        client_name: String,
        due_date: DateTime<Utc>,
        amount: Option<Decimal>,
        status: String,
    },

    /// A document obtained its reference and was persisted.
    DocumentCreated {
        kind: EntityKind,
        id: Uuid,
        reference: String,
    },

    StatusChanged {
        kind: EntityKind,
        id: Uuid,
        old_status: String,
        new_status: String,
    },

    /// One cascade child could not be created; siblings were unaffected.
    CascadeChildFailed {
        parent_reference: String,
        child_kind: EntityKind,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing the failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget send. A full or closed channel is logged and
    /// swallowed; the initiating operation must not fail because the sink
    /// is unavailable.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event sink unavailable, dropping event");
        }
    }
}

/// Builds the event channel the binary (or a test harness) drains.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = channel(4);
        sender
            .send(Event::DocumentCreated {
                kind: EntityKind::Offer,
                id: Uuid::new_v4(),
                reference: "KIP/OFF/C001/250315/VTE1/1/0001".into(),
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::DocumentCreated { reference, .. }) => {
                assert!(reference.starts_with("KIP/OFF/"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (sender, rx) = channel(1);
        drop(rx);
        // Must not panic or error out.
        sender
            .send_or_log(Event::StatusChanged {
                kind: EntityKind::Offer,
                id: Uuid::new_v4(),
                old_status: "DRAFT".into(),
                new_status: "SENT".into(),
            })
            .await;
    }
}
