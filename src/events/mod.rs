//! Domain events emitted after every mutating operation.
//!
//! Consumers (activity log, outbound webhooks) are fire-and-forget
//! collaborators: emission never blocks or fails the core operation.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget emission. A full or closed channel is a collaborator
    /// problem, not a request problem, so it is logged and swallowed.
    pub fn emit(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!(error = %e, "event channel rejected event; activity log entry dropped");
        }
    }
}

// The events that can occur around the reservation ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ResourceCreated(Uuid),
    ResourceUpdated(Uuid),
    ResourceDeleted(Uuid),

    // Assignment events
    ResourceAssigned {
        resource_id: Uuid,
        assignment_id: Uuid,
        quantity: i32,
    },
    AssignmentReturned {
        resource_id: Uuid,
        assignment_id: Uuid,
        condition: String,
        restocked: bool,
    },
    AssignmentRevoked {
        resource_id: Uuid,
        assignment_id: Uuid,
    },

    // Stock ledger events
    StockAdjusted {
        resource_id: Uuid,
        movement_type: String,
        delta: i32,
        new_stock: i32,
    },
}

impl Event {
    /// Short activity-log verb for this event.
    pub fn action(&self) -> &'static str {
        match self {
            Event::ResourceCreated(_) => "resource.created",
            Event::ResourceUpdated(_) => "resource.updated",
            Event::ResourceDeleted(_) => "resource.deleted",
            Event::ResourceAssigned { .. } => "assignment.created",
            Event::AssignmentReturned { .. } => "assignment.returned",
            Event::AssignmentRevoked { .. } => "assignment.revoked",
            Event::StockAdjusted { .. } => "stock.adjusted",
        }
    }
}

/// Event processing loop. Writes an activity-log line for every event and,
/// when a webhook URL is configured, records the outbound notification.
/// Actual delivery is an external collaborator; failures here never
/// propagate back to the operation that emitted the event.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, webhook_url: Option<String>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize event for activity log");
                continue;
            }
        };

        info!(
            target: "activity",
            action = event.action(),
            payload = %payload,
            "activity log entry"
        );

        if let Some(url) = webhook_url.as_deref() {
            info!(
                target: "webhooks",
                action = event.action(),
                url = %url,
                "webhook notification queued"
            );
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_never_fails_when_channel_is_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error.
        sender.emit(Event::ResourceCreated(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender.emit(Event::StockAdjusted {
            resource_id: Uuid::new_v4(),
            movement_type: "in".into(),
            delta: 5,
            new_stock: 15,
        });
        let event = rx.recv().await.expect("event expected");
        assert_eq!(event.action(), "stock.adjusted");
    }

    #[test]
    fn events_serialize_for_the_activity_log() {
        let event = Event::ResourceAssigned {
            resource_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            quantity: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ResourceAssigned"));
    }
}
