use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::OrderStatus;

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

    /// Sends an event, logging instead of failing when the consumer is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping order event");
        }
    }
}

/// Order lifecycle events. Emitted only for transitions that were applied,
/// so replayed provider notifications never produce duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: String,
        gross_amount: i64,
    },
    OrderStatusChanged {
        order_id: String,
        old_status: OrderStatus,
        new_status: OrderStatus,
        at: DateTime<Utc>,
    },
    /// First entry into a paid state
    OrderPaid {
        order_id: String,
        gross_amount: i64,
    },
    /// Denied, cancelled or expired
    OrderClosed {
        order_id: String,
        status: OrderStatus,
    },
}

impl Event {
    pub fn order_id(&self) -> &str {
        match self {
            Event::OrderCreated { order_id, .. }
            | Event::OrderStatusChanged { order_id, .. }
            | Event::OrderPaid { order_id, .. }
            | Event::OrderClosed { order_id, .. } => order_id,
        }
    }

    /// Events that follow from moving an order between two statuses.
    pub fn for_transition(
        order_id: &str,
        gross_amount: i64,
        old_status: OrderStatus,
        new_status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = vec![Event::OrderStatusChanged {
            order_id: order_id.to_string(),
            old_status,
            new_status,
            at,
        }];
        if new_status.is_paid() && !old_status.is_paid() {
            events.push(Event::OrderPaid {
                order_id: order_id.to_string(),
                gross_amount,
            });
        } else if new_status.is_terminal() && !new_status.is_paid() {
            events.push(Event::OrderClosed {
                order_id: order_id.to_string(),
                status: new_status,
            });
        }
        events
    }
}

/// Drains the event channel, logging each event. Fulfilment hooks attach here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                gross_amount,
            } => info!(order_id = %order_id, gross_amount, "order created"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
                ..
            } => info!(
                order_id = %order_id,
                from = %old_status,
                to = %new_status,
                "order status changed"
            ),
            Event::OrderPaid {
                order_id,
                gross_amount,
            } => info!(order_id = %order_id, gross_amount, "order paid"),
            Event::OrderClosed { order_id, status } => {
                info!(order_id = %order_id, status = %status, "order closed")
            }
        }
    }

    info!("Event processing loop stopped");
}
