//! Notification boundary. The lifecycle manager emits one event after each
//! committed mutation; delivery is fire-and-forget.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cofound_shared::types::event::routing_keys;

use crate::models::Connection;

pub mod publisher;

pub use publisher::RabbitMqEmitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEventKind {
    RequestCreated,
    RequestAccepted,
    RequestRejected,
    RequestWithdrawn,
    ConnectionRemoved,
}

impl ConnectionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCreated => "request_created",
            Self::RequestAccepted => "request_accepted",
            Self::RequestRejected => "request_rejected",
            Self::RequestWithdrawn => "request_withdrawn",
            Self::ConnectionRemoved => "connection_removed",
        }
    }

    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::RequestCreated => routing_keys::CONNECTION_REQUEST_CREATED,
            Self::RequestAccepted => routing_keys::CONNECTION_REQUEST_ACCEPTED,
            Self::RequestRejected => routing_keys::CONNECTION_REQUEST_REJECTED,
            Self::RequestWithdrawn => routing_keys::CONNECTION_REQUEST_WITHDRAWN,
            Self::ConnectionRemoved => routing_keys::CONNECTION_REMOVED,
        }
    }
}

impl std::fmt::Display for ConnectionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub connection_id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    /// Profile whose action produced the event.
    pub actor_id: Uuid,
}

impl ConnectionEvent {
    pub fn new(kind: ConnectionEventKind, connection: &Connection, actor_id: Uuid) -> Self {
        Self {
            kind,
            connection_id: connection.id,
            requester_id: connection.requester_id,
            receiver_id: connection.receiver_id,
            actor_id,
        }
    }

    /// The party who should be told: whoever did not act.
    pub fn recipient_id(&self) -> Uuid {
        if self.actor_id == self.requester_id {
            self.receiver_id
        } else {
            self.requester_id
        }
    }
}

/// Implementations log their own delivery failures; `emit` never reports
/// them back to the caller.
#[async_trait::async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, event: ConnectionEvent);

    fn is_healthy(&self) -> bool {
        true
    }
}

pub struct NoopEmitter;

#[async_trait::async_trait]
impl NotificationEmitter for NoopEmitter {
    async fn emit(&self, event: ConnectionEvent) {
        tracing::debug!(kind = %event.kind, connection_id = %event.connection_id, "event dropped (noop emitter)");
    }
}

/// Keeps every emitted event in memory.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<ConnectionEventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }
}

#[async_trait::async_trait]
impl NotificationEmitter for RecordingEmitter {
    async fn emit(&self, event: ConnectionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
