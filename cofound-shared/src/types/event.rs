use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events.
///
/// Routing key format: `cofound.{domain}.{entity}.{action}`
/// Example: `cofound.connections.request.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    /// Profile that caused the event.
    pub actor_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            actor_id: None,
            data,
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    pub const CONNECTION_REQUEST_CREATED: &str = "cofound.connections.request.created";
    pub const CONNECTION_REQUEST_ACCEPTED: &str = "cofound.connections.request.accepted";
    pub const CONNECTION_REQUEST_REJECTED: &str = "cofound.connections.request.rejected";
    pub const CONNECTION_REQUEST_WITHDRAWN: &str = "cofound.connections.request.withdrawn";
    pub const CONNECTION_REMOVED: &str = "cofound.connections.connection.removed";

    /// Every key published by the connections service, for consumers that
    /// want the whole stream.
    pub const CONNECTION_ALL: &[&str] = &[
        CONNECTION_REQUEST_CREATED,
        CONNECTION_REQUEST_ACCEPTED,
        CONNECTION_REQUEST_REJECTED,
        CONNECTION_REQUEST_WITHDRAWN,
        CONNECTION_REMOVED,
    ];
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Body of every connection lifecycle event. `kind` mirrors the routing
    /// key in the short form notification consumers switch on.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ConnectionChanged {
        #[serde(rename = "type")]
        pub kind: String,
        pub connection_id: Uuid,
        pub requester_id: Uuid,
        pub receiver_id: Uuid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_payload_type_field() {
        let actor = Uuid::now_v7();
        let event = Event::new(
            "cofound-connections",
            routing_keys::CONNECTION_REQUEST_CREATED,
            payloads::ConnectionChanged {
                kind: "request_created".into(),
                connection_id: Uuid::now_v7(),
                requester_id: actor,
                receiver_id: Uuid::now_v7(),
            },
        )
        .with_actor(actor);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["type"], "request_created");
        assert_eq!(json["actor_id"], actor.to_string());
        assert_eq!(json["event_type"], routing_keys::CONNECTION_REQUEST_CREATED);
    }
}
