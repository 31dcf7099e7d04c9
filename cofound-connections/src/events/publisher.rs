use cofound_shared::clients::rabbitmq::RabbitMQClient;
use cofound_shared::types::event::{payloads, Event};

use super::{ConnectionEvent, NotificationEmitter};

const SOURCE: &str = "cofound-connections";

/// Publishes lifecycle events to the `cofound.events` exchange for the
/// notification and realtime services.
#[derive(Clone)]
pub struct RabbitMqEmitter {
    rabbitmq: RabbitMQClient,
}

impl RabbitMqEmitter {
    pub fn new(rabbitmq: RabbitMQClient) -> Self {
        Self { rabbitmq }
    }
}

pub(crate) fn envelope(event: &ConnectionEvent) -> Event<payloads::ConnectionChanged> {
    Event::new(
        SOURCE,
        event.kind.routing_key(),
        payloads::ConnectionChanged {
            kind: event.kind.as_str().to_string(),
            connection_id: event.connection_id,
            requester_id: event.requester_id,
            receiver_id: event.receiver_id,
        },
    )
    .with_actor(event.actor_id)
    .with_correlation(event.connection_id)
}

#[async_trait::async_trait]
impl NotificationEmitter for RabbitMqEmitter {
    async fn emit(&self, event: ConnectionEvent) {
        let routing_key = event.kind.routing_key();
        if let Err(e) = self.rabbitmq.publish(routing_key, &envelope(&event)).await {
            tracing::error!(
                error = %e,
                routing_key,
                connection_id = %event.connection_id,
                "failed to publish connection event"
            );
        }
    }

    fn is_healthy(&self) -> bool {
        self.rabbitmq.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ConnectionEventKind;
    use uuid::Uuid;

    #[test]
    fn envelope_correlates_on_connection_id() {
        let event = ConnectionEvent {
            kind: ConnectionEventKind::ConnectionRemoved,
            connection_id: Uuid::now_v7(),
            requester_id: Uuid::now_v7(),
            receiver_id: Uuid::now_v7(),
            actor_id: Uuid::now_v7(),
        };
        let env = envelope(&event);
        assert_eq!(env.correlation_id, Some(event.connection_id));
        assert_eq!(env.actor_id, Some(event.actor_id));
        assert_eq!(env.data.kind, "connection_removed");
        assert_eq!(env.event_type, "cofound.connections.connection.removed");
    }
}
