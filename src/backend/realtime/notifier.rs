/**
 * Notifier
 *
 * Isolates the mutation API from fan-out mechanics. Handlers publish
 * `(list_id, event)` and never learn who is connected; a different
 * backend (durable pub/sub, cross-process bus) could replace
 * `RegistryNotifier` without touching a single handler.
 */

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::backend::registry::MembershipRegistry;
use crate::shared::event::ServerEvent;

/// Fire-and-forget event publication, addressed by collab list
pub trait Notifier: Send + Sync {
    /// Deliver `event` to every current subscriber of `list_id`,
    /// at most once each. Never blocks and never fails the caller.
    fn publish(&self, list_id: Uuid, event: ServerEvent);
}

/// `Notifier` backed by the in-process membership registry
pub struct RegistryNotifier {
    registry: Arc<MembershipRegistry>,
}

impl RegistryNotifier {
    pub fn new(registry: Arc<MembershipRegistry>) -> Self {
        Self { registry }
    }
}

impl Notifier for RegistryNotifier {
    fn publish(&self, list_id: Uuid, event: ServerEvent) {
        let targets = self.registry.senders_for(list_id);
        if targets.is_empty() {
            tracing::debug!(%list_id, "no subscribers, dropping event");
            return;
        }

        let mut delivered = 0usize;
        for (connection, sender) in targets {
            // One broken or slow subscriber must not abort the rest.
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%connection, %list_id, "subscriber queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%connection, %list_id, "subscriber gone, event dropped");
                }
            }
        }
        tracing::debug!(%list_id, delivered, "event fanned out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_updated(id: Uuid) -> ServerEvent {
        ServerEvent::ListUpdated { id }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let registry = Arc::new(MembershipRegistry::new());
        let notifier = RegistryNotifier::new(registry.clone());
        let list = Uuid::new_v4();

        let (conn_a, mut rx_a) = registry.connect();
        let (conn_b, mut rx_b) = registry.connect();
        registry.subscribe(conn_a, list);
        registry.subscribe(conn_b, list);

        notifier.publish(list, list_updated(list));

        assert_eq!(rx_a.recv().await, Some(list_updated(list)));
        assert_eq!(rx_b.recv().await, Some(list_updated(list)));
    }

    #[tokio::test]
    async fn test_publish_skips_other_lists() {
        let registry = Arc::new(MembershipRegistry::new());
        let notifier = RegistryNotifier::new(registry.clone());
        let list = Uuid::new_v4();
        let other = Uuid::new_v4();

        let (conn, mut rx) = registry.connect();
        registry.subscribe(conn, other);

        notifier.publish(list, list_updated(list));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_subscriber_does_not_block_the_rest() {
        let registry = Arc::new(MembershipRegistry::new());
        let notifier = RegistryNotifier::new(registry.clone());
        let list = Uuid::new_v4();

        let (dead, rx_dead) = registry.connect();
        let (alive, mut rx_alive) = registry.connect();
        registry.subscribe(dead, list);
        registry.subscribe(alive, list);
        drop(rx_dead);

        notifier.publish(list, list_updated(list));
        assert_eq!(rx_alive.recv().await, Some(list_updated(list)));
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_panicking() {
        let registry = Arc::new(MembershipRegistry::new());
        let notifier = RegistryNotifier::new(registry.clone());
        let list = Uuid::new_v4();

        let (conn, _rx) = registry.connect();
        registry.subscribe(conn, list);

        // Overrun the bounded buffer; extra events drop silently.
        for _ in 0..(crate::backend::registry::CONNECTION_BUFFER + 10) {
            notifier.publish(list, list_updated(list));
        }
    }
}
