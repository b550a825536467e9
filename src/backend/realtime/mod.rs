/**
 * Realtime Event Fan-out
 *
 * The `Notifier` seam the mutation API publishes through, and the
 * WebSocket channel server that delivers events to subscribed clients.
 */

pub mod channel;
pub mod notifier;

pub use channel::run_sync_channel;
pub use notifier::{Notifier, RegistryNotifier};
