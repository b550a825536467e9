/**
 * Application State
 *
 * The shared state handed to every handler: the document store, the
 * membership registry that indexes live channel connections, and the
 * notifier the mutation API publishes events through. The registry is
 * owned here and injected into both the channel server and the
 * notifier; nothing reaches it through a global.
 */

use std::sync::Arc;

use crate::backend::realtime::{Notifier, RegistryNotifier};
use crate::backend::registry::MembershipRegistry;
use crate::backend::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<MembershipRegistry>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Wire up state around a store, with registry-backed fan-out.
    pub fn new(store: Arc<dyn Store>) -> Self {
        let registry = Arc::new(MembershipRegistry::new());
        let notifier: Arc<dyn Notifier> = Arc::new(RegistryNotifier::new(registry.clone()));
        Self {
            store,
            registry,
            notifier,
        }
    }
}
