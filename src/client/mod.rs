/**
 * Client Modules
 *
 * Typed HTTP client for the mutation API and the sync controller that
 * keeps local state fresh through the event fan-out channel.
 */

pub mod api;
pub mod sync;

pub use api::{ApiClient, ApiClientError};
pub use sync::{ConnectionState, SyncController, SyncControllerConfig, SyncSignal};
