/**
 * Backend Modules
 *
 * Server-side implementation: HTTP mutation API, authentication,
 * document store, membership registry and the event fan-out channel.
 */

pub mod auth;
pub mod collab;
pub mod error;
pub mod lists;
pub mod middleware;
pub mod realtime;
pub mod registry;
pub mod routes;
pub mod server;
pub mod store;
