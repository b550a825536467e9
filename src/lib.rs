/**
 * listsync - Collaborative To-Do List Synchronization Core
 *
 * Backend server (mutation API + event fan-out channel) and client-side
 * sync machinery for a collaborative list application.
 *
 * # Architecture
 *
 * - `shared`: data model and wire protocol used by both sides
 * - `backend`: axum HTTP API, membership registry, WebSocket fan-out channel
 * - `client`: typed HTTP API client and the sync controller
 */

pub mod shared;
pub mod backend;
pub mod client;
