/**
 * Server Assembly
 *
 * Configuration loading, shared application state and startup.
 */

pub mod config;
pub mod init;
pub mod state;
