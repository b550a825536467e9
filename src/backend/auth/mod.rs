/**
 * Authentication
 *
 * Registration, login and JWT session handling.
 */

pub mod handlers;
pub mod sessions;
