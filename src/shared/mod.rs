/**
 * Shared Types
 *
 * Data model and channel wire protocol used by both the backend
 * and the client.
 */

pub mod error;
pub mod event;
pub mod model;

pub use error::SharedError;
pub use event::{ClientMessage, ServerEvent};
pub use model::{CollabList, ListItem, PersonalList, User};
