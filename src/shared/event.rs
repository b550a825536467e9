/**
 * Channel Wire Protocol
 *
 * JSON messages exchanged over the event fan-out channel. Every frame
 * is a tagged object: `{"type": "<kebab-case name>", ...camelCase fields}`.
 *
 * Client to server: `announce-identity`, `subscribe-list`.
 * Server to client: `list-updated`, `random-item`.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Messages a client sends over the channel after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Binds the connection to a user identity. Sent once, first.
    #[serde(rename_all = "camelCase")]
    AnnounceIdentity { user_id: Uuid },
    /// Registers interest in one collab list's events.
    #[serde(rename_all = "camelCase")]
    SubscribeList { list_id: Uuid },
}

impl ClientMessage {
    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a frame received from a client.
    pub fn decode(raw: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Events the server pushes to subscribed connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The named collab list changed; subscribers should re-fetch it.
    #[serde(rename_all = "camelCase")]
    ListUpdated { id: Uuid },
    /// An ephemeral "random item" draw. Display only, nothing persisted.
    #[serde(rename_all = "camelCase")]
    RandomItem {
        item: String,
        user_id: Uuid,
        collab_list_id: Uuid,
    },
}

impl ServerEvent {
    /// The collab list an event is addressed to.
    pub fn list_id(&self) -> Uuid {
        match self {
            ServerEvent::ListUpdated { id } => *id,
            ServerEvent::RandomItem { collab_list_id, .. } => *collab_list_id,
        }
    }

    /// Encode as a JSON text frame.
    pub fn encode(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a frame received from the server.
    pub fn decode(raw: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(raw)?)
    }
}
