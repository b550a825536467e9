/**
 * Data Model
 *
 * Core document types: list items, personal lists, collaborative lists
 * and user records. Field names serialize in camelCase to match the
 * JSON wire format the clients speak.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do item inside a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub text: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub date: DateTime<Utc>,
    pub completed: bool,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            desc: None,
            date: Utc::now(),
            completed: false,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

/// A private list owned by exactly one user.
///
/// The owner is implicit in where the list is stored; personal lists
/// are never shared and carry no membership data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalList {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ListItem>,
    pub date: DateTime<Utc>,
}

impl PersonalList {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            items: Vec::new(),
            date: Utc::now(),
        }
    }
}

/// A shared list visible to and editable by every member.
///
/// Invariant: `owner` is always present in `members`, and a user id is
/// in `members` exactly when this list's id is in that user's
/// collab-list index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollabList {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ListItem>,
    pub date: DateTime<Utc>,
    pub owner: Uuid,
    pub members: Vec<Uuid>,
}

impl CollabList {
    /// Create a new collab list with the creator as first member.
    pub fn new(title: impl Into<String>, owner: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            items: Vec::new(),
            date: Utc::now(),
            owner,
            members: vec![owner],
        }
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }
}

/// A registered account.
///
/// `collab_list_ids` is the user-side half of the membership invariant:
/// it indexes every collab list the user belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub collab_list_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            collab_list_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
