/**
 * Document Store
 *
 * The `Store` trait is the persistence seam for the whole backend.
 * Two implementations are bundled:
 *
 * - `MemoryStore`: mutex-guarded maps, used by the test suite and as
 *   the fallback when no database is configured
 * - `PgStore`: PostgreSQL via sqlx, JSONB item payloads and UUID-array
 *   membership indexes
 *
 * Membership is bidirectional: a user id appears in a collab list's
 * member set exactly when the list id appears in that user's
 * collab-list index. `join_collab_list` performs both writes as one
 * atomic unit so the invariant is never observable broken.
 */

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::model::{CollabList, ListItem, PersonalList, User};

/// Errors surfaced by store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed document does not exist or is not visible to the caller
    #[error("not found")]
    NotFound,

    /// Join attempted by a user who is already a member
    #[error("already a member")]
    AlreadyMember,

    /// Registration attempted with an email that is already in use
    #[error("email already registered")]
    EmailTaken,

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations used by the mutation API
#[async_trait]
pub trait Store: Send + Sync {
    // -- users --

    /// Insert a new user. Fails with `EmailTaken` on a duplicate email.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    // -- personal lists --

    async fn personal_lists(&self, owner: Uuid) -> Result<Vec<PersonalList>, StoreError>;

    async fn insert_personal_list(
        &self,
        owner: Uuid,
        list: PersonalList,
    ) -> Result<(), StoreError>;

    /// Wholesale replacement of the named fields. `None` leaves a field
    /// untouched; `Some` overwrites it completely.
    async fn update_personal_list(
        &self,
        owner: Uuid,
        list_id: Uuid,
        title: Option<String>,
        items: Option<Vec<ListItem>>,
    ) -> Result<(), StoreError>;

    /// Replace the owner's entire personal-list set (bulk client save).
    async fn replace_personal_lists(
        &self,
        owner: Uuid,
        lists: Vec<PersonalList>,
    ) -> Result<(), StoreError>;

    // -- collab lists --

    /// Insert a collab list and index it on the owner, atomically.
    async fn insert_collab_list(&self, list: CollabList) -> Result<(), StoreError>;

    /// All collab lists the user is a member of. The list id must be in
    /// the user's index AND the user must be in the member set; a
    /// document failing the cross-check is skipped, not an error.
    async fn collab_lists_for(&self, user: Uuid) -> Result<Vec<CollabList>, StoreError>;

    /// Fetch one collab list; `NotFound` if absent or the user is not a
    /// member.
    async fn collab_list_for_member(
        &self,
        list_id: Uuid,
        user: Uuid,
    ) -> Result<CollabList, StoreError>;

    /// Wholesale field replacement, member-gated like the fetch.
    async fn update_collab_list(
        &self,
        list_id: Uuid,
        user: Uuid,
        title: Option<String>,
        items: Option<Vec<ListItem>>,
    ) -> Result<(), StoreError>;

    /// Add the user to the member set and the list to the user's index
    /// as one atomic unit. `NotFound` for a missing list,
    /// `AlreadyMember` for a repeat join (state unchanged).
    async fn join_collab_list(&self, list_id: Uuid, user: Uuid) -> Result<(), StoreError>;
}
