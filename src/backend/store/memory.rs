/**
 * In-Memory Store
 *
 * Mutex-guarded map storage. Used by the test suite and as the
 * degraded mode when no `DATABASE_URL` is configured. All tables sit
 * behind one lock, so the membership invariant holds trivially: both
 * halves of a join happen under the same guard.
 */

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::model::{CollabList, ListItem, PersonalList, User};

use super::{Store, StoreError};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    personal: HashMap<Uuid, Vec<PersonalList>>,
    collab: HashMap<Uuid, CollabList>,
}

/// Map-backed `Store` implementation
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().unwrap();
        if tables.emails.contains_key(email) {
            return Err(StoreError::EmailTaken);
        }
        let user = User::new(email, password_hash);
        tables.emails.insert(email.to_string(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().unwrap().users.get(&id).cloned())
    }

    async fn personal_lists(&self, owner: Uuid) -> Result<Vec<PersonalList>, StoreError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .personal
            .get(&owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_personal_list(
        &self,
        owner: Uuid,
        list: PersonalList,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .unwrap()
            .personal
            .entry(owner)
            .or_default()
            .push(list);
        Ok(())
    }

    async fn update_personal_list(
        &self,
        owner: Uuid,
        list_id: Uuid,
        title: Option<String>,
        items: Option<Vec<ListItem>>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        let list = tables
            .personal
            .get_mut(&owner)
            .and_then(|lists| lists.iter_mut().find(|l| l.id == list_id))
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = title {
            list.title = title;
        }
        if let Some(items) = items {
            list.items = items;
        }
        Ok(())
    }

    async fn replace_personal_lists(
        &self,
        owner: Uuid,
        lists: Vec<PersonalList>,
    ) -> Result<(), StoreError> {
        self.tables.write().unwrap().personal.insert(owner, lists);
        Ok(())
    }

    async fn insert_collab_list(&self, list: CollabList) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        let owner = tables
            .users
            .get_mut(&list.owner)
            .ok_or(StoreError::NotFound)?;
        owner.collab_list_ids.push(list.id);
        tables.collab.insert(list.id, list);
        Ok(())
    }

    async fn collab_lists_for(&self, user: Uuid) -> Result<Vec<CollabList>, StoreError> {
        let tables = self.tables.read().unwrap();
        let index = match tables.users.get(&user) {
            Some(u) => &u.collab_list_ids,
            None => return Ok(Vec::new()),
        };
        // Cross-check both halves of the membership invariant.
        Ok(index
            .iter()
            .filter_map(|id| tables.collab.get(id))
            .filter(|list| list.is_member(user))
            .cloned()
            .collect())
    }

    async fn collab_list_for_member(
        &self,
        list_id: Uuid,
        user: Uuid,
    ) -> Result<CollabList, StoreError> {
        let tables = self.tables.read().unwrap();
        tables
            .collab
            .get(&list_id)
            .filter(|list| list.is_member(user))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_collab_list(
        &self,
        list_id: Uuid,
        user: Uuid,
        title: Option<String>,
        items: Option<Vec<ListItem>>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        let list = tables
            .collab
            .get_mut(&list_id)
            .filter(|list| list.is_member(user))
            .ok_or(StoreError::NotFound)?;
        if let Some(title) = title {
            list.title = title;
        }
        if let Some(items) = items {
            list.items = items;
        }
        Ok(())
    }

    async fn join_collab_list(&self, list_id: Uuid, user: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().unwrap();
        {
            let list = tables.collab.get(&list_id).ok_or(StoreError::NotFound)?;
            if list.is_member(user) {
                return Err(StoreError::AlreadyMember);
            }
        }
        if !tables.users.contains_key(&user) {
            return Err(StoreError::NotFound);
        }
        // Both writes under the same guard.
        tables
            .collab
            .get_mut(&list_id)
            .ok_or(StoreError::NotFound)?
            .members
            .push(user);
        tables
            .users
            .get_mut(&user)
            .ok_or(StoreError::NotFound)?
            .collab_list_ids
            .push(list_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::model::ListItem;

    async fn user(store: &MemoryStore, email: &str) -> User {
        store.create_user(email, "hash").await.unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        user(&store, "a@b.com").await;
        let err = store.create_user("a@b.com", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn test_membership_invariant_after_create_and_join() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let bob = user(&store, "bob@example.com").await;

        let list = CollabList::new("Trip", alice.id);
        let list_id = list.id;
        store.insert_collab_list(list).await.unwrap();

        // Creator: both halves set.
        let alice_now = store.user_by_id(alice.id).await.unwrap().unwrap();
        assert!(alice_now.collab_list_ids.contains(&list_id));
        let fetched = store.collab_list_for_member(list_id, alice.id).await.unwrap();
        assert!(fetched.is_member(alice.id));

        // Joiner: both halves set.
        store.join_collab_list(list_id, bob.id).await.unwrap();
        let bob_now = store.user_by_id(bob.id).await.unwrap().unwrap();
        assert!(bob_now.collab_list_ids.contains(&list_id));
        let fetched = store.collab_list_for_member(list_id, bob.id).await.unwrap();
        assert!(fetched.is_member(bob.id));
    }

    #[tokio::test]
    async fn test_double_join_leaves_state_unchanged() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let bob = user(&store, "bob@example.com").await;

        let list = CollabList::new("Trip", alice.id);
        let list_id = list.id;
        store.insert_collab_list(list).await.unwrap();
        store.join_collab_list(list_id, bob.id).await.unwrap();

        let err = store.join_collab_list(list_id, bob.id).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyMember));

        let fetched = store.collab_list_for_member(list_id, bob.id).await.unwrap();
        assert_eq!(fetched.members, vec![alice.id, bob.id]);
        let bob_now = store.user_by_id(bob.id).await.unwrap().unwrap();
        assert_eq!(bob_now.collab_list_ids, vec![list_id]);
    }

    #[tokio::test]
    async fn test_join_missing_list() {
        let store = MemoryStore::new();
        let bob = user(&store, "bob@example.com").await;
        let err = store
            .join_collab_list(Uuid::new_v4(), bob.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_non_member_cannot_fetch_or_update() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let eve = user(&store, "eve@example.com").await;

        let list = CollabList::new("Private", alice.id);
        let list_id = list.id;
        store.insert_collab_list(list).await.unwrap();

        assert!(matches!(
            store.collab_list_for_member(list_id, eve.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store
                .update_collab_list(list_id, eve.id, Some("hacked".into()), None)
                .await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_collab_update_replaces_items_wholesale() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let mut list = CollabList::new("Trip", alice.id);
        list.items.push(ListItem::new("Old"));
        let list_id = list.id;
        store.insert_collab_list(list).await.unwrap();

        let replacement = vec![ListItem::new("New A"), ListItem::new("New B")];
        store
            .update_collab_list(list_id, alice.id, None, Some(replacement.clone()))
            .await
            .unwrap();

        let fetched = store.collab_list_for_member(list_id, alice.id).await.unwrap();
        assert_eq!(fetched.items, replacement);
        assert_eq!(fetched.title, "Trip");
    }

    #[tokio::test]
    async fn test_personal_list_round_trip_and_override() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;

        let mut list = PersonalList::new("Chores");
        list.items.push(ListItem::new("Dishes"));
        let list_id = list.id;
        store.insert_personal_list(alice.id, list.clone()).await.unwrap();

        let fetched = store.personal_lists(alice.id).await.unwrap();
        assert_eq!(fetched, vec![list]);

        store
            .update_personal_list(alice.id, list_id, Some("Weekend".into()), None)
            .await
            .unwrap();
        assert_eq!(store.personal_lists(alice.id).await.unwrap()[0].title, "Weekend");

        let fresh = vec![PersonalList::new("Only one")];
        store
            .replace_personal_lists(alice.id, fresh.clone())
            .await
            .unwrap();
        assert_eq!(store.personal_lists(alice.id).await.unwrap(), fresh);
    }

    #[tokio::test]
    async fn test_personal_lists_are_per_owner() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice@example.com").await;
        let bob = user(&store, "bob@example.com").await;

        let list = PersonalList::new("Alice only");
        let list_id = list.id;
        store.insert_personal_list(alice.id, list).await.unwrap();

        assert!(store.personal_lists(bob.id).await.unwrap().is_empty());
        assert!(matches!(
            store
                .update_personal_list(bob.id, list_id, Some("x".into()), None)
                .await,
            Err(StoreError::NotFound)
        ));
    }
}
