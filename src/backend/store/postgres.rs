/**
 * PostgreSQL Store
 *
 * sqlx-backed `Store` implementation. Items are stored as JSONB
 * documents; membership is a UUID array on the collab list plus a
 * UUID-array index on the user row. The join operation wraps both
 * array appends in a single transaction.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::shared::model::{CollabList, ListItem, PersonalList, User};

use super::{Store, StoreError};

/// PostgreSQL-backed `Store` implementation
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and run embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;

        tracing::info!("Running database migrations...");
        match sqlx::migrate!().run(&pool).await {
            Ok(_) => tracing::info!("Database migrations completed"),
            Err(e) => {
                // Migrations may already be applied out-of-band.
                tracing::error!("Failed to run database migrations: {:?}", e);
                tracing::warn!("Continuing without migrations");
            }
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    collab_list_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            collab_list_ids: row.collab_list_ids,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PersonalListRow {
    id: Uuid,
    title: String,
    items: Json<Vec<ListItem>>,
    created_at: DateTime<Utc>,
}

impl From<PersonalListRow> for PersonalList {
    fn from(row: PersonalListRow) -> Self {
        PersonalList {
            id: row.id,
            title: row.title,
            items: row.items.0,
            date: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CollabListRow {
    id: Uuid,
    title: String,
    items: Json<Vec<ListItem>>,
    created_at: DateTime<Utc>,
    owner_id: Uuid,
    member_ids: Vec<Uuid>,
}

impl From<CollabListRow> for CollabList {
    fn from(row: CollabListRow) -> Self {
        CollabList {
            id: row.id,
            title: row.title,
            items: row.items.0,
            date: row.created_at,
            owner: row.owner_id,
            members: row.member_ids,
        }
    }
}

/// Map an insert failure, folding the `users.email` unique-constraint
/// violation into `EmailTaken`. Letting the constraint decide avoids a
/// check-then-insert race between concurrent registrations.
fn user_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::EmailTaken;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, collab_list_ids, created_at)
            VALUES ($1, $2, $3, '{}', $4)
            RETURNING id, email, password_hash, collab_list_ids, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(user_insert_error)?;

        Ok(row.into())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, collab_list_ids, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, collab_list_ids, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn personal_lists(&self, owner: Uuid) -> Result<Vec<PersonalList>, StoreError> {
        let rows = sqlx::query_as::<_, PersonalListRow>(
            r#"
            SELECT id, title, items, created_at
            FROM lists
            WHERE owner_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_personal_list(
        &self,
        owner: Uuid,
        list: PersonalList,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO lists (id, owner_id, title, items, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(list.id)
        .bind(owner)
        .bind(&list.title)
        .bind(Json(&list.items))
        .bind(list.date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_personal_list(
        &self,
        owner: Uuid,
        list_id: Uuid,
        title: Option<String>,
        items: Option<Vec<ListItem>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE lists
            SET title = COALESCE($3, title),
                items = COALESCE($4, items)
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(list_id)
        .bind(owner)
        .bind(title)
        .bind(items.map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn replace_personal_lists(
        &self,
        owner: Uuid,
        lists: Vec<PersonalList>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM lists WHERE owner_id = $1")
            .bind(owner)
            .execute(&mut *tx)
            .await?;

        for list in &lists {
            sqlx::query(
                r#"
                INSERT INTO lists (id, owner_id, title, items, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(list.id)
            .bind(owner)
            .bind(&list.title)
            .bind(Json(&list.items))
            .bind(list.date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_collab_list(&self, list: CollabList) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collab_lists (id, owner_id, title, items, member_ids, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(list.id)
        .bind(list.owner)
        .bind(&list.title)
        .bind(Json(&list.items))
        .bind(&list.members)
        .bind(list.date)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET collab_list_ids = array_append(collab_list_ids, $1)
            WHERE id = $2
            "#,
        )
        .bind(list.id)
        .bind(list.owner)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn collab_lists_for(&self, user: Uuid) -> Result<Vec<CollabList>, StoreError> {
        let index = match self.user_by_id(user).await? {
            Some(u) => u.collab_list_ids,
            None => return Ok(Vec::new()),
        };

        // Cross-check: listed in the user's index AND user in the member set.
        let rows = sqlx::query_as::<_, CollabListRow>(
            r#"
            SELECT id, title, items, created_at, owner_id, member_ids
            FROM collab_lists
            WHERE id = ANY($1) AND $2 = ANY(member_ids)
            ORDER BY created_at
            "#,
        )
        .bind(&index)
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn collab_list_for_member(
        &self,
        list_id: Uuid,
        user: Uuid,
    ) -> Result<CollabList, StoreError> {
        let row = sqlx::query_as::<_, CollabListRow>(
            r#"
            SELECT id, title, items, created_at, owner_id, member_ids
            FROM collab_lists
            WHERE id = $1 AND $2 = ANY(member_ids)
            "#,
        )
        .bind(list_id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    async fn update_collab_list(
        &self,
        list_id: Uuid,
        user: Uuid,
        title: Option<String>,
        items: Option<Vec<ListItem>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE collab_lists
            SET title = COALESCE($3, title),
                items = COALESCE($4, items)
            WHERE id = $1 AND $2 = ANY(member_ids)
            "#,
        )
        .bind(list_id)
        .bind(user)
        .bind(title)
        .bind(items.map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn join_collab_list(&self, list_id: Uuid, user: Uuid) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let members: Option<Vec<Uuid>> = sqlx::query_scalar(
            r#"
            SELECT member_ids FROM collab_lists WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(list_id)
        .fetch_optional(&mut *tx)
        .await?;

        let members = members.ok_or(StoreError::NotFound)?;
        if members.contains(&user) {
            return Err(StoreError::AlreadyMember);
        }

        sqlx::query(
            r#"
            UPDATE collab_lists
            SET member_ids = array_append(member_ids, $2)
            WHERE id = $1
            "#,
        )
        .bind(list_id)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET collab_list_ids = array_append(collab_list_ids, $1)
            WHERE id = $2
            "#,
        )
        .bind(list_id)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
