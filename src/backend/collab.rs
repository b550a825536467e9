/**
 * Collaborative List Handlers
 *
 * Shared-list CRUD, membership join and the ephemeral random-item
 * draw. Every state-changing operation persists first, then publishes
 * through the notifier; delivery to each current subscriber of the
 * list, including the originator, is the channel's job.
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::lists::Ack;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::backend::store::StoreError;
use crate::shared::event::ServerEvent;
use crate::shared::model::{CollabList, ListItem};

#[derive(Debug, Deserialize)]
pub struct CreateCollabRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCollabRequest {
    pub title: Option<String>,
    pub items: Option<Vec<ListItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinCollabRequest {
    pub collab_list_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DrawItemRequest {
    pub item: String,
}

/// POST /collab-lists
pub async fn create_collab_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateCollabRequest>,
) -> Result<(StatusCode, Json<Ack>), ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::validation("title cannot be empty"));
    }

    let list = CollabList::new(request.title, user.user_id);
    let list_id = list.id;
    state.store.insert_collab_list(list).await?;
    tracing::info!(%list_id, owner = %user.user_id, "collab list created");

    Ok((
        StatusCode::CREATED,
        Json(Ack { message: "Collab list created" }),
    ))
}

/// GET /collab-lists/ids
pub async fn fetch_collab_ids(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Uuid>>, ApiError> {
    let ids = state
        .store
        .user_by_id(user.user_id)
        .await?
        .map(|u| u.collab_list_ids)
        .unwrap_or_default();
    Ok(Json(ids))
}

/// GET /collab-lists
pub async fn fetch_collab_lists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<CollabList>>, ApiError> {
    let lists = state.store.collab_lists_for(user.user_id).await?;
    Ok(Json(lists))
}

/// GET /collab-lists/{id}
pub async fn fetch_collab_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(list_id): Path<Uuid>,
) -> Result<Json<CollabList>, ApiError> {
    let list = state
        .store
        .collab_list_for_member(list_id, user.user_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("collab list"),
            other => other.into(),
        })?;
    Ok(Json(list))
}

/// PUT /collab-lists/{id}
///
/// Persists the wholesale field replacement, then notifies every
/// current subscriber of this list to re-fetch.
pub async fn update_collab_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(list_id): Path<Uuid>,
    Json(request): Json<UpdateCollabRequest>,
) -> Result<Json<Ack>, ApiError> {
    state
        .store
        .update_collab_list(list_id, user.user_id, request.title, request.items)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("collab list"),
            other => other.into(),
        })?;

    tracing::info!(%list_id, editor = %user.user_id, "collab list updated, resyncing subscribers");
    state
        .notifier
        .publish(list_id, ServerEvent::ListUpdated { id: list_id });

    Ok(Json(Ack { message: "Collab list updated" }))
}

/// PUT /collab-lists/join
pub async fn join_collab_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<JoinCollabRequest>,
) -> Result<Json<Ack>, ApiError> {
    state
        .store
        .join_collab_list(request.collab_list_id, user.user_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::not_found("collab list"),
            other => other.into(),
        })?;

    tracing::info!(list_id = %request.collab_list_id, joiner = %user.user_id, "user joined collab list");
    Ok(Json(Ack { message: "Joined collab list" }))
}

/// PUT /collab-lists/{id}/draw
///
/// Broadcasts an ephemeral random-item draw to subscribers. Nothing is
/// persisted; the list is untouched. Membership is re-checked against
/// the store, and a non-member's draw is dropped silently (logged
/// only), matching the display-level nature of the feature.
pub async fn draw_random_item(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(list_id): Path<Uuid>,
    Json(request): Json<DrawItemRequest>,
) -> Result<Json<Ack>, ApiError> {
    match state
        .store
        .collab_list_for_member(list_id, user.user_id)
        .await
    {
        Ok(_) => {
            state.notifier.publish(
                list_id,
                ServerEvent::RandomItem {
                    item: request.item,
                    user_id: user.user_id,
                    collab_list_id: list_id,
                },
            );
        }
        Err(StoreError::NotFound) => {
            tracing::warn!(%list_id, caller = %user.user_id, "random-item draw by non-member dropped");
        }
        Err(other) => return Err(other.into()),
    }

    Ok(Json(Ack { message: "Random item drawn" }))
}
