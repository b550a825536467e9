/**
 * Personal List Handlers
 *
 * CRUD for private lists. These never touch the registry or notifier:
 * personal lists belong to one user and no one else can observe them.
 */

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::middleware::AuthUser;
use crate::backend::server::state::AppState;
use crate::shared::model::{ListItem, PersonalList};

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub title: String,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    pub title: Option<String>,
    pub items: Option<Vec<ListItem>>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideListsRequest {
    pub lists: Vec<PersonalList>,
}

/// Minimal acknowledgement body for mutations
#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: &'static str,
}

/// GET /lists
pub async fn fetch_lists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<PersonalList>>, ApiError> {
    let lists = state.store.personal_lists(user.user_id).await?;
    Ok(Json(lists))
}

/// POST /lists
pub async fn create_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<Ack>), ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::validation("title cannot be empty"));
    }

    let mut list = PersonalList::new(request.title);
    list.items = request.items;
    state.store.insert_personal_list(user.user_id, list).await?;

    Ok((StatusCode::CREATED, Json(Ack { message: "List created" })))
}

/// PUT /lists/{id}
///
/// Wholesale replacement of the provided fields; omitted fields keep
/// their stored value.
pub async fn update_list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(list_id): Path<Uuid>,
    Json(request): Json<UpdateListRequest>,
) -> Result<Json<Ack>, ApiError> {
    state
        .store
        .update_personal_list(user.user_id, list_id, request.title, request.items)
        .await?;

    Ok(Json(Ack { message: "List updated" }))
}

/// PUT /lists
///
/// Replace the caller's entire personal-list set (client bulk save).
pub async fn override_lists(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<OverrideListsRequest>,
) -> Result<Json<Ack>, ApiError> {
    state
        .store
        .replace_personal_lists(user.user_id, request.lists)
        .await?;

    Ok(Json(Ack { message: "Lists saved" }))
}
