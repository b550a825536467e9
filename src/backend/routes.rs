/**
 * Router Assembly
 *
 * Public routes (register, login, health) plus the protected mutation
 * API behind the auth middleware.
 */

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::backend::auth::handlers::{login, register};
use crate::backend::collab::{
    create_collab_list, draw_random_item, fetch_collab_ids, fetch_collab_list,
    fetch_collab_lists, join_collab_list, update_collab_list,
};
use crate::backend::lists::{create_list, fetch_lists, override_lists, update_list};
use crate::backend::middleware::require_auth;
use crate::backend::server::state::AppState;

/// Build the complete application router.
pub fn create_router(state: AppState) -> Router {
    // Static segments win over {id} captures, so /collab-lists/ids and
    // /collab-lists/join coexist with /collab-lists/{id}.
    let protected = Router::new()
        .route(
            "/lists",
            get(fetch_lists).post(create_list).put(override_lists),
        )
        .route("/lists/{id}", put(update_list))
        .route(
            "/collab-lists",
            get(fetch_collab_lists).post(create_collab_list),
        )
        .route("/collab-lists/ids", get(fetch_collab_ids))
        .route("/collab-lists/join", put(join_collab_list))
        .route(
            "/collab-lists/{id}",
            get(fetch_collab_list).put(update_collab_list),
        )
        .route("/collab-lists/{id}/draw", put(draw_random_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
