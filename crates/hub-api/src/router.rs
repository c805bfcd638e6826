use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{communities, messages, posts, users};

/// All `/api` routes. Protected routes sit behind [`require_auth`].
pub fn api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/posts", get(posts::get_posts))
        .route("/api/posts/{id}", get(posts::get_post))
        .route("/api/users/{username}", get(users::get_profile))
        .route("/api/communities", get(communities::list_communities))
        .route("/api/communities/{id}", get(communities::get_community))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/{id}", axum::routing::delete(posts::delete_post))
        .route("/api/posts/{id}/like", put(posts::like_post))
        .route("/api/posts/{id}/comment", post(posts::add_comment))
        .route(
            "/api/posts/{id}/comments/{comment_id}",
            put(posts::update_comment).delete(posts::delete_comment),
        )
        .route("/api/users/profile", put(users::update_profile))
        .route("/api/users/{username}/follow", post(users::toggle_follow))
        .route("/api/communities", post(communities::create_community))
        .route("/api/communities/{id}/join", post(communities::join_community))
        .route("/api/communities/{id}/leave", post(communities::leave_community))
        .route("/api/communities/user/joined", get(communities::joined_communities))
        .route("/api/messages/conversations", get(messages::get_conversations))
        .route(
            "/api/messages/{id}",
            get(messages::get_messages)
                .post(messages::send_message)
                .delete(messages::delete_message),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
