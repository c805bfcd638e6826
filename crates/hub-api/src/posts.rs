use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use hub_db::Database;
use hub_types::api::{CommentRequest, CreatePostRequest, PostResponse, StatusMessage};

use crate::auth::{AppState, with_db};
use crate::convert::{load_posts, parse_id};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;

pub const MAX_CAPTION_LEN: usize = 2200;

/// GET /api/posts: every post, newest first.
pub async fn get_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = with_db(&state, |db| {
        let rows = db.list_posts()?;
        Ok(load_posts(db, rows)?)
    })
    .await?;
    Ok(Json(posts))
}

/// GET /api/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post = with_db(&state, move |db| fetch_post(db, &id.to_string())).await?;
    Ok(Json(post))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let image_url = req.image_url.trim().to_string();
    if image_url.is_empty() {
        return Err(ApiError::bad_request("Image URL is required."));
    }
    let caption = req.caption.unwrap_or_default().trim().to_string();
    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(ApiError::bad_request(format!(
            "Caption cannot exceed {} characters.",
            MAX_CAPTION_LEN
        )));
    }

    let post_id = Uuid::new_v4().to_string();
    let user_id = user.id.to_string();
    let community_id = req.community.map(|c| c.to_string());

    let post = with_db(&state, move |db| {
        if let Some(cid) = community_id.as_deref() {
            if db.get_community(cid)?.is_none() {
                return Err(ApiError::not_found("Community not found."));
            }
            if !db.is_member(cid, &user_id)? {
                return Err(ApiError::forbidden("Join the community before posting in it."));
            }
        }
        db.insert_post(&post_id, &user_id, &image_url, &caption, community_id.as_deref())
            .map_err(|e| ApiError::missing_on_fk(e, "Community not found."))?;
        fetch_post(db, &post_id)
    })
    .await?;

    info!("Post {} created by {}", post.id, user.username);
    Ok((StatusCode::CREATED, Json(post)))
}

/// DELETE /api/posts/{id}: owner only.
pub async fn delete_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<StatusMessage>> {
    with_db(&state, move |db| {
        let post = db
            .get_post(&id.to_string())?
            .ok_or_else(|| ApiError::not_found("Post not found."))?;
        if parse_id(&post.user_id) != user.id {
            return Err(ApiError::forbidden("Not authorized to delete this post."));
        }
        db.delete_post(&post.id)?;
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Post removed successfully.")))
}

/// PUT /api/posts/{id}/like: toggles the caller's like and returns the resulting like list.
pub async fn like_post(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Uuid>>> {
    let post = with_db(&state, move |db| {
        let post_id = id.to_string();
        if db.get_post(&post_id)?.is_none() {
            return Err(ApiError::not_found("Post not found."));
        }
        db.toggle_like(&post_id, &user.id.to_string())
            .map_err(|e| ApiError::missing_on_fk(e, "Post not found."))?;
        fetch_post(db, &post_id)
    })
    .await?;

    Ok(Json(post.likes))
}

/// POST /api/posts/{id}/comment: returns the post's comments, newest first.
pub async fn add_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text cannot be empty."));
    }

    let post = with_db(&state, move |db| {
        let post_id = id.to_string();
        if db.get_post(&post_id)?.is_none() {
            return Err(ApiError::not_found("Post not found."));
        }
        db.insert_comment(
            &Uuid::new_v4().to_string(),
            &post_id,
            &user.id.to_string(),
            &user.username,
            &user.avatar_url,
            &text,
        )
        .map_err(|e| ApiError::missing_on_fk(e, "Post not found."))?;
        fetch_post(db, &post_id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post.comments)))
}

/// PUT /api/posts/{id}/comments/{comment_id}: comment author only.
pub async fn update_comment(
    State(state): State<AppState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> ApiResult<Json<PostResponse>> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::bad_request("Comment text cannot be empty."));
    }

    let post = with_db(&state, move |db| {
        let (post_id, comment_id) = (id.to_string(), comment_id.to_string());
        if db.get_post(&post_id)?.is_none() {
            return Err(ApiError::not_found("Post not found."));
        }
        let comment = db
            .get_comment(&post_id, &comment_id)?
            .ok_or_else(|| ApiError::not_found("Comment not found."))?;
        if parse_id(&comment.user_id) != user.id {
            return Err(ApiError::forbidden("Not authorized to update this comment."));
        }
        db.update_comment(&post_id, &comment_id, &text)?;
        fetch_post(db, &post_id)
    })
    .await?;

    Ok(Json(post))
}

/// DELETE /api/posts/{id}/comments/{comment_id}: comment author or post owner.
pub async fn delete_comment(
    State(state): State<AppState>,
    ApiPath((id, comment_id)): ApiPath<(Uuid, Uuid)>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<StatusMessage>> {
    with_db(&state, move |db| {
        let (post_id, comment_id) = (id.to_string(), comment_id.to_string());
        let post = db
            .get_post(&post_id)?
            .ok_or_else(|| ApiError::not_found("Post not found."))?;
        let comment = db
            .get_comment(&post_id, &comment_id)?
            .ok_or_else(|| ApiError::not_found("Comment not found."))?;
        if parse_id(&comment.user_id) != user.id && parse_id(&post.user_id) != user.id {
            return Err(ApiError::forbidden("Not authorized to delete this comment."));
        }
        db.delete_comment(&post_id, &comment_id)?;
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Comment removed successfully.")))
}

/// Load one post with likes and comments, or 404.
pub(crate) fn fetch_post(db: &Database, post_id: &str) -> ApiResult<PostResponse> {
    let row = db
        .get_post(post_id)?
        .ok_or_else(|| ApiError::not_found("Post not found."))?;
    load_posts(db, vec![row])?
        .pop()
        .ok_or_else(|| ApiError::not_found("Post not found."))
}
