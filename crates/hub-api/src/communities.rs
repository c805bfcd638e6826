use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use hub_db::Database;
use hub_db::models::NewCommunity;
use hub_types::api::{
    CommunityDetailResponse, CommunityResponse, CreateCommunityRequest, JoinCommunityResponse,
    StatusMessage,
};
use hub_types::models::{Category, DEFAULT_COMMUNITY_IMAGE};

use crate::auth::{AppState, with_db};
use crate::convert::{
    community_response, load_communities, load_posts, parse_category, parse_id, parse_timestamp,
    summary,
};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// How many recent posts the community detail view carries.
pub const DETAIL_POST_LIMIT: u32 = 10;

/// GET /api/communities: public communities, newest first.
pub async fn list_communities(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CommunityResponse>>> {
    let communities = with_db(&state, |db| {
        let rows = db.list_public_communities()?;
        Ok(load_communities(db, rows)?)
    })
    .await?;
    Ok(Json(communities))
}

/// GET /api/communities/{id}
pub async fn get_community(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CommunityDetailResponse>> {
    let detail = with_db(&state, move |db| {
        let id = id.to_string();
        let row = db
            .get_community(&id)?
            .ok_or_else(|| ApiError::not_found("Community not found."))?;

        let members = db
            .get_members_for_communities(std::slice::from_ref(&id))?
            .into_iter()
            .map(|m| summary(&m.user_id, &m.username, &m.avatar_url))
            .collect();
        let post_rows = db.list_posts_by_community(&id, DETAIL_POST_LIMIT)?;
        let posts = load_posts(db, post_rows)?;

        Ok(CommunityDetailResponse {
            id: parse_id(&row.id),
            creator: summary(&row.creator_id, &row.creator_username, &row.creator_avatar_url),
            category: parse_category(&row.category, &row.id),
            member_count: row.member_count as usize,
            post_count: row.post_count as usize,
            members,
            posts,
            name: row.name,
            description: row.description,
            image: row.image,
            is_public: row.is_public,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
    })
    .await?;

    Ok(Json(detail))
}

/// POST /api/communities: the creator joins automatically.
pub async fn create_community(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateCommunityRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim().to_string();
    let description = req.description.trim().to_string();

    if name.is_empty() {
        return Err(ApiError::bad_request("Community name is required."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Community name cannot exceed {} characters.",
            MAX_NAME_LEN
        )));
    }
    if description.is_empty() {
        return Err(ApiError::bad_request("Community description is required."));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::bad_request(format!(
            "Description cannot exceed {} characters.",
            MAX_DESCRIPTION_LEN
        )));
    }
    let category = match req.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => raw.parse::<Category>().map_err(ApiError::bad_request)?,
        None => Category::default(),
    };
    let image = req
        .image
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .unwrap_or_else(|| DEFAULT_COMMUNITY_IMAGE.to_string());
    let is_public = req.is_public.unwrap_or(true);

    let id = Uuid::new_v4().to_string();
    let creator_id = user.id.to_string();
    let community = with_db(&state, move |db| {
        db.create_community(&NewCommunity {
            id: &id,
            name: &name,
            description: &description,
            image: &image,
            creator_id: &creator_id,
            category: category.as_str(),
            is_public,
        })?;
        fetch_community(db, &id)
    })
    .await?;

    info!("Community '{}' created by {}", community.name, user.username);
    Ok((StatusCode::CREATED, Json(community)))
}

/// POST /api/communities/{id}/join
pub async fn join_community(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<JoinCommunityResponse>> {
    let community = with_db(&state, move |db| {
        let id = id.to_string();
        if db.get_community(&id)?.is_none() {
            return Err(ApiError::not_found("Community not found."));
        }
        let added = db
            .add_member(&id, &user.id.to_string())
            .map_err(|e| ApiError::missing_on_fk(e, "Community not found."))?;
        if !added {
            return Err(ApiError::bad_request("Already a member of this community."));
        }
        fetch_community(db, &id)
    })
    .await?;

    Ok(Json(JoinCommunityResponse {
        message: "Successfully joined the community.".to_string(),
        community,
    }))
}

/// POST /api/communities/{id}/leave: a no-op for non-members.
pub async fn leave_community(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<StatusMessage>> {
    with_db(&state, move |db| {
        let id = id.to_string();
        if db.get_community(&id)?.is_none() {
            return Err(ApiError::not_found("Community not found."));
        }
        db.remove_member(&id, &user.id.to_string())?;
        Ok(())
    })
    .await?;

    Ok(Json(StatusMessage::new("Successfully left the community.")))
}

/// GET /api/communities/user/joined: communities the caller belongs to.
pub async fn joined_communities(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CommunityResponse>>> {
    let communities = with_db(&state, move |db| {
        let rows = db.list_communities_for_member(&user.id.to_string())?;
        Ok(load_communities(db, rows)?)
    })
    .await?;
    Ok(Json(communities))
}

fn fetch_community(db: &Database, id: &str) -> ApiResult<CommunityResponse> {
    let row = db
        .get_community(id)?
        .ok_or_else(|| ApiError::not_found("Community not found."))?;
    let members = db
        .get_members_for_communities(&[id.to_string()])?
        .iter()
        .map(|m| parse_id(&m.user_id))
        .collect();
    Ok(community_response(row, members))
}
