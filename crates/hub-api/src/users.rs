use axum::{
    Extension, Json,
    extract::State,
};
use tracing::info;

use hub_types::api::{FollowResponse, ProfileResponse, UpdateProfileRequest, UpdatedProfileResponse};

use crate::auth::{AppState, hash_password, validate_password, validate_username, with_db};
use crate::convert::{load_posts, parse_id};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;

pub const MAX_BIO_LEN: usize = 160;

/// GET /api/users/{username}: public profile with the user's posts, newest first.
pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = with_db(&state, move |db| {
        let user = db
            .get_user_by_username(&username)?
            .ok_or_else(|| ApiError::not_found("User not found."))?;

        let followers = db.get_followers(&user.id)?;
        let following = db.get_following(&user.id)?;
        let rows = db.list_posts_by_user(&user.id)?;
        let posts = load_posts(db, rows)?;

        Ok(ProfileResponse {
            id: parse_id(&user.id),
            username: user.username,
            avatar_url: user.avatar_url,
            bio: user.bio,
            followers: followers.iter().map(|id| parse_id(id)).collect(),
            following: following.iter().map(|id| parse_id(id)).collect(),
            posts,
        })
    })
    .await?;

    Ok(Json(profile))
}

/// PUT /api/users/profile: empty or missing fields keep their current value.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UpdatedProfileResponse>> {
    let new_username = non_empty(req.username);
    let new_bio = non_empty(req.bio);
    let new_avatar = non_empty(req.avatar_url);
    let new_password = req.password.filter(|p| !p.is_empty());

    if let Some(name) = &new_username {
        validate_username(name)?;
    }
    if let Some(bio) = &new_bio {
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(ApiError::bad_request(format!(
                "Bio cannot exceed {} characters.",
                MAX_BIO_LEN
            )));
        }
    }
    let password_hash = match &new_password {
        Some(p) => {
            validate_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };

    let user_id = user.id.to_string();
    let updated = with_db(&state, move |db| {
        let current = db
            .get_user_by_id(&user_id)?
            .ok_or_else(|| ApiError::not_found("User not found."))?;

        let username = new_username.unwrap_or(current.username);
        if let Some(owner) = db.get_user_by_username(&username)? {
            if owner.id != current.id {
                return Err(ApiError::conflict("Username is already taken."));
            }
        }
        let bio = new_bio.unwrap_or(current.bio);
        let avatar_url = new_avatar.unwrap_or(current.avatar_url);

        db.update_profile(&current.id, &username, &bio, &avatar_url, password_hash.as_deref())
            .map_err(|e| {
                if hub_db::is_unique_violation(&e) {
                    ApiError::conflict("Username is already taken.")
                } else {
                    ApiError::Internal(e)
                }
            })?;

        Ok(UpdatedProfileResponse {
            id: parse_id(&current.id),
            username,
            email: current.email,
            avatar_url,
            bio,
        })
    })
    .await?;

    info!("Profile updated for {}", updated.username);
    Ok(Json(updated))
}

/// POST /api/users/{username}/follow: toggles following that user.
pub async fn toggle_follow(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<FollowResponse>> {
    let resp = with_db(&state, move |db| {
        let target = db
            .get_user_by_username(&username)?
            .ok_or_else(|| ApiError::not_found("User not found."))?;
        if parse_id(&target.id) == user.id {
            return Err(ApiError::bad_request("You cannot follow yourself."));
        }

        let following = db.toggle_follow(&user.id.to_string(), &target.id)?;
        let followers = db.get_followers(&target.id)?.len();
        Ok(FollowResponse { following, followers })
    })
    .await?;

    Ok(Json(resp))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
