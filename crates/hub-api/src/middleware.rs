use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use hub_types::api::Claims;

use crate::auth::{AppState, with_db};
use crate::convert::parse_id;
use crate::error::ApiError;

/// The authenticated caller, inserted into request extensions by [`require_auth`].
/// Handlers take it as `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
}

/// Extract and validate the bearer JWT, then load the user it names.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::unauthorized("Not authorized, no token provided."))?;

    let claims = decode_token(&state.jwt_secret, bearer.token())
        .map_err(|_| ApiError::unauthorized("Not authorized, token failed."))?;

    let user_id = claims.sub.to_string();
    let user = with_db(&state, move |db| Ok(db.get_user_by_id(&user_id)?))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authorized, user not found."))?;

    req.extensions_mut().insert(AuthUser {
        id: parse_id(&user.id),
        username: user.username,
        email: user.email,
        avatar_url: user.avatar_url,
    });
    Ok(next.run(req).await)
}

pub fn decode_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
