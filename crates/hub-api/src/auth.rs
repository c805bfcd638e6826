use std::sync::{Arc, LazyLock};

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use regex::Regex;
use tracing::{error, info};
use uuid::Uuid;

use hub_db::Database;
use hub_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use hub_types::models::DEFAULT_AVATAR_URL;

use crate::convert::parse_id;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Names that collide with static `/api/users/...` routes.
const RESERVED_USERNAMES: &[&str] = &["profile"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("email pattern compiles")
});

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Run blocking DB work off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Please provide all required fields."));
    }
    validate_username(&username)?;
    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::bad_request("Please add a valid email."));
    }
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let (uid, name, mail) = (user_id.to_string(), username.clone(), email.clone());
    with_db(&state, move |db| {
        if db.get_user_by_email(&mail)?.is_some() {
            return Err(ApiError::conflict("User with this email already exists."));
        }
        if db.get_user_by_username(&name)?.is_some() {
            return Err(ApiError::conflict("Username is already taken."));
        }
        db.create_user(&uid, &name, &mail, &password_hash, DEFAULT_AVATAR_URL)
            .map_err(|e| {
                // Lost a race with a concurrent registration
                if hub_db::is_unique_violation(&e) {
                    ApiError::conflict("User with this email already exists.")
                } else {
                    ApiError::Internal(e)
                }
            })
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, &username)?;
    info!("Registered user {} ({})", username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user_id,
            username,
            email,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let user = with_db(&state, move |db| Ok(db.get_user_by_email(&email)?))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password."))?;

    verify_password(&req.password, &user.password)?;

    let user_id = parse_id(&user.id);
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(AuthResponse {
        id: user_id,
        username: user.username,
        email: user.email,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> ApiResult<()> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized("Invalid email or password."))
}

pub fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::bad_request("Username must be between 3 and 32 characters."));
    }
    if RESERVED_USERNAMES.iter().any(|r| r.eq_ignore_ascii_case(username)) {
        return Err(ApiError::bad_request("That username is reserved."));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::decode_token;

    #[test]
    fn email_pattern() {
        assert!(EMAIL_RE.is_match("alice@x.com"));
        assert!(EMAIL_RE.is_match("first.last@mail.example.org"));
        assert!(!EMAIL_RE.is_match("alice"));
        assert!(!EMAIL_RE.is_match("alice@x"));
        assert!(!EMAIL_RE.is_match("@x.com"));
    }

    #[test]
    fn token_roundtrip() {
        let id = Uuid::new_v4();
        let token = create_token("secret", id, "alice").unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).is_ok());
        assert!(verify_password("secret2", &hash).is_err());
    }

    #[test]
    fn length_rules() {
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("profile").is_err());
        assert!(validate_username("Profile").is_err());
        assert!(validate_username("profiles").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("secret1").is_ok());
    }
}
