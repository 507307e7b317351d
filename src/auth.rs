use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::*;
use crate::core::db::{self, Keyspace};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, store, verify_password};
use crate::models::models::{TokenData, User};
use crate::users::{public_user_json, sanitize_text};

fn issue_token<S: Keyspace>(store: &S, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;
    Ok(token)
}

pub fn register_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let body: serde_json::Value = serde_json::from_slice(req.body())?;
    let username = body["username"].as_str().unwrap_or("");
    let password = body["password"].as_str().unwrap_or("");

    if username.is_empty() {
        return Ok(ApiError::BadRequest("Username is required".to_string()).into());
    }
    if username.chars().count() < MIN_USERNAME_LENGTH
        || username.chars().count() > MAX_USERNAME_LENGTH
    {
        return Ok(ApiError::BadRequest("Username must be 3-50 characters".to_string()).into());
    }
    if password.is_empty() {
        return Ok(ApiError::BadRequest("Password is required".to_string()).into());
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Ok(ApiError::BadRequest("Password must be at least 3 characters".to_string()).into());
    }

    // Sanitize username at input time
    let sanitized_username = sanitize_text(username);

    if db::find_user_by_username(&store, &sanitized_username)?.is_some() {
        return Ok(ApiError::Conflict("Username exists".to_string()).into());
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: sanitized_username,
        password: hash_password(password)?,
        bio: None,
        followers: Default::default(),
        following: Default::default(),
        created_at: now_iso(),
    };

    db::save_user(&store, &user)?;
    db::register_user_id(&store, &user.id)?;

    let token = issue_token(&store, &user.id)?;
    let resp = serde_json::json!({
        "token": token,
        "user": public_user_json(&user),
    });

    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn login_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let creds: serde_json::Value = serde_json::from_slice(req.body())?;
    let username = creds["username"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    if let Some(user) = db::find_user_by_username(&store, username)? {
        if verify_password(password, &user.password) {
            let token = issue_token(&store, &user.id)?;
            let resp = serde_json::json!({
                "token": token,
                "user": public_user_json(&user),
            });
            return Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build());
        }
    }

    Ok(ApiError::Unauthorized.into())
}

pub fn logout_user(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let auth_header = req
        .header("Authorization")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return Ok(ApiError::Unauthorized.into());
    };
    store.remove(&token_key(token))?;

    let resp = serde_json::json!({ "message": "Logged out successfully" });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn get_current_user(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    match db::load_user(&store, &user_id)? {
        Some(user) => Ok(Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&public_user_json(&user))?)
            .build()),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

/// Resolve the bearer token to an actor id. Rejects expired tokens and
/// tokens whose user no longer exists.
pub fn validate_token(req: &Request) -> Option<String> {
    let store = store();
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    let token = auth_header.strip_prefix("Bearer ")?;
    let data = store.get_json::<TokenData>(&token_key(token)).ok()??;

    if !token_is_fresh(&data.created_at) {
        return None;
    }

    if db::load_user(&store, &data.user_id).ok()?.is_none() {
        return None;
    }
    Some(data.user_id)
}

/// A token is fresh while its age is within the configured expiry window.
/// A mangled timestamp counts as expired.
fn token_is_fresh(created_at: &str) -> bool {
    match chrono::DateTime::parse_from_rfc3339(created_at) {
        Ok(created) => {
            let age_hours =
                (chrono::Utc::now() - created.with_timezone(&chrono::Utc)).num_hours();
            age_hours <= token_expiration_hours()
        }
        Err(_) => false,
    }
}
