use ammonia::Builder;
use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::config::*;
use crate::core::db::{self, Keyspace};
use crate::core::errors::ApiError;
use crate::core::helpers::store;
use crate::core::query_params::{get_string, parse_query_params};
use crate::feed::{compose_user_timeline, PageParams};
use crate::follow::toggle_follow;
use crate::models::models::User;

/// Strip all HTML; usernames and bios are plain text.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

pub fn public_user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "bio": user.bio.as_ref().unwrap_or(&String::new()),
        "createdAt": user.created_at,
    })
}

/// Case-insensitive substring match over usernames, capped at
/// SEARCH_RESULT_LIMIT results. An empty query matches nothing.
pub fn search_by_username<S: Keyspace>(store: &S, query: &str) -> anyhow::Result<Vec<User>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for id in db::list_user_ids(store)? {
        if let Some(user) = db::load_user(store, &id)? {
            if user.username.to_lowercase().contains(&needle) {
                matches.push(user);
                if matches.len() >= SEARCH_RESULT_LIMIT {
                    break;
                }
            }
        }
    }
    Ok(matches)
}

// === HTTP handlers ===

pub fn search_users(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let params = parse_query_params(req.uri());
    let query = get_string(&params, "q", Some("")).unwrap_or_default();

    let users = search_by_username(&store, &query)?;
    let body: Vec<_> = users.iter().map(public_user_json).collect();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&body)?)
        .build())
}

/// GET /api/users/:username — profile with relation counts and the user's
/// posts, newest first. `isFollowing` is included for authenticated viewers.
pub fn get_user_profile(req: Request, username: &str) -> anyhow::Result<Response> {
    let store = store();
    let viewer = validate_token(&req);

    let Some(user) = db::find_user_by_username(&store, username)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let posts = match compose_user_timeline(&store, &user.id, viewer.as_deref(), PageParams::all())
    {
        Ok(posts) => posts,
        Err(err) => return Ok(err.into()),
    };

    let mut profile = public_user_json(&user);
    profile["followersCount"] = user.followers.len().into();
    profile["followingCount"] = user.following.len().into();
    profile["postsCount"] = posts.len().into();
    if let Some(viewer_id) = &viewer {
        profile["isFollowing"] = user.followers.contains(viewer_id).into();
    }

    let body = serde_json::json!({ "user": profile, "posts": posts });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&body)?)
        .build())
}

/// PUT /api/users/me — bio is the only mutable profile field.
pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let Some(mut user) = db::load_user(&store, &user_id)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    if let Some(bio) = value["bio"].as_str() {
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()).into());
        }
        let sanitized = sanitize_text(bio);
        user.bio = if sanitized.is_empty() { None } else { Some(sanitized) };
    }

    db::save_user(&store, &user)?;

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&public_user_json(&user))?)
        .build())
}

/// POST /api/users/:username/follow — toggle semantics; the response carries
/// the resulting state.
pub fn handle_follow(req: Request, username: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    match toggle_follow(&store, &user_id, username) {
        Ok(outcome) => {
            let body = serde_json::json!({
                "isFollowing": outcome.is_following,
                "message": outcome.message,
            });
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&body)?)
                .build())
        }
        Err(err) => Ok(err.into()),
    }
}
