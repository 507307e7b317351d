use spin_sdk::http::{Request, Response};

use crate::auth::validate_token;
use crate::core::db;
use crate::core::errors::ApiError;
use crate::core::helpers::{store, validate_uuid};
use crate::core::query_params::parse_query_params;
use crate::engagement;
use crate::feed::{self, PageParams};

fn json_response(status: u16, body: &impl serde::Serialize) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}

pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = serde_json::from_slice(req.body())?;
    let content = value["content"].as_str().unwrap_or_default();

    match engagement::create_post(&store, &user_id, content) {
        Ok(post) => match feed::annotate(&store, &post, Some(&user_id))? {
            Some(view) => json_response(201, &view),
            None => Ok(ApiError::NotFound("User not found".to_string()).into()),
        },
        Err(err) => Ok(err.into()),
    }
}

/// GET /api/posts/feed — the viewer's own posts plus followed authors.
pub fn get_feed(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let page = PageParams::from_query(&parse_query_params(req.uri()));

    match feed::compose_feed(&store, &user_id, page) {
        Ok(views) => json_response(200, &views),
        Err(err) => Ok(err.into()),
    }
}

/// GET /api/posts — public timeline, no auth required. A valid bearer token
/// still upgrades the response with isLiked annotations.
pub fn list_posts(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let viewer = validate_token(&req);
    let page = PageParams::from_query(&parse_query_params(req.uri()));

    match feed::compose_public_timeline(&store, viewer.as_deref(), page) {
        Ok(views) => json_response(200, &views),
        Err(err) => Ok(err.into()),
    }
}

pub fn get_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    if !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Invalid post ID".to_string()).into());
    }

    let store = store();
    let viewer = validate_token(&req);

    match engagement::get_post(&store, post_id) {
        Ok(post) => match feed::annotate(&store, &post, viewer.as_deref())? {
            Some(view) => json_response(200, &view),
            None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
        },
        Err(err) => Ok(err.into()),
    }
}

pub fn toggle_like(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };
    if !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Invalid post ID".to_string()).into());
    }

    let store = store();
    match engagement::toggle_like(&store, &user_id, post_id) {
        Ok((post, _is_liked)) => match feed::annotate(&store, &post, Some(&user_id))? {
            Some(view) => json_response(200, &view),
            None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
        },
        Err(err) => Ok(err.into()),
    }
}

pub fn delete_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };
    if !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Invalid post ID".to_string()).into());
    }

    let store = store();
    match engagement::delete_post(&store, &user_id, post_id) {
        Ok(()) => json_response(200, &serde_json::json!({ "message": "Post deleted successfully" })),
        Err(err) => Ok(err.into()),
    }
}

/// GET /api/posts/user/:userId — a single author's posts.
pub fn list_user_posts(req: Request, author_id: &str) -> anyhow::Result<Response> {
    if !validate_uuid(author_id) {
        return Ok(ApiError::BadRequest("Invalid user ID".to_string()).into());
    }

    let store = store();
    let viewer = validate_token(&req);
    let page = PageParams::from_query(&parse_query_params(req.uri()));

    match feed::compose_user_timeline(&store, author_id, viewer.as_deref(), page) {
        Ok(views) => json_response(200, &views),
        Err(err) => Ok(err.into()),
    }
}

/// GET /api/health — store reachability without leaking internals.
pub fn health(_req: Request) -> anyhow::Result<Response> {
    let store = store();
    let database = match db::list_user_ids(&store) {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };
    json_response(
        200,
        &serde_json::json!({
            "status": "OK",
            "timestamp": crate::core::helpers::now_iso(),
            "database": database,
        }),
    )
}
