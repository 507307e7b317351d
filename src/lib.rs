use spin_sdk::http::{Request, Response};
#[cfg(target_arch = "wasm32")]
use spin_sdk::http::IntoResponse;
#[cfg(target_arch = "wasm32")]
use spin_sdk::http_component;

pub mod auth;
pub mod config;
pub mod engagement;
pub mod feed;
pub mod follow;
pub mod posts;
pub mod users;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod query_params;
    pub mod static_server;
}

pub mod models {
    pub mod models;
}

use crate::core::errors::ApiError;
use crate::core::helpers::store;

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .unwrap_or(std::borrow::Cow::Borrowed(segment))
        .to_string()
}

/// Route a request to its handler. Shared by the Spin component entrypoint
/// and the native adapter binary.
pub fn route(req: Request) -> anyhow::Result<Response> {
    if config::seed_demo_data() {
        let _ = core::db::init_demo_data(&store());
    }

    let method = req.method().to_string();
    let path = req.path().to_string();

    match (method.as_str(), path.as_str()) {
        ("POST", "/api/auth/register") => auth::register_user(req),
        ("POST", "/api/auth/login") => auth::login_user(req),
        ("POST", "/api/auth/logout") => auth::logout_user(req),
        ("GET", "/api/auth/me") => auth::get_current_user(req),

        ("POST", "/api/posts") => posts::create_post(req),
        ("GET", "/api/posts/feed") => posts::get_feed(req),
        ("GET", "/api/posts") => posts::list_posts(req),
        ("GET", p) if p.starts_with("/api/posts/user/") => {
            let id = p.trim_start_matches("/api/posts/user/").to_string();
            posts::list_user_posts(req, &id)
        }
        ("POST", p) if p.starts_with("/api/posts/") && p.ends_with("/like") => {
            let id = p
                .trim_start_matches("/api/posts/")
                .trim_end_matches("/like")
                .to_string();
            posts::toggle_like(req, &id)
        }
        ("GET", p) if p.starts_with("/api/posts/") => {
            let id = p.trim_start_matches("/api/posts/").to_string();
            posts::get_post(req, &id)
        }
        ("DELETE", p) if p.starts_with("/api/posts/") => {
            let id = p.trim_start_matches("/api/posts/").to_string();
            posts::delete_post(req, &id)
        }

        ("GET", "/api/users/search") => users::search_users(req),
        ("PUT", "/api/users/me") => users::update_profile(req),
        ("POST", p) if p.starts_with("/api/users/") && p.ends_with("/follow") => {
            let username = decode_segment(
                p.trim_start_matches("/api/users/").trim_end_matches("/follow"),
            );
            users::handle_follow(req, &username)
        }
        ("GET", p) if p.starts_with("/api/users/") => {
            let username = decode_segment(p.trim_start_matches("/api/users/"));
            users::get_user_profile(req, &username)
        }

        ("GET", "/api/health") => posts::health(req),

        (_, p) if p.starts_with("/api/") => {
            Ok(ApiError::NotFound("API endpoint not found".to_string()).into())
        }
        // Everything else is the browser client; unknown non-asset paths
        // fall back to index.html.
        ("GET", p) => {
            core::static_server::serve_static(p).or_else(|_| core::static_server::serve_static("/"))
        }
        _ => Ok(ApiError::NotFound("No route found".to_string()).into()),
    }
}

#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    route(req)
}
