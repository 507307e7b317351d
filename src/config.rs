pub const MAX_POST_LENGTH: usize = 280;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;

pub const POSTS_PER_PAGE: usize = 20;
pub const SEARCH_RESULT_LIMIT: usize = 10;

pub const USERS_LIST_KEY: &str = "users_list";
pub const POSTS_INDEX_KEY: &str = "posts_index";

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn post_key(post_id: &str) -> String {
    format!("post:{}", post_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("RIPPLE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn seed_demo_data() -> bool {
    std::env::var("RIPPLE_SEED_DEMO")
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
