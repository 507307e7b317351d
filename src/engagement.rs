use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::config::MAX_POST_LENGTH;
use crate::core::db::{self, Keyspace};
use crate::core::errors::ApiError;
use crate::core::helpers::now_iso;
use crate::models::models::Post;

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("Regex should compile"))
}

fn filter_post_content(content: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    // Convert HTTP/HTTPS URLs into clickable links with proper escaping
    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
        })
        .to_string()
}

/// Persist a new post for the author. Content is trimmed first; the 1..=280
/// bound counts characters, not bytes.
pub fn create_post<S: Keyspace>(
    store: &S,
    author_id: &str,
    content: &str,
) -> Result<Post, ApiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }
    if trimmed.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest(
            "Content must be 280 characters or less".to_string(),
        ));
    }

    let post = Post {
        id: Uuid::new_v4().to_string(),
        author: author_id.to_string(),
        content: filter_post_content(trimmed),
        likes: Default::default(),
        created_at: now_iso(),
    };

    db::save_post(store, &post)?;
    db::index_post(store, &post.id)?;

    Ok(post)
}

/// Flip the actor's membership in the post's liked-by set. Returns the
/// updated post and whether the actor likes it after this call.
pub fn toggle_like<S: Keyspace>(
    store: &S,
    actor_id: &str,
    post_id: &str,
) -> Result<(Post, bool), ApiError> {
    let mut post = db::load_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let is_liked = if post.likes.contains(actor_id) {
        post.likes.remove(actor_id);
        false
    } else {
        post.likes.insert(actor_id.to_string());
        true
    };

    db::save_post(store, &post)?;
    Ok((post, is_liked))
}

/// Remove a post permanently. Only the author may delete it; likes live
/// embedded in the record, so nothing else needs cleanup.
pub fn delete_post<S: Keyspace>(
    store: &S,
    actor_id: &str,
    post_id: &str,
) -> Result<(), ApiError> {
    let post = db::load_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if post.author != actor_id {
        return Err(ApiError::Forbidden);
    }

    store.remove(&crate::config::post_key(post_id))?;
    db::unindex_post(store, post_id)?;
    Ok(())
}

pub fn get_post<S: Keyspace>(store: &S, post_id: &str) -> Result<Post, ApiError> {
    db::load_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::memory::{seed_user, MemoryStore};

    #[test]
    fn content_bounds_are_enforced_after_trimming() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");

        for bad in ["", "   ", "\n\t "] {
            let err = create_post(&store, &author.id, bad).unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }

        let too_long = "a".repeat(281);
        let err = create_post(&store, &author.id, &too_long).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        // 281 bytes but 280 chars wrapped in trimmable whitespace: fine.
        let edge = format!("  {}é  ", "a".repeat(279));
        let post = create_post(&store, &author.id, &edge).unwrap();
        assert_eq!(post.content.chars().count(), 280);
        assert!(post.likes.is_empty());

        let single = create_post(&store, &author.id, " x ").unwrap();
        assert_eq!(single.content, "x");
    }

    #[test]
    fn post_content_is_sanitized() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");

        let post = create_post(&store, &author.id, "hi <script>alert(1)</script>").unwrap();
        assert!(!post.content.contains("<script>"));

        let linked = create_post(&store, &author.id, "see https://example.com now").unwrap();
        assert!(linked.content.contains(r#"<a href="https://example.com""#));
    }

    #[test]
    fn toggle_like_is_its_own_inverse() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");
        let fan = seed_user(&store, "fan");
        let post = create_post(&store, &author.id, "hello").unwrap();

        let (liked, is_liked) = toggle_like(&store, &fan.id, &post.id).unwrap();
        assert!(is_liked);
        assert_eq!(liked.likes.len(), 1);

        let (unliked, is_liked) = toggle_like(&store, &fan.id, &post.id).unwrap();
        assert!(!is_liked);
        assert_eq!(unliked.likes.len(), 0);
        assert_eq!(unliked.likes, post.likes);
    }

    #[test]
    fn liking_a_missing_post_is_not_found() {
        let store = MemoryStore::new();
        let fan = seed_user(&store, "fan");
        let err = toggle_like(&store, &fan.id, &Uuid::new_v4().to_string()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn only_the_author_may_delete() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");
        let other = seed_user(&store, "other");
        let post = create_post(&store, &author.id, "mine").unwrap();

        let err = delete_post(&store, &other.id, &post.id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
        assert!(get_post(&store, &post.id).is_ok());

        delete_post(&store, &author.id, &post.id).unwrap();
        let err = get_post(&store, &post.id).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(db::list_post_ids(&store).unwrap().is_empty());
    }

    #[test]
    fn post_like_unlike_delete_scenario() {
        let store = MemoryStore::new();
        let u1 = seed_user(&store, "u1");
        let u2 = seed_user(&store, "u2");

        let post = create_post(&store, &u1.id, "hello").unwrap();
        assert_eq!(post.content, "hello");
        assert_eq!(post.likes.len(), 0);

        let (liked, is_liked) = toggle_like(&store, &u2.id, &post.id).unwrap();
        assert_eq!(liked.likes.len(), 1);
        assert!(is_liked);

        let (unliked, _) = toggle_like(&store, &u2.id, &post.id).unwrap();
        assert_eq!(unliked.likes.len(), 0);

        delete_post(&store, &u1.id, &post.id).unwrap();
        assert!(matches!(
            get_post(&store, &post.id).unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
