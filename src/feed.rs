use serde::Serialize;
use std::collections::HashMap;

use crate::config::POSTS_PER_PAGE;
use crate::core::db::{self, Keyspace};
use crate::core::errors::ApiError;
use crate::core::query_params::get_positive_int;
use crate::models::models::{Post, User};

#[derive(Serialize, Clone, Debug)]
pub struct AuthorView {
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
}

/// Read-time projection of a post: author join plus like annotations.
/// `is_liked` is present only when composed for an authenticated viewer.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub content: String,
    pub author: AuthorView,
    pub created_at: String,
    pub likes_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

#[derive(Clone, Copy)]
pub struct PageParams {
    pub page: usize,
    pub limit: usize,
}

impl PageParams {
    /// Missing or invalid values fall back to page 1 / 20 per page.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        Self {
            page: get_positive_int(params, "page", 1),
            limit: get_positive_int(params, "limit", POSTS_PER_PAGE),
        }
    }

    pub fn all() -> Self {
        Self { page: 1, limit: usize::MAX }
    }

    // page and limit come straight from the query string; saturate instead
    // of overflowing on absurd values.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Newest first; ties on created_at fall back to id so pagination stays
/// deterministic across pages.
fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub fn project(post: &Post, author: &User, viewer: Option<&str>) -> PostView {
    PostView {
        id: post.id.clone(),
        content: post.content.clone(),
        author: AuthorView {
            id: author.id.clone(),
            username: author.username.clone(),
            bio: author.bio.clone(),
        },
        created_at: post.created_at.clone(),
        likes_count: post.likes.len(),
        is_liked: viewer.map(|v| post.likes.contains(v)),
    }
}

/// Join the author record onto a post. Posts whose author record is gone are
/// dropped from listings rather than failing the whole page.
pub fn annotate<S: Keyspace>(
    store: &S,
    post: &Post,
    viewer: Option<&str>,
) -> anyhow::Result<Option<PostView>> {
    Ok(db::load_user(store, &post.author)?.map(|author| project(post, &author, viewer)))
}

fn compose<S: Keyspace, F: Fn(&Post) -> bool>(
    store: &S,
    viewer: Option<&str>,
    page: PageParams,
    include: F,
) -> Result<Vec<PostView>, ApiError> {
    let mut posts = Vec::new();
    for id in db::list_post_ids(store)? {
        if let Some(post) = db::load_post(store, &id)? {
            if include(&post) {
                posts.push(post);
            }
        }
    }

    sort_newest_first(&mut posts);

    let mut views = Vec::new();
    for post in posts.into_iter().skip(page.offset()).take(page.limit) {
        if let Some(view) = annotate(store, &post, viewer)? {
            views.push(view);
        }
    }
    Ok(views)
}

/// Posts by the viewer and everyone they follow, newest first.
pub fn compose_feed<S: Keyspace>(
    store: &S,
    viewer_id: &str,
    page: PageParams,
) -> Result<Vec<PostView>, ApiError> {
    let viewer = db::load_user(store, viewer_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let mut authors = viewer.following.clone();
    authors.insert(viewer.id.clone());

    compose(store, Some(viewer_id), page, |post| {
        authors.contains(&post.author)
    })
}

pub fn compose_public_timeline<S: Keyspace>(
    store: &S,
    viewer: Option<&str>,
    page: PageParams,
) -> Result<Vec<PostView>, ApiError> {
    compose(store, viewer, page, |_| true)
}

/// Timeline of a single author, resolved by id.
pub fn compose_user_timeline<S: Keyspace>(
    store: &S,
    author_id: &str,
    viewer: Option<&str>,
    page: PageParams,
) -> Result<Vec<PostView>, ApiError> {
    if db::load_user(store, author_id)?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    compose(store, viewer, page, |post| post.author == author_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::memory::{seed_post, seed_user, MemoryStore};
    use crate::follow::toggle_follow;

    #[test]
    fn feed_is_empty_for_isolated_user() {
        let store = MemoryStore::new();
        let lone = seed_user(&store, "lone");
        let other = seed_user(&store, "other");
        seed_post(&store, &other, "unseen", "2024-05-01T10:00:00+00:00");

        let feed = compose_feed(&store, &lone.id, PageParams::all()).unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn feed_follows_the_social_graph() {
        let store = MemoryStore::new();
        let u1 = seed_user(&store, "u1");
        let u2 = seed_user(&store, "u2");
        seed_post(&store, &u2, "older", "2024-05-01T10:00:00+00:00");
        seed_post(&store, &u2, "newer", "2024-05-02T10:00:00+00:00");
        seed_post(&store, &u1, "mine", "2024-05-03T10:00:00+00:00");

        toggle_follow(&store, &u1.id, "u2").unwrap();

        let feed = compose_feed(&store, &u1.id, PageParams::all()).unwrap();
        let contents: Vec<_> = feed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["mine", "newer", "older"]);

        // Unfollowing removes u2's posts from the feed but not from the
        // public timeline.
        toggle_follow(&store, &u1.id, "u2").unwrap();
        let feed = compose_feed(&store, &u1.id, PageParams::all()).unwrap();
        let contents: Vec<_> = feed.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["mine"]);

        let public = compose_public_timeline(&store, None, PageParams::all()).unwrap();
        assert_eq!(public.len(), 3);
    }

    #[test]
    fn pagination_returns_the_second_newest_post() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");
        seed_post(&store, &author, "first", "2024-05-01T10:00:00+00:00");
        seed_post(&store, &author, "second", "2024-05-02T10:00:00+00:00");
        seed_post(&store, &author, "third", "2024-05-03T10:00:00+00:00");

        let page = PageParams { page: 2, limit: 1 };
        let views = compose_user_timeline(&store, &author.id, None, page).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].content, "second");
    }

    #[test]
    fn equal_timestamps_paginate_without_overlap() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");
        let ts = "2024-05-01T10:00:00+00:00";
        for i in 0..4 {
            seed_post(&store, &author, &format!("p{}", i), ts);
        }

        let mut seen = Vec::new();
        for page in 1..=4 {
            let views =
                compose_public_timeline(&store, None, PageParams { page, limit: 1 }).unwrap();
            assert_eq!(views.len(), 1);
            seen.push(views[0].id.clone());
        }
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4, "pages must not overlap on equal timestamps");
    }

    #[test]
    fn huge_page_numbers_yield_an_empty_page_not_a_panic() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");
        seed_post(&store, &author, "hi", "2024-05-01T10:00:00+00:00");

        let params = crate::core::query_params::parse_query_params(
            "/api/posts?page=18446744073709551615&limit=20",
        );
        let page = PageParams::from_query(&params);
        assert_eq!(page.offset(), usize::MAX);

        let views = compose_public_timeline(&store, None, page).unwrap();
        assert!(views.is_empty());
    }

    #[test]
    fn user_timeline_requires_an_existing_user() {
        let store = MemoryStore::new();
        let ghost_id = uuid::Uuid::new_v4().to_string();
        let err = compose_user_timeline(&store, &ghost_id, None, PageParams::all()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn annotations_reflect_the_viewer() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author");
        let fan = seed_user(&store, "fan");
        let mut post = seed_post(&store, &author, "hi", "2024-05-01T10:00:00+00:00");
        post.likes.insert(fan.id.clone());
        db::save_post(&store, &post).unwrap();

        let for_fan = compose_public_timeline(&store, Some(&fan.id), PageParams::all()).unwrap();
        assert_eq!(for_fan[0].likes_count, 1);
        assert_eq!(for_fan[0].is_liked, Some(true));

        let for_author =
            compose_public_timeline(&store, Some(&author.id), PageParams::all()).unwrap();
        assert_eq!(for_author[0].is_liked, Some(false));

        let anonymous = compose_public_timeline(&store, None, PageParams::all()).unwrap();
        assert_eq!(anonymous[0].is_liked, None);
    }
}
