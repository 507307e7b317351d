use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub bio: Option<String>,
    // Invariant: A in B.followers iff B in A.following. Both sides are
    // kept on the records themselves and only mutated through
    // follow::toggle_follow.
    #[serde(default)]
    pub followers: BTreeSet<String>,
    #[serde(default)]
    pub following: BTreeSet<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    // Liked-by set: each user appears at most once, count is derived.
    #[serde(default)]
    pub likes: BTreeSet<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}
