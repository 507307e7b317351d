use serde::Serialize;
use serde::de::DeserializeOwned;
use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::config::*;
use crate::core::helpers::{hash_password, now_iso};
use crate::models::models::{Post, User};

/// Storage handle injected into every service function. The component hands
/// in the Spin key-value store; unit tests hand in a `MemoryStore`.
pub trait Keyspace {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set_raw(key, &serde_json::to_vec(value)?)
    }
}

impl Keyspace for Store {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(Store::get(self, key)?)
    }

    fn set_raw(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(Store::set(self, key, value)?)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        Ok(Store::delete(self, key)?)
    }
}

pub fn load_user<S: Keyspace>(store: &S, user_id: &str) -> anyhow::Result<Option<User>> {
    store.get_json(&user_key(user_id))
}

pub fn save_user<S: Keyspace>(store: &S, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(&user.id), user)
}

/// Linear scan over the user index; the record count here stays small enough
/// that an exact-match scan beats maintaining a secondary index.
pub fn find_user_by_username<S: Keyspace>(
    store: &S,
    username: &str,
) -> anyhow::Result<Option<User>> {
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in ids {
        if let Some(user) = load_user(store, &id)? {
            if user.username == username {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

pub fn list_user_ids<S: Keyspace>(store: &S) -> anyhow::Result<Vec<String>> {
    Ok(store.get_json(USERS_LIST_KEY)?.unwrap_or_default())
}

pub fn register_user_id<S: Keyspace>(store: &S, user_id: &str) -> anyhow::Result<()> {
    let mut ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    ids.push(user_id.to_string());
    store.set_json(USERS_LIST_KEY, &ids)
}

pub fn load_post<S: Keyspace>(store: &S, post_id: &str) -> anyhow::Result<Option<Post>> {
    store.get_json(&post_key(post_id))
}

pub fn save_post<S: Keyspace>(store: &S, post: &Post) -> anyhow::Result<()> {
    store.set_json(&post_key(&post.id), post)
}

/// Post ids, newest first (new posts are prepended on creation).
pub fn list_post_ids<S: Keyspace>(store: &S) -> anyhow::Result<Vec<String>> {
    Ok(store.get_json(POSTS_INDEX_KEY)?.unwrap_or_default())
}

pub fn index_post<S: Keyspace>(store: &S, post_id: &str) -> anyhow::Result<()> {
    let mut ids: Vec<String> = store.get_json(POSTS_INDEX_KEY)?.unwrap_or_default();
    ids.insert(0, post_id.to_string());
    store.set_json(POSTS_INDEX_KEY, &ids)
}

pub fn unindex_post<S: Keyspace>(store: &S, post_id: &str) -> anyhow::Result<()> {
    let mut ids: Vec<String> = store.get_json(POSTS_INDEX_KEY)?.unwrap_or_default();
    ids.retain(|id| id != post_id);
    store.set_json(POSTS_INDEX_KEY, &ids)
}

/// Seed a few demo accounts and posts so a fresh deployment has something to
/// show. Runs on first request when RIPPLE_SEED_DEMO is set; a no-op once the
/// demo users exist.
pub fn init_demo_data<S: Keyspace>(store: &S) -> anyhow::Result<()> {
    if find_user_by_username(store, "alice")?.is_some() {
        return Ok(());
    }

    let mut alice = demo_user("alice", "Hello, I'm Alice!")?;
    let mut bob = demo_user("bob", "Bob's corner of the internet")?;

    // alice follows bob
    alice.following.insert(bob.id.clone());
    bob.followers.insert(alice.id.clone());

    save_user(store, &alice)?;
    register_user_id(store, &alice.id)?;
    save_user(store, &bob)?;
    register_user_id(store, &bob.id)?;

    for (author, content) in [
        (&bob, "Hey everyone! Just joined Ripple."),
        (&alice, "Excited to share thoughts here."),
        (&alice, "Just finished an amazing project. Feeling productive today!"),
    ] {
        let post = Post {
            id: Uuid::new_v4().to_string(),
            author: author.id.clone(),
            content: content.to_string(),
            likes: Default::default(),
            created_at: now_iso(),
        };
        save_post(store, &post)?;
        index_post(store, &post.id)?;
    }

    Ok(())
}

fn demo_user(username: &str, bio: &str) -> anyhow::Result<User> {
    Ok(User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password: hash_password(username)?,
        bio: Some(bio.to_string()),
        followers: Default::default(),
        following: Default::default(),
        created_at: now_iso(),
    })
}
