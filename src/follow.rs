use crate::core::db::{self, Keyspace};
use crate::core::errors::ApiError;

#[derive(Debug)]
pub struct FollowOutcome {
    pub is_following: bool,
    pub message: &'static str,
}

/// Toggle the follow relation between the actor and the named user.
///
/// Both records are updated as one unit of work from the caller's point of
/// view: the actor is written first, and if persisting the target fails the
/// actor's previous record is restored so readers never observe a one-sided
/// relation.
pub fn toggle_follow<S: Keyspace>(
    store: &S,
    actor_id: &str,
    target_username: &str,
) -> Result<FollowOutcome, ApiError> {
    let mut target = db::find_user_by_username(store, target_username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if target.id == actor_id {
        return Err(ApiError::SelfFollow);
    }

    let mut actor = db::load_user(store, actor_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let was_following = actor.following.contains(&target.id);
    let actor_before = actor.clone();

    if was_following {
        actor.following.remove(&target.id);
        target.followers.remove(actor_id);
    } else {
        actor.following.insert(target.id.clone());
        target.followers.insert(actor_id.to_string());
    }

    db::save_user(store, &actor)?;
    if let Err(err) = db::save_user(store, &target) {
        let _ = db::save_user(store, &actor_before);
        return Err(err.into());
    }

    Ok(FollowOutcome {
        is_following: !was_following,
        message: if was_following {
            "Unfollowed successfully"
        } else {
            "Followed successfully"
        },
    })
}

pub fn is_following<S: Keyspace>(
    store: &S,
    actor_id: &str,
    target_id: &str,
) -> anyhow::Result<bool> {
    Ok(db::load_user(store, actor_id)?
        .map(|u| u.following.contains(target_id))
        .unwrap_or(false))
}
