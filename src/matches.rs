use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::PublicUser,
    directory,
    error::{CoreError, CoreResult},
};

/// `candidate` matches when it offers something `requester` wants, or wants
/// something `requester` offers. Skills compare as exact strings.
pub fn is_match(requester: &PublicUser, candidate: &PublicUser) -> bool {
    intersects(&candidate.offered_skills, &requester.desired_skills)
        || intersects(&candidate.desired_skills, &requester.offered_skills)
}

fn intersects(a: &[String], b: &[String]) -> bool {
    a.iter().any(|skill| b.contains(skill))
}

pub async fn get_matches(db_pool: &SqlitePool, actor: Uuid) -> CoreResult<Vec<PublicUser>> {
    let requester = directory::find_public(db_pool, actor)
        .await?
        .ok_or(CoreError::NotFound("user"))?;

    let matches: Vec<PublicUser> = directory::list_others(db_pool, actor)
        .await?
        .into_iter()
        .filter(|candidate| is_match(&requester, candidate))
        .collect();

    debug!(user_id = %actor, matches = matches.len(), "computed matches");
    Ok(matches)
}
