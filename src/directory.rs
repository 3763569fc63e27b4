use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool, types::Json};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    db::{self, PUBLIC_USER_COLUMNS, PublicUser, User},
    error::{CoreError, CoreResult},
};

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub offered_skills: Vec<String>,
    pub desired_skills: Vec<String>,
    pub is_admin: bool,
    pub verified: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub offered_skills: Option<Vec<String>>,
    pub desired_skills: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    pub requests: u64,
    pub chats: u64,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_user(db_pool: &SqlitePool, id: Uuid) -> CoreResult<Option<User>> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(db_pool)
        .await?)
}

pub async fn find_by_email(db_pool: &SqlitePool, email: &str) -> CoreResult<Option<User>> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE email=?")
        .bind(normalize_email(email))
        .fetch_optional(db_pool)
        .await?)
}

pub async fn find_public(db_pool: &SqlitePool, id: Uuid) -> CoreResult<Option<PublicUser>> {
    Ok(
        sqlx::query_as(&format!("SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id=?"))
            .bind(id)
            .fetch_optional(db_pool)
            .await?,
    )
}

/// Every user except `actor`, in directory (registration) order.
pub async fn list_others(db_pool: &SqlitePool, actor: Uuid) -> CoreResult<Vec<PublicUser>> {
    Ok(sqlx::query_as(&format!(
        "SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE id<>? ORDER BY rowid"
    ))
    .bind(actor)
    .fetch_all(db_pool)
    .await?)
}

pub async fn list_newest_first(db_pool: &SqlitePool) -> CoreResult<Vec<PublicUser>> {
    Ok(sqlx::query_as(&format!(
        "SELECT {PUBLIC_USER_COLUMNS} FROM users ORDER BY rowid DESC"
    ))
    .fetch_all(db_pool)
    .await?)
}

pub async fn create_user(db_pool: &SqlitePool, new_user: NewUser) -> CoreResult<PublicUser> {
    let name = new_user.name.trim();
    let email = normalize_email(&new_user.email);
    if name.is_empty() || email.is_empty() || new_user.password_hash.is_empty() {
        return Err(CoreError::Validation(
            "please provide all required fields".to_owned(),
        ));
    }

    if find_by_email(db_pool, &email).await?.is_some() {
        return Err(CoreError::Conflict("email already registered".to_owned()));
    }

    let user = User {
        id: Uuid::now_v7(),
        name: name.to_owned(),
        email,
        password_hash: new_user.password_hash,
        bio: new_user.bio,
        offered_skills: new_user.offered_skills,
        desired_skills: new_user.desired_skills,
        is_admin: new_user.is_admin,
        verified: new_user.verified,
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query("INSERT INTO users (id,name,email,password_hash,bio,offered_skills,desired_skills,is_admin,verified,created_at) VALUES (?,?,?,?,?,?,?,?,?,?)")
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(Json(&user.offered_skills))
        .bind(Json(&user.desired_skills))
        .bind(user.is_admin)
        .bind(user.verified)
        .bind(user.created_at)
        .execute(db_pool)
        .await
        .map_err(|err| match CoreError::from(err) {
            CoreError::Conflict(_) => CoreError::Conflict("email already registered".to_owned()),
            other => other,
        })?;

    info!(user_id = %user.id, email = %user.email, "registered user");
    Ok(user.into())
}

/// Applies the provided fields; absent fields keep their stored value.
/// Skill lists are stored exactly as given, duplicates and order included.
pub async fn update_profile(
    db_pool: &SqlitePool,
    id: Uuid,
    update: ProfileUpdate,
) -> CoreResult<PublicUser> {
    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("name must not be empty".to_owned()));
        }
    }

    let result = sqlx::query(
        "UPDATE users SET
            name=COALESCE(?,name),
            bio=COALESCE(?,bio),
            offered_skills=COALESCE(?,offered_skills),
            desired_skills=COALESCE(?,desired_skills)
        WHERE id=?",
    )
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.bio)
    .bind(update.offered_skills.map(Json))
    .bind(update.desired_skills.map(Json))
    .bind(id)
    .execute(db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound("user"));
    }

    find_public(db_pool, id).await?.ok_or(CoreError::NotFound("user"))
}

pub async fn set_verified(db_pool: &SqlitePool, id: Uuid) -> CoreResult<PublicUser> {
    let result = sqlx::query("UPDATE users SET verified=TRUE WHERE id=?")
        .bind(id)
        .execute(db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound("user"));
    }

    info!(user_id = %id, "verified user");
    find_public(db_pool, id).await?.ok_or(CoreError::NotFound("user"))
}

/// Deletes the user together with every request and chat referencing them,
/// all inside one transaction.
pub async fn delete_user(db_pool: &SqlitePool, id: Uuid) -> CoreResult<CascadeReport> {
    let mut tx = db::begin_write(db_pool).await?;

    if sqlx::query("SELECT 1 FROM users WHERE id=?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .is_none()
    {
        return Err(CoreError::NotFound("user"));
    }

    let report = on_user_deleted(&mut tx, id).await?;

    sqlx::query("DELETE FROM users WHERE id=?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        user_id = %id,
        requests = report.requests,
        chats = report.chats,
        "deleted user"
    );
    Ok(report)
}

/// Removes every request and chat (messages included) that references `user_id`.
pub async fn on_user_deleted(conn: &mut SqliteConnection, user_id: Uuid) -> CoreResult<CascadeReport> {
    let requests = sqlx::query("DELETE FROM connection_requests WHERE from_id=? OR to_id=?")
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    // messages go with their chat via ON DELETE CASCADE
    let chats = sqlx::query("DELETE FROM chats WHERE user_low=? OR user_high=?")
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(CascadeReport { requests, chats })
}
