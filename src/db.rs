use std::{future::Future, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use sqlx::{
    Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{CoreError, CoreResult},
};

/// Columns of `users` that are safe to hand to other users.
pub(crate) const PUBLIC_USER_COLUMNS: &str =
    "id,name,email,bio,offered_skills,desired_skills,is_admin,verified,created_at";

/// Full user record, credential hash included. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    #[sqlx(json)]
    pub offered_skills: Vec<String>,
    #[sqlx(json)]
    pub desired_skills: Vec<String>,
    pub is_admin: bool,
    pub verified: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: String,
    #[sqlx(json)]
    pub offered_skills: Vec<String>,
    #[sqlx(json)]
    pub desired_skills: Vec<String>,
    pub is_admin: bool,
    pub verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            bio: user.bio,
            offered_skills: user.offered_skills,
            desired_skills: user.desired_skills,
            is_admin: user.is_admin,
            verified: user.verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: Uuid,
    #[serde(rename = "from")]
    pub from_id: Uuid,
    #[serde(rename = "to")]
    pub to_id: Uuid,
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A chat row. Participants are stored as an ordered (low, high) pair so the
/// unordered pair has a single representation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ChatRow {
    pub id: Uuid,
    pub user_low: Uuid,
    pub user_high: Uuid,
    pub created_at: OffsetDateTime,
}

impl ChatRow {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub text: String,
    pub created_at: OffsetDateTime,
}

pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

pub async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.storage_timeout);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.storage_timeout)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&db_pool).await?;
    Ok(db_pool)
}

/// Single-connection in-memory database with the schema applied.
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // every connection to :memory: is its own database, so keep exactly one alive
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&db_pool).await?;
    Ok(db_pool)
}

/// `BEGIN IMMEDIATE`: contending writers queue on `busy_timeout` instead of
/// failing the read-to-write lock upgrade.
pub async fn begin_write(db_pool: &SqlitePool) -> CoreResult<Transaction<'static, Sqlite>> {
    Ok(db_pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Runs a read under the storage deadline; expiry is [`CoreError::Transient`].
/// Writes stay off this path since a cancelled commit may still land.
pub async fn bounded<T, F>(limit: Duration, op: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Transient(format!(
            "storage call exceeded {}ms",
            limit.as_millis()
        ))),
    }
}
