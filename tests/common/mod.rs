#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use skillswap::{
    AppState, Config, app,
    db::{self, PublicUser},
    directory::{self, NewUser},
};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

pub async fn pool() -> SqlitePool {
    db::connect_in_memory().await.expect("in-memory database")
}

/// A real multi-connection pool over a temporary database file. Keep the
/// directory alive for as long as the pool is used.
pub async fn file_pool(config: Config) -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("skillswap.db").display()),
        ..config
    };
    let db_pool = db::connect(&config).await.expect("file database");
    (dir, db_pool)
}

pub fn new_user(name: &str, offered: &[&str], desired: &[&str]) -> NewUser {
    NewUser {
        name: name.to_owned(),
        email: format!("{}@pesu.ac.in", name.to_lowercase()),
        password_hash: "$argon2id$placeholder".to_owned(),
        bio: String::new(),
        offered_skills: offered.iter().map(|s| s.to_string()).collect(),
        desired_skills: desired.iter().map(|s| s.to_string()).collect(),
        is_admin: false,
        verified: false,
    }
}

pub async fn user(db_pool: &SqlitePool, name: &str, offered: &[&str], desired: &[&str]) -> PublicUser {
    directory::create_user(db_pool, new_user(name, offered, desired))
        .await
        .expect("create user")
}

/// Drives the router in-process, carrying the session cookie between calls.
pub struct Client {
    pub app: Router,
    pub cookie: Option<String>,
}

impl Client {
    pub async fn new() -> Self {
        Self::with_pool(pool().await)
    }

    pub fn with_pool(db_pool: SqlitePool) -> Self {
        Self::with_state(AppState::new(db_pool, Config::default()))
    }

    pub fn with_state(app_state: AppState) -> Self {
        Self {
            app: app(app_state),
            cookie: None,
        }
    }

    pub fn with_app(app: &Router) -> Self {
        Self {
            app: app.clone(),
            cookie: None,
        }
    }

    pub async fn call(&mut self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_owned();
            self.cookie = Some(pair);
        }

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn register(&mut self, name: &str, offered: &[&str], desired: &[&str]) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/register",
                Some(json!({
                    "name": name,
                    "email": format!("{}@pesu.ac.in", name.to_lowercase()),
                    "password": "demo123",
                    "offeredSkills": offered,
                    "desiredSkills": desired,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["user"]["id"].as_str().unwrap().to_owned()
    }

    pub async fn login(&mut self, email: &str, password: &str) {
        let (status, body) = self
            .call("POST", "/api/auth/login", Some(json!({ "email": email, "password": password })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Registers two users, has the first send a request and the second
    /// accept it. Returns `(first_id, second_id, request_id, chat_id)`.
    pub async fn connect_pair(first: &mut Client, second: &mut Client, names: (&str, &str)) -> (String, String, String, String) {
        let first_id = first.register(names.0, &["Python"], &["React.js"]).await;
        let second_id = second.register(names.1, &["React.js"], &["Python"]).await;

        let (status, body) = first
            .call("POST", "/api/requests/send", Some(json!({ "toUserId": second_id })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let request_id = body["request"]["id"].as_str().unwrap().to_owned();

        let (status, _) = second
            .call("PUT", &format!("/api/requests/{request_id}/accept"), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = first.call("GET", "/api/chats", None).await;
        let chat_id = body["chats"][0]["id"].as_str().unwrap().to_owned();
        (first_id, second_id, request_id, chat_id)
    }
}
