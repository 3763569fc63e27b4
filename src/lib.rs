pub mod admin;
pub mod auth;
pub mod chats;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod matches;
pub mod notifier;
pub mod requests;
pub mod seed;
pub mod session;
pub mod unread;
pub mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::FromRef,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::{error, warn};

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use notifier::Notifier;
pub use session::AuthenticatedIdentity;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub notifier: Notifier,
    pub session_store: MemoryStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            db_pool,
            notifier: Notifier::new(config.notifier_capacity),
            session_store: MemoryStore::default(),
            config: Arc::new(config),
        }
    }
}

pub fn app(app_state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(app_state.session_store.clone())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(app_state.config.session_inactivity));

    let cors = match app_state.config.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Some(Err(_)) => {
            warn!("ignoring unparsable CORS_ORIGIN");
            CorsLayer::new()
        }
        None => CorsLayer::new(),
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router())
        .nest("/api/requests", requests::router())
        .nest("/api/chats", chats::router())
        .nest("/api/admin", admin::router())
        .route("/ws", axum::routing::get(chats::ws::chat_ws))
        .fallback(|| async { AppError::Status(StatusCode::NOT_FOUND, "route not found") })
        .with_state(app_state)
        .layer(session_layer)
        .layer(cors)
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Core(CoreError),
    Unauthorized(&'static str),
    Status(StatusCode, &'static str),
    Other(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Core(err) => {
                let status = match &err {
                    CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                    CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                    CoreError::Conflict(_) | CoreError::InvalidState(_) => StatusCode::CONFLICT,
                    CoreError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                match err {
                    CoreError::Internal(_) => {
                        error!(error = %err, "internal failure");
                        (status, "internal server error".to_owned())
                    }
                    CoreError::Transient(_) => {
                        warn!(error = %err, "transient failure");
                        (status, "temporarily unavailable, retry".to_owned())
                    }
                    err => (status, err.to_string()),
                }
            }
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_owned()),
            AppError::Status(status, message) => (status, message.to_owned()),
            AppError::Other(err) => {
                error!(error = %err, "unhandled failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Core(CoreError::from(err))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Other(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(tower_sessions::session_store::Error);
apperr_impl!(axum::Error);
apperr_impl!(anyhow::Error);
