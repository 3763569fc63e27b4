mod list;
mod respond;
mod send;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::{
    AppState,
    db::{ConnectionRequest, PublicUser},
};

pub use list::{list_incoming, list_sent};
pub use respond::{Decision, accept, reject, respond_to_request};
pub use send::send_request;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(send::send))
        .route("/incoming", get(list::incoming))
        .route("/sent", get(list::sent))
        .route("/{request_id}/accept", put(respond::accept_request))
        .route("/{request_id}/reject", put(respond::reject_request))
}

/// A request together with the public record of the other party.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: ConnectionRequest,
    pub counterpart: PublicUser,
}
