mod common;

use axum::http::StatusCode;
use common::Client;
use serde_json::json;
use skillswap::{auth, directory, db::PublicUser};
use sqlx::SqlitePool;

#[tokio::test]
async fn anonymous_calls_are_unauthorized() {
    let mut client = Client::new().await;
    let (status, body) = client.call("GET", "/api/users/matches", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn full_exchange_over_http() {
    let base = Client::new().await;
    let mut alice = Client::with_app(&base.app);
    let mut bob = Client::with_app(&base.app);

    let alice_id = alice.register("Alice", &["Python"], &["React.js"]).await;
    let bob_id = bob.register("Bob", &["React.js"], &["Python"]).await;

    let (status, body) = alice.call("GET", "/api/users/matches", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches"][0]["id"], bob_id.as_str());
    assert!(body["matches"][0].get("passwordHash").is_none());

    let send = json!({ "toUserId": bob_id });
    let (status, body) = alice.call("POST", "/api/requests/send", Some(send.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["request"]["id"].as_str().unwrap().to_owned();

    let (status, _) = alice.call("POST", "/api/requests/send", Some(send)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let accept = format!("/api/requests/{request_id}/accept");
    let (status, _) = alice.call("PUT", &accept, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = bob.call("PUT", &accept, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "accepted");

    let (status, _) = bob.call("PUT", &accept, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = alice.call("GET", "/api/chats", None).await;
    let chat_id = body["chats"][0]["id"].as_str().unwrap().to_owned();
    assert_eq!(body["chats"][0]["unread"], false);

    let (status, body) = alice
        .call("POST", &format!("/api/chats/{chat_id}/message"), Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["newMessage"]["sender"]["id"], alice_id.as_str());

    let (status, _) = alice
        .call("POST", &format!("/api/chats/{chat_id}/message"), Some(json!({ "text": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = bob.call("GET", "/api/chats/unread", None).await;
    assert_eq!(body["unread"], 1);
    let (status, _) = bob.call("POST", &format!("/api/chats/{chat_id}/read"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = bob.call("GET", "/api/chats", None).await;
    assert_eq!(body["chats"][0]["unread"], false);
    assert_eq!(body["chats"][0]["messages"][0]["text"], "hi");

    let mut carol = Client::with_app(&base.app);
    carol.register("Carol", &[], &[]).await;
    let (status, _) = carol.call("GET", &format!("/api/chats/{chat_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = carol.call("GET", "/api/admin/users", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_round_trip() {
    let base = Client::new().await;
    let mut first = Client::with_app(&base.app);
    first.register("Priya", &["Docker"], &[]).await;

    let mut second = Client::with_app(&base.app);
    let (status, _) = second
        .call("POST", "/api/auth/login", Some(json!({ "email": "PRIYA@pesu.ac.in", "password": "wrong" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = second
        .call("POST", "/api/auth/login", Some(json!({ "email": "PRIYA@pesu.ac.in", "password": "demo123" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "priya@pesu.ac.in");

    let (status, body) = second.call("GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Priya");

    let (status, _) = second.call("POST", "/api/auth/logout", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    second.cookie = None;
    let (status, _) = second.call("GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn admin(db_pool: &SqlitePool) -> PublicUser {
    directory::create_user(
        db_pool,
        directory::NewUser {
            is_admin: true,
            verified: true,
            password_hash: auth::hash_password("admin123").unwrap(),
            ..common::new_user("Navya", &[], &[])
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn admin_verifies_and_deletes_users() {
    let db_pool = common::pool().await;
    admin(&db_pool).await;
    let base = Client::with_pool(db_pool);

    let mut alice = Client::with_app(&base.app);
    let mut bob = Client::with_app(&base.app);
    let (alice_id, bob_id, request_id, chat_id) = Client::connect_pair(&mut alice, &mut bob, ("Alice", "Bob")).await;
    let (status, _) = alice
        .call("POST", &format!("/api/chats/{chat_id}/message"), Some(json!({ "text": "hello" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut carol = Client::with_app(&base.app);
    carol.register("Carol", &[], &[]).await;
    let (status, body) = carol
        .call("POST", "/api/requests/send", Some(json!({ "toUserId": bob_id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let pending_id = body["request"]["id"].as_str().unwrap().to_owned();

    let (status, _) = carol
        .call("DELETE", &format!("/api/admin/users/{bob_id}"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut root = Client::with_app(&base.app);
    root.login("navya@pesu.ac.in", "admin123").await;

    let (status, body) = root.call("GET", "/api/admin/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 4);
    assert_eq!(body["users"][0]["name"], "Carol");

    let (status, body) = root
        .call("PUT", &format!("/api/admin/users/{alice_id}/verify"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["verified"], true);

    let (status, body) = root
        .call("DELETE", &format!("/api/admin/users/{bob_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["deleted"], bob_id.as_str());
    assert_eq!(body["requestsRemoved"], 2);
    assert_eq!(body["chatsRemoved"], 1);

    let (status, _) = alice.call("GET", &format!("/api/chats/{chat_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = alice.call("GET", "/api/chats", None).await;
    assert!(body["chats"].as_array().unwrap().is_empty());

    for id in [&request_id, &pending_id] {
        let (status, _) = carol
            .call("PUT", &format!("/api/requests/{id}/accept"), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (_, body) = carol.call("GET", "/api/requests/sent", None).await;
    assert!(body["requests"].as_array().unwrap().is_empty());

    let (status, _) = bob.call("GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = root
        .call("DELETE", &format!("/api/admin/users/{bob_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
