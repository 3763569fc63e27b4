mod common;

use skillswap::{CoreError, Notifier, chats, directory, requests};
use uuid::Uuid;

#[tokio::test]
async fn deleting_a_user_removes_their_requests_and_chats() {
    let db_pool = common::pool().await;
    let notifier = Notifier::new(8);
    let a = common::user(&db_pool, "A", &[], &[]).await;
    let b = common::user(&db_pool, "B", &[], &[]).await;
    let c = common::user(&db_pool, "C", &[], &[]).await;

    let ab = requests::send_request(&db_pool, a.id, b.id).await.unwrap();
    requests::accept(&db_pool, b.id, ab.id).await.unwrap();
    let ca = requests::send_request(&db_pool, c.id, a.id).await.unwrap();
    let bc = requests::send_request(&db_pool, b.id, c.id).await.unwrap();
    requests::accept(&db_pool, c.id, bc.id).await.unwrap();

    let ab_chat = chats::list_for_user(&db_pool, a.id).await.unwrap().remove(0);
    chats::append_message(&db_pool, &notifier, ab_chat.id, a.id, "hello".to_owned(), 100)
        .await
        .unwrap();

    let report = directory::delete_user(&db_pool, a.id).await.unwrap();
    assert_eq!(report.requests, 2);
    assert_eq!(report.chats, 1);

    assert!(directory::find_public(&db_pool, a.id).await.unwrap().is_none());
    assert!(matches!(
        chats::get_chat(&db_pool, ab_chat.id, b.id).await.unwrap_err(),
        CoreError::NotFound(_)
    ));
    assert!(matches!(
        requests::accept(&db_pool, a.id, ca.id).await.unwrap_err(),
        CoreError::NotFound(_)
    ));

    let (orphans,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id=?")
        .bind(ab_chat.id)
        .fetch_one(&db_pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0);

    // the unrelated pair is untouched
    assert_eq!(chats::list_for_user(&db_pool, b.id).await.unwrap().len(), 1);
    assert_eq!(requests::list_sent(&db_pool, b.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_unknown_user_is_not_found() {
    let db_pool = common::pool().await;
    let err = directory::delete_user(&db_pool, Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn emails_are_unique_regardless_of_case() {
    let db_pool = common::pool().await;
    common::user(&db_pool, "Navya", &[], &[]).await;

    let err = directory::create_user(
        &db_pool,
        directory::NewUser {
            name: "Navya Again".to_owned(),
            email: "NAVYA@pesu.ac.in".to_owned(),
            password_hash: "x".to_owned(),
            bio: String::new(),
            offered_skills: vec![],
            desired_skills: vec![],
            is_admin: false,
            verified: false,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let found = directory::find_by_email(&db_pool, "Navya@PESU.ac.in").await.unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn verification_flag_is_set() {
    let db_pool = common::pool().await;
    let a = common::user(&db_pool, "A", &[], &[]).await;
    assert!(!a.verified);
    assert!(directory::set_verified(&db_pool, a.id).await.unwrap().verified);
    assert!(matches!(
        directory::set_verified(&db_pool, Uuid::now_v7()).await.unwrap_err(),
        CoreError::NotFound(_)
    ));
}
