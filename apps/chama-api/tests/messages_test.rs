mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn cannot_message_yourself() {
    let (server, state) = common::test_server();
    let token = common::token_for(&state, "usr_self").await;

    let resp = server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&token))
        .json(&json!({ "recipient_id": "usr_self", "subject": "Hi", "content": "Me" }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>()["error"]["details"][0]["field"], "recipient_id");
}

#[tokio::test]
async fn send_requires_subject_and_content() {
    let (server, state) = common::test_server();
    let token = common::token_for(&state, "usr_sender").await;

    let resp = server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&token))
        .json(&json!({ "recipient_id": "usr_other", "subject": "", "content": "" }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn recipients_are_limited_to_co_members() {
    let (server, state) = common::test_server();
    let a = common::register_user(&server, "msga").await;
    let b = common::register_user(&server, "msgb").await;
    let c = common::register_user(&server, "msgc").await;
    let chama_id = common::create_chama(&server, &a, "Chatty").await;
    let other_chama = common::create_chama(&server, &c, "Elsewhere").await;
    common::join_chama(&server, &b, &chama_id).await;

    let options: Value = server
        .get("/api/v1/messages/recipients")
        .add_header(AUTHORIZATION, common::bearer(&a.token))
        .await
        .json();
    let ids: Vec<&str> = options["recipients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [b.id.as_str()]);
    assert_eq!(options["chamas"][0]["id"], chama_id.as_str());

    // A -> B shares a chama.
    server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&a.token))
        .json(&json!({
            "recipient_id": b.id,
            "subject": "Meeting",
            "content": "See you Saturday",
            "chama_id": chama_id,
        }))
        .await
        .assert_status(StatusCode::CREATED);

    // A -> C shares nothing.
    let resp = server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&a.token))
        .json(&json!({ "recipient_id": c.id, "subject": "Hello", "content": "?" }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>()["error"]["details"][0]["field"], "recipient_id");

    // Tagging a chama the sender does not belong to.
    let resp = server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&a.token))
        .json(&json!({
            "recipient_id": b.id,
            "subject": "Hello",
            "content": "?",
            "chama_id": other_chama,
        }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>()["error"]["details"][0]["field"], "chama_id");

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_chama(&state.db, &other_chama).await;
    for user in [&a, &b, &c] {
        common::cleanup_user(&state.db, &user.id).await;
    }
}

#[tokio::test]
async fn viewing_marks_read_once_and_is_private() {
    let (server, state) = common::test_server();
    let a = common::register_user(&server, "vwa").await;
    let b = common::register_user(&server, "vwb").await;
    let c = common::register_user(&server, "vwc").await;
    let chama_id = common::create_chama(&server, &a, "Readers").await;
    common::join_chama(&server, &b, &chama_id).await;

    let sent: Value = server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&a.token))
        .json(&json!({ "recipient_id": b.id, "subject": "Dues", "content": "Reminder" }))
        .await
        .json();
    let message_id = sent["id"].as_i64().unwrap();
    assert_eq!(sent["is_read"], false);

    // The sender viewing does not mark it read.
    let body: Value = server
        .get(&format!("/api/v1/messages/{message_id}"))
        .add_header(AUTHORIZATION, common::bearer(&a.token))
        .await
        .json();
    assert_eq!(body["is_read"], false);

    let inbox: Value = server
        .get("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&b.token))
        .await
        .json();
    assert_eq!(inbox["unread_count"], 1);
    assert_eq!(inbox["received"][0]["sender_username"], a.username.as_str());

    for _ in 0..2 {
        let resp = server
            .get(&format!("/api/v1/messages/{message_id}"))
            .add_header(AUTHORIZATION, common::bearer(&b.token))
            .await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Value>()["is_read"], true);
    }

    let inbox: Value = server
        .get("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&b.token))
        .await
        .json();
    assert_eq!(inbox["unread_count"], 0);

    server
        .get(&format!("/api/v1/messages/{message_id}"))
        .add_header(AUTHORIZATION, common::bearer(&c.token))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .get("/api/v1/messages/1")
        .add_header(AUTHORIZATION, common::bearer(&c.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    common::cleanup_chama(&state.db, &chama_id).await;
    for user in [&a, &b, &c] {
        common::cleanup_user(&state.db, &user.id).await;
    }
}
