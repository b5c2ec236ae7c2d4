mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn dashboard_composes_own_activity() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "dadmin").await;
    let member = common::register_user(&server, "dmember").await;
    let chama_id = common::create_chama(&server, &owner, "Dashboard Chama").await;
    common::join_chama(&server, &member, &chama_id).await;

    for amount in ["100.00", "200.50"] {
        server
            .post(&format!("/api/v1/chamas/{chama_id}/contributions"))
            .add_header(AUTHORIZATION, common::bearer(&member.token))
            .json(&json!({ "amount": amount }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .post(&format!("/api/v1/chamas/{chama_id}/announcements"))
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .json(&json!({ "title": "Welcome", "content": "Karibu" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/api/v1/messages")
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .json(&json!({ "recipient_id": member.id, "subject": "Hi", "content": "Welcome" }))
        .await
        .assert_status(StatusCode::CREATED);

    let resp = server
        .get("/api/v1/dashboard")
        .add_header(AUTHORIZATION, common::bearer(&member.token))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["total_contributions"], "300.50");
    assert_eq!(body["recent_contributions"].as_array().unwrap().len(), 2);
    assert_eq!(body["recent_contributions"][0]["chama_name"], "Dashboard Chama");
    assert_eq!(body["recent_announcements"][0]["title"], "Welcome");
    assert_eq!(body["unread_messages"], 1);
    assert_eq!(body["chamas"][0]["role"], "member");
    // Global figures are for profile admins only.
    assert!(body.get("admin").is_none());

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
    common::cleanup_user(&state.db, &member.id).await;
}

#[tokio::test]
async fn profile_admin_sees_global_figures() {
    use chama_api::db::schema::user_profiles;
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    let (server, state) = common::test_server();
    let admin = common::register_user(&server, "gadmin").await;

    let mut conn = state.db.get().await.unwrap();
    diesel::update(user_profiles::table.find(&admin.id))
        .set(user_profiles::role.eq("admin"))
        .execute(&mut conn)
        .await
        .unwrap();
    drop(conn);

    let body: Value = server
        .get("/api/v1/dashboard")
        .add_header(AUTHORIZATION, common::bearer(&admin.token))
        .await
        .json();
    assert!(body["admin"]["total_chamas"].as_i64().is_some());
    assert!(body["admin"]["total_members"].as_i64().is_some());
    assert!(body["admin"]["total_contributions"].is_string());

    common::cleanup_user(&state.db, &admin.id).await;
}

#[tokio::test]
async fn recent_announcements_show_important_first() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "iadmin").await;
    let chama_id = common::create_chama(&server, &owner, "Notices").await;

    for (title, is_important) in [("old-important", true), ("new-plain", false)] {
        server
            .post(&format!("/api/v1/chamas/{chama_id}/announcements"))
            .add_header(AUTHORIZATION, common::bearer(&owner.token))
            .json(&json!({ "title": title, "content": "Notice", "is_important": is_important }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let body: Value = server
        .get("/api/v1/dashboard")
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .await
        .json();
    let titles: Vec<&str> = body["recent_announcements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["old-important", "new-plain"]);

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
}
