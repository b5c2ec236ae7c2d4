mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn update_profile_rejects_invalid_fields() {
    let (server, state) = common::test_server();
    let token = common::token_for(&state, "usr_profile").await;

    let resp = server
        .put("/api/v1/profile")
        .add_header(AUTHORIZATION, common::bearer(&token))
        .json(&json!({
            "email": "nope",
            "first_name": "a".repeat(31),
            "profile_picture": "ftp://example.com/me.png",
        }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    let fields: Vec<&str> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["first_name", "email", "profile_picture"]);
}

#[tokio::test]
async fn update_profile_writes_user_and_profile() {
    let (server, state) = common::test_server();
    let user = common::register_user(&server, "prof").await;

    let resp = server
        .put("/api/v1/profile")
        .add_header(AUTHORIZATION, common::bearer(&user.token))
        .json(&json!({
            "first_name": " Wanjiku ",
            "last_name": "Kamau",
            "email": "wanjiku@example.co.ke",
            "phone_number": "+254711111111",
            "address": "Nakuru",
            "date_of_birth": "1990-04-12",
            "role": "admin",
        }))
        .await;
    resp.assert_status_ok();

    let body: Value = server
        .get("/api/v1/profile")
        .add_header(AUTHORIZATION, common::bearer(&user.token))
        .await
        .json();
    assert_eq!(body["user"]["first_name"], "Wanjiku");
    assert_eq!(body["user"]["last_name"], "Kamau");
    assert_eq!(body["user"]["email"], "wanjiku@example.co.ke");
    assert_eq!(body["profile"]["address"], "Nakuru");
    assert_eq!(body["profile"]["date_of_birth"], "1990-04-12");
    // Role is not client-settable.
    assert_eq!(body["profile"]["role"], "member");

    // Omitted optional fields are cleared.
    server
        .put("/api/v1/profile")
        .add_header(AUTHORIZATION, common::bearer(&user.token))
        .json(&json!({ "email": "wanjiku@example.co.ke" }))
        .await
        .assert_status_ok();
    let body: Value = server
        .get("/api/v1/profile")
        .add_header(AUTHORIZATION, common::bearer(&user.token))
        .await
        .json();
    assert_eq!(body["user"]["first_name"], "");
    assert!(body["profile"]["date_of_birth"].is_null());

    common::cleanup_user(&state.db, &user.id).await;
}
