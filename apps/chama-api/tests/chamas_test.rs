mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// POST /api/v1/chamas
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_chama_requires_auth() {
    let (server, _state) = common::test_server();

    let resp = server
        .post("/api/v1/chamas")
        .json(&json!({ "name": "Umoja" }))
        .await;

    resp.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_chama_validates_fields() {
    let (server, state) = common::test_server();
    let token = common::token_for(&state, "usr_creator").await;

    let resp = server
        .post("/api/v1/chamas")
        .add_header(AUTHORIZATION, common::bearer(&token))
        .json(&json!({
            "name": "  ",
            "contribution_amount": "-1.00",
            "contribution_frequency": "x".repeat(51),
        }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn update_chama_validates_before_lookup() {
    let (server, state) = common::test_server();
    let token = common::token_for(&state, "usr_editor").await;

    let resp = server
        .patch("/api/v1/chamas/chm_missing")
        .add_header(AUTHORIZATION, common::bearer(&token))
        .json(&json!({ "name": "a".repeat(101) }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_chama_makes_creator_admin() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "owner").await;

    let resp = server
        .post("/api/v1/chamas")
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .json(&json!({
            "name": "Umoja Savings",
            "description": "Weekly table banking",
            "contribution_amount": 500,
        }))
        .await;

    resp.assert_status(StatusCode::CREATED);
    let body: Value = resp.json();
    let chama_id = body["id"].as_str().unwrap().to_string();
    assert!(chama_id.starts_with("chm_"));
    assert_eq!(body["contribution_amount"], "500.00");
    assert_eq!(body["contribution_frequency"], "Monthly");
    assert_eq!(body["created_by"], owner.id.as_str());
    assert_eq!(body["member_count"], 1);
    assert_eq!(body["membership"]["role"], "admin");
    assert_eq!(body["membership"]["is_active"], true);
    assert_eq!(body["membership"]["can_edit"], true);
    assert_eq!(body["admins"][0]["username"], owner.username.as_str());

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas, GET /api/v1/chamas/{id}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_and_detail_report_membership() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "lister").await;
    let visitor = common::register_user(&server, "visitor").await;
    let chama_id = common::create_chama(&server, &owner, "Listed Chama").await;

    let list: Value = server
        .get("/api/v1/chamas")
        .add_header(AUTHORIZATION, common::bearer(&visitor.token))
        .await
        .json();
    let entry = list
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == chama_id.as_str())
        .expect("chama listed");
    assert_eq!(entry["member_count"], 1);
    assert_eq!(entry["is_member"], false);

    let detail: Value = server
        .get(&format!("/api/v1/chamas/{chama_id}"))
        .add_header(AUTHORIZATION, common::bearer(&visitor.token))
        .await
        .json();
    assert!(detail["membership"].is_null());
    assert_eq!(detail["total_contributions"], "0");

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
    common::cleanup_user(&state.db, &visitor.id).await;
}

#[tokio::test]
async fn missing_chama_is_not_found() {
    let (server, state) = common::test_server();
    let user = common::register_user(&server, "lost").await;

    for resp in [
        server
            .get("/api/v1/chamas/chm_does_not_exist")
            .add_header(AUTHORIZATION, common::bearer(&user.token))
            .await,
        server
            .post("/api/v1/chamas/chm_does_not_exist/join")
            .add_header(AUTHORIZATION, common::bearer(&user.token))
            .await,
    ] {
        resp.assert_status(StatusCode::NOT_FOUND);
    }

    common::cleanup_user(&state.db, &user.id).await;
}

// ---------------------------------------------------------------------------
// PATCH /api/v1/chamas/{id}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn only_admin_or_chairperson_can_edit() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "edadmin").await;
    let member = common::register_user(&server, "edmember").await;
    let chama_id = common::create_chama(&server, &owner, "Editable").await;
    common::join_chama(&server, &member, &chama_id).await;

    for role in ["member", "treasurer"] {
        common::set_role(&server, &owner, &chama_id, &member, role).await;
        let resp = server
            .patch(&format!("/api/v1/chamas/{chama_id}"))
            .add_header(AUTHORIZATION, common::bearer(&member.token))
            .json(&json!({ "name": "Hijacked" }))
            .await;
        resp.assert_status(StatusCode::FORBIDDEN);
    }

    common::set_role(&server, &owner, &chama_id, &member, "chairperson").await;
    let resp = server
        .patch(&format!("/api/v1/chamas/{chama_id}"))
        .add_header(AUTHORIZATION, common::bearer(&member.token))
        .json(&json!({ "name": "Renamed", "contribution_amount": "750.50" }))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["contribution_amount"], "750.50");

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
    common::cleanup_user(&state.db, &member.id).await;
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas/{id}/join, /leave
// ---------------------------------------------------------------------------

#[tokio::test]
async fn joining_twice_never_duplicates() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "jadmin").await;
    let member = common::register_user(&server, "jmember").await;
    let chama_id = common::create_chama(&server, &owner, "Joinable").await;

    let first = server
        .post(&format!("/api/v1/chamas/{chama_id}/join"))
        .add_header(AUTHORIZATION, common::bearer(&member.token))
        .await;
    first.assert_status(StatusCode::CREATED);
    let first: Value = first.json();
    assert_eq!(first["status"], "joined");
    assert_eq!(first["membership"]["role"], "member");
    assert_eq!(first["membership"]["is_active"], true);

    let second = server
        .post(&format!("/api/v1/chamas/{chama_id}/join"))
        .add_header(AUTHORIZATION, common::bearer(&member.token))
        .await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["status"], "already_member");
    assert_eq!(second["membership"]["id"], first["membership"]["id"]);

    let members: Value = server
        .get(&format!("/api/v1/chamas/{chama_id}/members"))
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .await
        .json();
    assert_eq!(members.as_array().unwrap().len(), 2);

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
    common::cleanup_user(&state.db, &member.id).await;
}

#[tokio::test]
async fn rejoining_reactivates_with_previous_role() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "radmin").await;
    let member = common::register_user(&server, "rmember").await;
    let chama_id = common::create_chama(&server, &owner, "Rejoinable").await;
    let joined = common::join_chama(&server, &member, &chama_id).await;
    common::set_role(&server, &owner, &chama_id, &member, "treasurer").await;

    server
        .post(&format!("/api/v1/chamas/{chama_id}/leave"))
        .add_header(AUTHORIZATION, common::bearer(&member.token))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let resp = server
        .post(&format!("/api/v1/chamas/{chama_id}/join"))
        .add_header(AUTHORIZATION, common::bearer(&member.token))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "reactivated");
    assert_eq!(body["membership"]["id"], joined["membership"]["id"]);
    assert_eq!(body["membership"]["role"], "treasurer");
    assert_eq!(body["membership"]["is_active"], true);

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
    common::cleanup_user(&state.db, &member.id).await;
}

#[tokio::test]
async fn inactive_chama_cannot_be_joined() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "iadmin").await;
    let outsider = common::register_user(&server, "ioutsider").await;
    let chama_id = common::create_chama(&server, &owner, "Dormant").await;

    server
        .patch(&format!("/api/v1/chamas/{chama_id}"))
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .json(&json!({ "is_active": false }))
        .await
        .assert_status_ok();

    server
        .post(&format!("/api/v1/chamas/{chama_id}/join"))
        .add_header(AUTHORIZATION, common::bearer(&outsider.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/api/v1/chamas/{chama_id}"))
        .add_header(AUTHORIZATION, common::bearer(&outsider.token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    // Still visible to its members.
    server
        .get(&format!("/api/v1/chamas/{chama_id}"))
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .await
        .assert_status_ok();

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
    common::cleanup_user(&state.db, &outsider.id).await;
}

#[tokio::test]
async fn last_admin_cannot_leave() {
    let (server, state) = common::test_server();
    let owner = common::register_user(&server, "ladmin").await;
    let chama_id = common::create_chama(&server, &owner, "Anchored").await;

    server
        .post(&format!("/api/v1/chamas/{chama_id}/leave"))
        .add_header(AUTHORIZATION, common::bearer(&owner.token))
        .await
        .assert_status(StatusCode::CONFLICT);

    common::cleanup_chama(&state.db, &chama_id).await;
    common::cleanup_user(&state.db, &owner.id).await;
}
