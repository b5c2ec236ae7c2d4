//! Chama announcements.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::schema::{announcements, chamas, users};
use crate::error::{ApiError, ApiErrorBody};
use crate::extract::JsonBody;
use crate::models::announcement::{Announcement, AnnouncementEntry, NewAnnouncement};
use crate::permissions::{self, Capability};
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/chamas/{id}/announcements",
        get(list_announcements).post(add_announcement),
    )
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas/{id}/announcements
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAnnouncementRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_important: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/chamas/{id}/announcements",
    tag = "Announcements",
    params(("id" = String, Path, description = "Chama ID")),
    request_body = AddAnnouncementRequest,
    responses(
        (status = 201, description = "Announcement posted", body = Announcement),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 403, description = "Caller is not an admin or chairperson", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn add_announcement(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AddAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    let mut errors = Vec::new();
    let title = validate::required_text(&mut errors, "title", &body.title, validate::TITLE_MAX);
    let content = validate::required_text(&mut errors, "content", &body.content, usize::MAX);
    ApiError::check(errors)?;

    permissions::find_chama(&state.db, &id).await?;
    permissions::check_capability(&state.db, &id, &user_id, Capability::EditGroup).await?;

    let mut conn = state.db.get().await?;

    let row: Announcement = diesel::insert_into(announcements::table)
        .values(NewAnnouncement {
            id: state.snowflake.generate(),
            chama_id: &id,
            title: &title,
            content: &content,
            created_by: Some(&user_id),
            is_important: body.is_important,
            created_at: Utc::now(),
        })
        .returning(Announcement::as_returning())
        .get_result(&mut conn)
        .await?;

    tracing::info!(
        chama_id = %id,
        user_id = %user_id,
        announcement_id = row.id,
        is_important = row.is_important,
        "announcement posted"
    );

    Ok((StatusCode::CREATED, Json(row)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas/{id}/announcements
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/chamas/{id}/announcements",
    tag = "Announcements",
    params(("id" = String, Path, description = "Chama ID")),
    responses(
        (status = 200, description = "Important first, then newest", body = Vec<AnnouncementEntry>),
        (status = 403, description = "Not an active member", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_announcements(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AnnouncementEntry>>, ApiError> {
    permissions::find_chama(&state.db, &id).await?;
    permissions::require_active_membership(&state.db, &id, &user_id).await?;

    let mut conn = state.db.get().await?;

    let rows: Vec<(Announcement, String, Option<String>)> = announcements::table
        .inner_join(chamas::table)
        .left_join(users::table.on(announcements::created_by.eq(users::id.nullable())))
        .filter(announcements::chama_id.eq(&id))
        .order((
            announcements::is_important.desc(),
            announcements::created_at.desc(),
            announcements::id.desc(),
        ))
        .select((
            Announcement::as_select(),
            chamas::name,
            users::username.nullable(),
        ))
        .load(&mut conn)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(announcement, chama_name, author)| AnnouncementEntry {
                announcement,
                chama_name,
                author,
            })
            .collect(),
    ))
}
