//! Per-member contributions into a chama.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::schema::{contributions, memberships, users};
use crate::error::{ApiError, ApiErrorBody};
use crate::extract::JsonBody;
use crate::models::contribution::{self, Contribution, ContributionEntry, NewContribution};
use crate::permissions;
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/chamas/{id}/contributions",
        get(list_contributions).post(add_contribution),
    )
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas/{id}/contributions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddContributionRequest {
    pub amount: Decimal,
    /// Defaults to today (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/chamas/{id}/contributions",
    tag = "Contributions",
    params(("id" = String, Path, description = "Chama ID")),
    request_body = AddContributionRequest,
    responses(
        (status = 201, description = "Contribution recorded", body = Contribution),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 403, description = "Not an active member", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn add_contribution(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AddContributionRequest>,
) -> Result<(StatusCode, Json<Contribution>), ApiError> {
    let mut errors = Vec::new();
    validate::amount(&mut errors, "amount", body.amount, validate::MIN_AMOUNT);
    let notes = validate::optional_text(&mut errors, "notes", body.notes.as_deref(), None);
    ApiError::check(errors)?;

    permissions::find_chama(&state.db, &id).await?;
    let membership = permissions::require_active_membership(&state.db, &id, &user_id).await?;

    let now = Utc::now();
    let mut conn = state.db.get().await?;

    let row: Contribution = diesel::insert_into(contributions::table)
        .values(NewContribution {
            id: state.snowflake.generate(),
            membership_id: &membership.id,
            amount: body.amount,
            date: body.date.unwrap_or_else(|| now.date_naive()),
            notes: &notes,
            created_at: now,
        })
        .returning(Contribution::as_returning())
        .get_result(&mut conn)
        .await?;

    tracing::info!(
        chama_id = %id,
        user_id = %user_id,
        contribution_id = row.id,
        amount = %row.amount,
        "contribution recorded"
    );

    Ok((StatusCode::CREATED, Json(row)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas/{id}/contributions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct ContributionList {
    pub data: Vec<ContributionEntry>,
    pub total: Decimal,
    pub count: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/chamas/{id}/contributions",
    tag = "Contributions",
    params(("id" = String, Path, description = "Chama ID")),
    responses(
        (status = 200, description = "Every contribution in the chama, newest date first", body = ContributionList),
        (status = 403, description = "Not an active member", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_contributions(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContributionList>, ApiError> {
    permissions::find_chama(&state.db, &id).await?;
    permissions::require_active_membership(&state.db, &id, &user_id).await?;

    let mut conn = state.db.get().await?;

    let rows: Vec<(Contribution, String, String, String)> = contributions::table
        .inner_join(memberships::table.inner_join(users::table))
        .filter(memberships::chama_id.eq(&id))
        .order((
            contributions::date.desc(),
            contributions::created_at.desc(),
            contributions::id.desc(),
        ))
        .select((
            Contribution::as_select(),
            memberships::chama_id,
            memberships::user_id,
            users::username,
        ))
        .load(&mut conn)
        .await?;

    let total = contribution::total(rows.iter().map(|(c, ..)| &c.amount));
    let data: Vec<ContributionEntry> = rows
        .into_iter()
        .map(|(contribution, chama_id, user_id, username)| ContributionEntry {
            contribution,
            chama_id,
            user_id,
            username,
        })
        .collect();

    Ok(Json(ContributionList {
        count: data.len(),
        total,
        data,
    }))
}
