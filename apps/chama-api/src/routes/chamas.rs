//! Chama (group) lifecycle: create, list, view, edit, join and leave.

use std::collections::{HashMap, HashSet};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::pool::DbPool;
use crate::db::schema::{chamas, contributions, memberships, users};
use crate::error::{is_unique_violation, ApiError, ApiErrorBody};
use crate::extract::JsonBody;
use crate::models::chama::{
    Chama, ChamaDetail, ChamaSummary, NewChama, UpdateChama, ViewerMembership,
};
use crate::models::membership::{MemberEntry, Membership, NewMembership};
use crate::permissions::{self, Capability, Role};
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chamas", get(list_chamas).post(create_chama))
        .route("/chamas/{id}", get(get_chama).patch(update_chama))
        .route("/chamas/{id}/join", post(join_chama))
        .route("/chamas/{id}/leave", post(leave_chama))
}

const DEFAULT_FREQUENCY: &str = "Monthly";

/// Number of active members in the chama.
async fn member_count(conn: &mut AsyncPgConnection, chama_id: &str) -> Result<i64, ApiError> {
    let count = memberships::table
        .filter(memberships::chama_id.eq(chama_id))
        .filter(memberships::is_active.eq(true))
        .count()
        .get_result(conn)
        .await?;
    Ok(count)
}

/// Build the detail view of `chama` as seen by `viewer_id`.
pub async fn chama_detail(
    pool: &DbPool,
    chama: Chama,
    viewer_id: &str,
) -> Result<ChamaDetail, ApiError> {
    let mut conn = pool.get().await?;

    let member_count = member_count(&mut conn, &chama.id).await?;

    let total_contributions: Option<Decimal> = contributions::table
        .inner_join(memberships::table)
        .filter(memberships::chama_id.eq(&chama.id))
        .select(sum(contributions::amount))
        .get_result(&mut conn)
        .await?;

    let admins: Vec<(Membership, String)> = memberships::table
        .inner_join(users::table)
        .filter(memberships::chama_id.eq(&chama.id))
        .filter(memberships::is_active.eq(true))
        .filter(memberships::role.eq_any([Role::Admin.as_str(), Role::Chairperson.as_str()]))
        .order(memberships::joined_at.asc())
        .select((Membership::as_select(), users::username))
        .load(&mut conn)
        .await?;

    let viewer: Option<Membership> = memberships::table
        .filter(memberships::chama_id.eq(&chama.id))
        .filter(memberships::user_id.eq(viewer_id))
        .select(Membership::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    Ok(ChamaDetail {
        chama,
        member_count,
        total_contributions: total_contributions.unwrap_or(Decimal::ZERO),
        admins: admins
            .into_iter()
            .map(|(membership, username)| MemberEntry {
                membership,
                username,
                total_contributed: None,
            })
            .collect(),
        membership: viewer.map(|m| ViewerMembership {
            can_edit: m.can_edit_group(),
            can_add_transactions: m.can_add_transactions(),
            membership: m,
        }),
    })
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateChamaRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contribution_amount: Option<Decimal>,
    #[serde(default)]
    pub contribution_frequency: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/chamas",
    tag = "Chamas",
    request_body = CreateChamaRequest,
    responses(
        (status = 201, description = "Chama created with the caller as admin", body = ChamaDetail),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn create_chama(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateChamaRequest>,
) -> Result<(StatusCode, Json<ChamaDetail>), ApiError> {
    let mut errors = Vec::new();
    let name = validate::required_text(&mut errors, "name", &body.name, validate::CHAMA_NAME_MAX);
    let description =
        validate::optional_text(&mut errors, "description", body.description.as_deref(), None);
    let contribution_amount = body.contribution_amount.unwrap_or(Decimal::ZERO);
    validate::amount(
        &mut errors,
        "contribution_amount",
        contribution_amount,
        Decimal::ZERO,
    );
    let contribution_frequency = validate::required_text(
        &mut errors,
        "contribution_frequency",
        body.contribution_frequency
            .as_deref()
            .unwrap_or(DEFAULT_FREQUENCY),
        validate::FREQUENCY_MAX,
    );
    ApiError::check(errors)?;

    let now = Utc::now();
    let chama_id = chama_common::id::prefixed_ulid(chama_common::id::prefix::CHAMA);
    let membership_id = chama_common::id::prefixed_ulid(chama_common::id::prefix::MEMBERSHIP);
    let owner_id = user_id.clone();

    let mut conn = state.db.get().await?;

    // The chama and its founding admin membership become visible together.
    let chama = conn
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let chama: Chama = diesel::insert_into(chamas::table)
                    .values(NewChama {
                        id: &chama_id,
                        name: &name,
                        description: &description,
                        created_by: Some(&owner_id),
                        contribution_amount,
                        contribution_frequency: &contribution_frequency,
                        is_active: true,
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(Chama::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::insert_into(memberships::table)
                    .values(NewMembership {
                        id: &membership_id,
                        chama_id: &chama_id,
                        user_id: &owner_id,
                        role: Role::Admin.as_str(),
                        is_active: true,
                        joined_at: now,
                    })
                    .execute(conn)
                    .await?;

                Ok(chama)
            }
            .scope_boxed()
        })
        .await?;
    drop(conn);

    tracing::info!(chama_id = %chama.id, user_id = %user_id, "chama created");

    let detail = chama_detail(&state.db, chama, &user_id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/chamas",
    tag = "Chamas",
    responses(
        (status = 200, description = "Active chamas, newest first", body = Vec<ChamaSummary>),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_chamas(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ChamaSummary>>, ApiError> {
    let mut conn = state.db.get().await?;

    let rows: Vec<Chama> = chamas::table
        .filter(chamas::is_active.eq(true))
        .order((chamas::created_at.desc(), chamas::id.desc()))
        .select(Chama::as_select())
        .load(&mut conn)
        .await?;

    let ids: Vec<&str> = rows.iter().map(|c| c.id.as_str()).collect();

    let counts: HashMap<String, i64> = memberships::table
        .filter(memberships::chama_id.eq_any(ids))
        .filter(memberships::is_active.eq(true))
        .group_by(memberships::chama_id)
        .select((memberships::chama_id, count_star()))
        .load::<(String, i64)>(&mut conn)
        .await?
        .into_iter()
        .collect();

    let joined: HashSet<String> = memberships::table
        .filter(memberships::user_id.eq(&user_id))
        .filter(memberships::is_active.eq(true))
        .select(memberships::chama_id)
        .load::<String>(&mut conn)
        .await?
        .into_iter()
        .collect();

    let summaries = rows
        .into_iter()
        .map(|chama| ChamaSummary {
            member_count: counts.get(&chama.id).copied().unwrap_or(0),
            is_member: joined.contains(&chama.id),
            chama,
        })
        .collect();

    Ok(Json(summaries))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas/{id}
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/chamas/{id}",
    tag = "Chamas",
    params(("id" = String, Path, description = "Chama ID")),
    responses(
        (status = 200, description = "Chama detail", body = ChamaDetail),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn get_chama(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChamaDetail>, ApiError> {
    let chama = permissions::find_chama(&state.db, &id).await?;

    if !chama.is_active {
        let member = permissions::find_membership(&state.db, &id, &user_id)
            .await?
            .is_some_and(|m| m.is_active);
        if !member {
            return Err(ApiError::not_found("Chama not found"));
        }
    }

    let detail = chama_detail(&state.db, chama, &user_id).await?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// PATCH /api/v1/chamas/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateChamaRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contribution_amount: Option<Decimal>,
    #[serde(default)]
    pub contribution_frequency: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[utoipa::path(
    patch,
    path = "/api/v1/chamas/{id}",
    tag = "Chamas",
    params(("id" = String, Path, description = "Chama ID")),
    request_body = UpdateChamaRequest,
    responses(
        (status = 200, description = "Chama updated", body = ChamaDetail),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 403, description = "Caller is not an admin or chairperson", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn update_chama(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateChamaRequest>,
) -> Result<Json<ChamaDetail>, ApiError> {
    let mut errors = Vec::new();
    let name = body
        .name
        .as_deref()
        .map(|n| validate::required_text(&mut errors, "name", n, validate::CHAMA_NAME_MAX));
    let description = body
        .description
        .as_deref()
        .map(|d| validate::optional_text(&mut errors, "description", Some(d), None));
    if let Some(amount) = body.contribution_amount {
        validate::amount(&mut errors, "contribution_amount", amount, Decimal::ZERO);
    }
    let contribution_frequency = body.contribution_frequency.as_deref().map(|f| {
        validate::required_text(
            &mut errors,
            "contribution_frequency",
            f,
            validate::FREQUENCY_MAX,
        )
    });
    ApiError::check(errors)?;

    permissions::find_chama(&state.db, &id).await?;
    permissions::check_capability(&state.db, &id, &user_id, Capability::EditGroup).await?;

    let mut conn = state.db.get().await?;

    let chama: Chama = diesel::update(chamas::table.find(&id))
        .set(UpdateChama {
            name,
            description,
            contribution_amount: body.contribution_amount,
            contribution_frequency,
            is_active: body.is_active,
            updated_at: Utc::now(),
        })
        .returning(Chama::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("Chama not found"))?;
    drop(conn);

    tracing::info!(chama_id = %id, user_id = %user_id, "chama updated");

    let detail = chama_detail(&state.db, chama, &user_id).await?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas/{id}/join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Joined,
    Reactivated,
    AlreadyMember,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    pub status: JoinStatus,
    pub membership: Membership,
}

#[utoipa::path(
    post,
    path = "/api/v1/chamas/{id}/join",
    tag = "Chamas",
    params(("id" = String, Path, description = "Chama ID")),
    responses(
        (status = 201, description = "New membership created", body = JoinResponse),
        (status = 200, description = "Membership reactivated, or already a member", body = JoinResponse),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
        (status = 404, description = "Chama not found or not active", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn join_chama(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<JoinResponse>), ApiError> {
    let chama = permissions::find_chama(&state.db, &id).await?;
    if !chama.is_active {
        return Err(ApiError::not_found("Chama not found"));
    }

    let mut conn = state.db.get().await?;

    let existing: Option<Membership> = memberships::table
        .filter(memberships::chama_id.eq(&id))
        .filter(memberships::user_id.eq(&user_id))
        .select(Membership::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    let (status, membership) = match existing {
        Some(m) if m.is_active => (JoinStatus::AlreadyMember, m),
        Some(m) => {
            // Reactivate in place, keeping the previous role.
            let reactivated: Option<Membership> = diesel::update(
                memberships::table
                    .find(&m.id)
                    .filter(memberships::is_active.eq(false)),
            )
            .set(memberships::is_active.eq(true))
            .returning(Membership::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;

            match reactivated {
                Some(m) => (JoinStatus::Reactivated, m),
                None => (JoinStatus::AlreadyMember, reload(&mut conn, &m.id).await?),
            }
        }
        None => {
            let membership_id =
                chama_common::id::prefixed_ulid(chama_common::id::prefix::MEMBERSHIP);
            let inserted = diesel::insert_into(memberships::table)
                .values(NewMembership {
                    id: &membership_id,
                    chama_id: &id,
                    user_id: &user_id,
                    role: Role::Member.as_str(),
                    is_active: true,
                    joined_at: Utc::now(),
                })
                .returning(Membership::as_returning())
                .get_result(&mut conn)
                .await;

            match inserted {
                Ok(m) => (JoinStatus::Joined, m),
                // A concurrent join won the unique (chama, user) race.
                Err(e) if is_unique_violation(&e) => {
                    let m = memberships::table
                        .filter(memberships::chama_id.eq(&id))
                        .filter(memberships::user_id.eq(&user_id))
                        .select(Membership::as_select())
                        .first(&mut conn)
                        .await?;
                    (JoinStatus::AlreadyMember, m)
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let code = match status {
        JoinStatus::Joined => {
            tracing::info!(chama_id = %id, user_id = %user_id, "member joined");
            StatusCode::CREATED
        }
        JoinStatus::Reactivated => {
            tracing::info!(chama_id = %id, user_id = %user_id, role = %membership.role, "member reactivated");
            StatusCode::OK
        }
        JoinStatus::AlreadyMember => StatusCode::OK,
    };

    Ok((code, Json(JoinResponse { status, membership })))
}

async fn reload(conn: &mut AsyncPgConnection, membership_id: &str) -> Result<Membership, ApiError> {
    let m = memberships::table
        .find(membership_id)
        .select(Membership::as_select())
        .first(conn)
        .await?;
    Ok(m)
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas/{id}/leave
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/chamas/{id}/leave",
    tag = "Chamas",
    params(("id" = String, Path, description = "Chama ID")),
    responses(
        (status = 204, description = "Membership deactivated"),
        (status = 403, description = "Not an active member", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
        (status = 409, description = "Caller is the last active admin", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn leave_chama(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    permissions::find_chama(&state.db, &id).await?;
    let membership = permissions::require_active_membership(&state.db, &id, &user_id).await?;

    let mut conn = state.db.get().await?;
    let chama_id = id.clone();

    conn.transaction::<_, ApiError, _>(|conn| {
        async move {
            if membership.role() == Some(Role::Admin)
                && permissions::other_admins(
                    &permissions::lock_active_admins(conn, &chama_id).await?,
                    &membership.id,
                ) == 0
            {
                return Err(ApiError::conflict(
                    "The last active admin cannot leave the chama",
                ));
            }

            diesel::update(memberships::table.find(&membership.id))
                .set(memberships::is_active.eq(false))
                .execute(conn)
                .await?;

            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    tracing::info!(chama_id = %id, user_id = %user_id, "member left");

    Ok(StatusCode::NO_CONTENT)
}
