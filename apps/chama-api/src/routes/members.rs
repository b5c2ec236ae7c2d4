//! Chama member listing and management.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use scoped_futures::ScopedFutureExt;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::db::schema::{contributions, memberships, users};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::extract::JsonBody;
use crate::models::membership::{MemberEntry, Membership, UpdateMembership};
use crate::permissions::{self, Capability, Role};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chamas/{id}/members", get(list_members))
        .route("/chamas/{id}/members/{user_id}", patch(update_member))
}

/// Sum of contributions per membership, for the given memberships.
async fn totals_by_membership(
    conn: &mut AsyncPgConnection,
    membership_ids: Vec<&str>,
) -> Result<HashMap<String, Decimal>, ApiError> {
    let rows: Vec<(String, Option<Decimal>)> = contributions::table
        .filter(contributions::membership_id.eq_any(membership_ids))
        .group_by(contributions::membership_id)
        .select((contributions::membership_id, sum(contributions::amount)))
        .load(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, total)| (id, total.unwrap_or(Decimal::ZERO)))
        .collect())
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas/{id}/members
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMembersQuery {
    /// Also list deactivated members. Only honoured for admins and chairpersons.
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/chamas/{id}/members",
    tag = "Members",
    params(("id" = String, Path, description = "Chama ID"), ListMembersQuery),
    responses(
        (status = 200, description = "Members, newest join first", body = Vec<MemberEntry>),
        (status = 403, description = "Not an active member", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_members(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListMembersQuery>,
) -> Result<Json<Vec<MemberEntry>>, ApiError> {
    permissions::find_chama(&state.db, &id).await?;
    let viewer = permissions::require_active_membership(&state.db, &id, &user_id).await?;
    let include_inactive = query.include_inactive && viewer.can(Capability::EditGroup);

    let mut conn = state.db.get().await?;

    let mut q = memberships::table
        .inner_join(users::table)
        .filter(memberships::chama_id.eq(&id))
        .order((memberships::joined_at.desc(), memberships::id.desc()))
        .select((Membership::as_select(), users::username))
        .into_boxed();
    if !include_inactive {
        q = q.filter(memberships::is_active.eq(true));
    }
    let rows: Vec<(Membership, String)> = q.load(&mut conn).await?;

    let ids: Vec<&str> = rows.iter().map(|(m, _)| m.id.as_str()).collect();
    let totals = totals_by_membership(&mut conn, ids).await?;

    let entries = rows
        .into_iter()
        .map(|(membership, username)| MemberEntry {
            total_contributed: Some(
                totals
                    .get(&membership.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
            ),
            membership,
            username,
        })
        .collect();

    Ok(Json(entries))
}

// ---------------------------------------------------------------------------
// PATCH /api/v1/chamas/{id}/members/{user_id}
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[utoipa::path(
    patch,
    path = "/api/v1/chamas/{id}/members/{user_id}",
    tag = "Members",
    params(
        ("id" = String, Path, description = "Chama ID"),
        ("user_id" = String, Path, description = "Member's user ID"),
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Membership updated", body = MemberEntry),
        (status = 400, description = "Unknown role", body = ApiErrorBody),
        (status = 403, description = "Caller cannot manage members", body = ApiErrorBody),
        (status = 404, description = "Chama or member not found", body = ApiErrorBody),
        (status = 409, description = "Would leave the chama without an active admin", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn update_member(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path((id, target_user_id)): Path<(String, String)>,
    JsonBody(body): JsonBody<UpdateMemberRequest>,
) -> Result<Json<MemberEntry>, ApiError> {
    let role = match body.role.as_deref().map(str::trim) {
        None => None,
        Some(r) => Some(r.parse::<Role>().map_err(|e| {
            ApiError::validation(vec![FieldError::new("role", e.to_string())])
        })?),
    };
    let changes = UpdateMembership {
        role: role.map(|r| r.as_str().to_string()),
        is_active: body.is_active,
    };

    permissions::find_chama(&state.db, &id).await?;
    permissions::check_capability(&state.db, &id, &user_id, Capability::EditGroup).await?;

    if target_user_id == user_id {
        return Err(ApiError::forbidden("You cannot change your own membership"));
    }

    let mut conn = state.db.get().await?;
    let chama_id = id.clone();
    let target = target_user_id.clone();

    let membership = conn
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let admin_ids = permissions::lock_active_admins(conn, &chama_id).await?;
                let current: Membership = memberships::table
                    .filter(memberships::chama_id.eq(&chama_id))
                    .filter(memberships::user_id.eq(&target))
                    .select(Membership::as_select())
                    .for_update()
                    .get_result(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| ApiError::not_found("Member not found"))?;

                if changes.is_empty() {
                    return Ok(current);
                }

                let stays_admin = changes.is_active.unwrap_or(current.is_active)
                    && role.or(current.role()) == Some(Role::Admin);
                let is_active_admin = current.is_active && current.role() == Some(Role::Admin);
                if is_active_admin
                    && !stays_admin
                    && permissions::other_admins(&admin_ids, &current.id) == 0
                {
                    return Err(ApiError::conflict(
                        "A chama must keep at least one active admin",
                    ));
                }

                let updated: Membership = diesel::update(memberships::table.find(&current.id))
                    .set(&changes)
                    .returning(Membership::as_returning())
                    .get_result(conn)
                    .await?;

                Ok(updated)
            }
            .scope_boxed()
        })
        .await?;

    let username: String = users::table
        .find(&target_user_id)
        .select(users::username)
        .first(&mut conn)
        .await?;
    let totals = totals_by_membership(&mut conn, vec![membership.id.as_str()]).await?;

    tracing::info!(
        chama_id = %id,
        user_id = %user_id,
        member_id = %target_user_id,
        role = %membership.role,
        is_active = membership.is_active,
        "membership updated"
    );

    Ok(Json(MemberEntry {
        total_contributed: Some(
            totals
                .get(&membership.id)
                .copied()
                .unwrap_or(Decimal::ZERO),
        ),
        membership,
        username,
    }))
}
