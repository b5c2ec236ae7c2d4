//! Per-user dashboard: a read-only composition of the caller's activity.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use diesel::dsl::{count_distinct, sum};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::schema::{
    announcements, chamas, contributions, memberships, messages, user_profiles, users,
};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::announcement::{Announcement, AnnouncementEntry};
use crate::models::contribution::Contribution;
use crate::models::profile::UserProfile;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentContribution {
    #[serde(flatten)]
    pub contribution: Contribution,
    pub chama_id: String,
    pub chama_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MyChama {
    pub id: String,
    pub name: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// System-wide figures, shown to global admins only.
#[derive(Debug, Serialize, ToSchema)]
pub struct GlobalStats {
    pub total_chamas: i64,
    pub total_members: i64,
    pub total_contributions: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub total_contributions: Decimal,
    pub recent_contributions: Vec<RecentContribution>,
    pub recent_announcements: Vec<AnnouncementEntry>,
    pub unread_messages: i64,
    pub chamas: Vec<MyChama>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<GlobalStats>,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "The caller's dashboard", body = Dashboard),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn dashboard(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Dashboard>, ApiError> {
    let mut conn = state.db.get().await?;

    let total_contributions: Option<Decimal> = contributions::table
        .inner_join(memberships::table)
        .filter(memberships::user_id.eq(&user_id))
        .select(sum(contributions::amount))
        .get_result(&mut conn)
        .await?;

    let recent_contributions: Vec<RecentContribution> = contributions::table
        .inner_join(memberships::table.inner_join(chamas::table))
        .filter(memberships::user_id.eq(&user_id))
        .order((
            contributions::date.desc(),
            contributions::created_at.desc(),
            contributions::id.desc(),
        ))
        .limit(RECENT_LIMIT)
        .select((Contribution::as_select(), chamas::id, chamas::name))
        .load::<(Contribution, String, String)>(&mut conn)
        .await?
        .into_iter()
        .map(|(contribution, chama_id, chama_name)| RecentContribution {
            contribution,
            chama_id,
            chama_name,
        })
        .collect();

    let my_chamas: Vec<MyChama> = memberships::table
        .inner_join(chamas::table)
        .filter(memberships::user_id.eq(&user_id))
        .filter(memberships::is_active.eq(true))
        .order(chamas::name.asc())
        .select((chamas::id, chamas::name, memberships::role, memberships::joined_at))
        .load::<(String, String, String, DateTime<Utc>)>(&mut conn)
        .await?
        .into_iter()
        .map(|(id, name, role, joined_at)| MyChama {
            id,
            name,
            role,
            joined_at,
        })
        .collect();

    let chama_ids: Vec<&str> = my_chamas.iter().map(|c| c.id.as_str()).collect();

    let mut recent_announcements: Vec<AnnouncementEntry> = announcements::table
        .inner_join(chamas::table)
        .left_join(users::table.on(announcements::created_by.eq(users::id.nullable())))
        .filter(announcements::chama_id.eq_any(chama_ids))
        .order((announcements::created_at.desc(), announcements::id.desc()))
        .limit(RECENT_LIMIT)
        .select((
            Announcement::as_select(),
            chamas::name,
            users::username.nullable(),
        ))
        .load::<(Announcement, String, Option<String>)>(&mut conn)
        .await?
        .into_iter()
        .map(|(announcement, chama_name, author)| AnnouncementEntry {
            announcement,
            chama_name,
            author,
        })
        .collect();
    // Newest five, important first. Stable sort keeps recency within each group.
    recent_announcements.sort_by_key(|entry| !entry.announcement.is_important);

    let unread_messages: i64 = messages::table
        .filter(messages::recipient_id.eq(&user_id))
        .filter(messages::is_read.eq(false))
        .count()
        .get_result(&mut conn)
        .await?;

    let profile: Option<UserProfile> = user_profiles::table
        .find(&user_id)
        .select(UserProfile::as_select())
        .first(&mut conn)
        .await
        .optional()?;
    let is_admin = profile.is_some_and(|p| p.is_admin());

    let admin = if is_admin {
        let total_chamas: i64 = chamas::table.count().get_result(&mut conn).await?;
        let total_members: i64 = memberships::table
            .filter(memberships::is_active.eq(true))
            .select(count_distinct(memberships::user_id))
            .get_result(&mut conn)
            .await?;
        let all_contributions: Option<Decimal> = contributions::table
            .select(sum(contributions::amount))
            .get_result(&mut conn)
            .await?;

        Some(GlobalStats {
            total_chamas,
            total_members,
            total_contributions: all_contributions.unwrap_or(Decimal::ZERO),
        })
    } else {
        None
    };

    Ok(Json(Dashboard {
        total_contributions: total_contributions.unwrap_or(Decimal::ZERO),
        recent_contributions,
        recent_announcements,
        unread_messages,
        chamas: my_chamas,
        admin,
    }))
}
