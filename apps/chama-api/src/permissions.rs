use std::fmt;
use std::str::FromStr;

use diesel::prelude::*;
use diesel::result::OptionalExtension;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use diesel_async::AsyncPgConnection;

use crate::db::pool::DbPool;
use crate::db::schema::{chamas, memberships};
use crate::error::{ApiError, UnknownVariant};
use crate::models::chama::Chama;
use crate::models::membership::Membership;

/// A member's role. Global on a profile, and independent per chama on a
/// membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
    Treasurer,
    Chairperson,
}

/// Actions gated on a membership role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Edit chama settings, manage members, post announcements.
    EditGroup,
    /// Record group-level ledger transactions.
    AddTransactions,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Member, Role::Treasurer, Role::Chairperson];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Treasurer => "treasurer",
            Role::Chairperson => "chairperson",
        }
    }

    pub fn grants(self, capability: Capability) -> bool {
        match capability {
            Capability::EditGroup => matches!(self, Role::Admin | Role::Chairperson),
            Capability::AddTransactions => {
                matches!(self, Role::Admin | Role::Treasurer | Role::Chairperson)
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "role",
                value: s.to_string(),
            })
    }
}

impl Capability {
    fn denied_message(self) -> &'static str {
        match self {
            Capability::EditGroup => "Only the chama admin or chairperson can do this",
            Capability::AddTransactions => {
                "Only the chama admin, treasurer or chairperson can record transactions"
            }
        }
    }
}

/// Load a chama by ID.
pub async fn find_chama(pool: &DbPool, chama_id: &str) -> Result<Chama, ApiError> {
    let mut conn = pool.get().await?;

    diesel_async::RunQueryDsl::get_result(
        chamas::table.find(chama_id).select(Chama::as_select()),
        &mut conn,
    )
    .await
    .optional()?
    .ok_or_else(|| ApiError::not_found("Chama not found"))
}

/// Look up the (chama, user) membership row, active or not.
pub async fn find_membership(
    pool: &DbPool,
    chama_id: &str,
    user_id: &str,
) -> Result<Option<Membership>, ApiError> {
    let mut conn = pool.get().await?;

    let membership = diesel_async::RunQueryDsl::get_result(
        memberships::table
            .filter(memberships::chama_id.eq(chama_id))
            .filter(memberships::user_id.eq(user_id))
            .select(Membership::as_select()),
        &mut conn,
    )
    .await
    .optional()?;

    Ok(membership)
}

/// Require an active membership in the chama, any role.
pub async fn require_active_membership(
    pool: &DbPool,
    chama_id: &str,
    user_id: &str,
) -> Result<Membership, ApiError> {
    find_membership(pool, chama_id, user_id)
        .await?
        .filter(|m| m.is_active)
        .ok_or_else(|| ApiError::forbidden("You are not an active member of this chama"))
}

/// Require an active membership whose role grants `capability`.
pub async fn check_capability(
    pool: &DbPool,
    chama_id: &str,
    user_id: &str,
    capability: Capability,
) -> Result<Membership, ApiError> {
    let membership = require_active_membership(pool, chama_id, user_id).await?;

    if membership.can(capability) {
        Ok(membership)
    } else {
        Err(ApiError::forbidden(capability.denied_message()))
    }
}

/// Lock every active admin membership of the chama in id order and return
/// their ids. Must run inside a transaction, before any other membership row
/// of the chama is locked.
pub async fn lock_active_admins(
    conn: &mut AsyncPgConnection,
    chama_id: &str,
) -> Result<Vec<String>, ApiError> {
    let ids = diesel_async::RunQueryDsl::load(
        memberships::table
            .filter(memberships::chama_id.eq(chama_id))
            .filter(memberships::is_active.eq(true))
            .filter(memberships::role.eq(Role::Admin.as_str()))
            .order(memberships::id.asc())
            .select(memberships::id)
            .for_update(),
        conn,
    )
    .await?;

    Ok(ids)
}

/// How many of the locked admin memberships are not `excluding`.
pub fn other_admins(admin_ids: &[String], excluding: &str) -> usize {
    admin_ids.iter().filter(|id| id.as_str() != excluding).count()
}
