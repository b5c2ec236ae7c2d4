use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::memberships;
use crate::permissions::{Capability, Role};

/// A user's standing in one chama. Unique per (chama, user); leaving only
/// clears `is_active`.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = memberships)]
pub struct Membership {
    pub id: String,
    pub chama_id: String,
    pub user_id: String,
    pub role: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// `None` if the stored role is not one we know, which grants nothing.
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.is_active && self.role().is_some_and(|r| r.grants(capability))
    }

    pub fn can_edit_group(&self) -> bool {
        self.can(Capability::EditGroup)
    }

    pub fn can_add_transactions(&self) -> bool {
        self.can(Capability::AddTransactions)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = memberships)]
pub struct NewMembership<'a> {
    pub id: &'a str,
    pub chama_id: &'a str,
    pub user_id: &'a str,
    pub role: &'a str,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Role and active-flag changes; unset fields are left as they are.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = memberships)]
pub struct UpdateMembership {
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateMembership {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_active.is_none()
    }
}

/// Membership with the member's username, for listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct MemberEntry {
    #[serde(flatten)]
    pub membership: Membership,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_contributed: Option<Decimal>,
}
