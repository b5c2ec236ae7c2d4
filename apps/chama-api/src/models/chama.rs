use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::chamas;
use crate::models::membership::{MemberEntry, Membership};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = chamas)]
pub struct Chama {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: Option<String>,
    pub contribution_amount: Decimal,
    pub contribution_frequency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chamas)]
pub struct NewChama<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub created_by: Option<&'a str>,
    pub contribution_amount: Decimal,
    pub contribution_frequency: &'a str,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = chamas)]
pub struct UpdateChama {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contribution_amount: Option<Decimal>,
    pub contribution_frequency: Option<String>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

/// Row in the chama list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChamaSummary {
    #[serde(flatten)]
    pub chama: Chama,
    pub member_count: i64,
    pub is_member: bool,
}

/// The acting user's standing in a chama.
#[derive(Debug, Serialize, ToSchema)]
pub struct ViewerMembership {
    #[serde(flatten)]
    pub membership: Membership,
    pub can_edit: bool,
    pub can_add_transactions: bool,
}

/// Chama detail: settings plus the aggregates shown alongside them.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChamaDetail {
    #[serde(flatten)]
    pub chama: Chama,
    pub member_count: i64,
    pub total_contributions: Decimal,
    /// Active admins and chairpersons.
    pub admins: Vec<MemberEntry>,
    pub membership: Option<ViewerMembership>,
}
