use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::user_profiles;
use crate::permissions::Role;

/// Per-user profile. Created together with the user at registration.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = user_profiles)]
pub struct UserProfile {
    pub user_id: String,
    pub role: String,
    pub phone_number: String,
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_profiles)]
pub struct NewUserProfile<'a> {
    pub user_id: &'a str,
    pub role: &'a str,
    pub phone_number: &'a str,
    pub address: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields written by a profile edit. `None` on the nullable columns
/// clears them.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = user_profiles)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateUserProfile {
    pub phone_number: String,
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    pub profile_picture: Option<String>,
    pub updated_at: DateTime<Utc>,
}
