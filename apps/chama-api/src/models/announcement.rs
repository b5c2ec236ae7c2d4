use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::announcements;

/// Listed important-first, then newest-first.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = announcements)]
pub struct Announcement {
    pub id: i64,
    pub chama_id: String,
    pub title: String,
    pub content: String,
    pub created_by: Option<String>,
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcements)]
pub struct NewAnnouncement<'a> {
    pub id: i64,
    pub chama_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub created_by: Option<&'a str>,
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
}

/// Announcement with the chama it was posted to.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnnouncementEntry {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub chama_name: String,
    pub author: Option<String>,
}
