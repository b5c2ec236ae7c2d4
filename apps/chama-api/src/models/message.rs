use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::messages;

/// Private message between two users who share a chama.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: i64,
    pub sender_id: String,
    pub recipient_id: String,
    pub subject: String,
    pub content: String,
    pub chama_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage<'a> {
    pub id: i64,
    pub sender_id: &'a str,
    pub recipient_id: &'a str,
    pub subject: &'a str,
    pub content: &'a str,
    pub chama_id: Option<&'a str>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Message with both correspondents' usernames.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageEntry {
    #[serde(flatten)]
    pub message: Message,
    pub sender_username: String,
    pub recipient_username: String,
}
