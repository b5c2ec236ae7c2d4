//! Private messages between members who share an active chama.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::db::schema::{chamas, memberships, messages, users};
use crate::error::{ApiError, ApiErrorBody};
use crate::extract::JsonBody;
use crate::models::message::{Message, MessageEntry, NewMessage};
use crate::models::user::UserRef;
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(list_messages).post(send_message))
        .route("/messages/recipients", get(list_recipients))
        .route("/messages/{id}", get(get_message))
}

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// IDs of the chamas `user_id` is an active member of.
async fn active_chama_ids(
    conn: &mut AsyncPgConnection,
    user_id: &str,
) -> Result<Vec<String>, ApiError> {
    let ids = memberships::table
        .filter(memberships::user_id.eq(user_id))
        .filter(memberships::is_active.eq(true))
        .select(memberships::chama_id)
        .load(conn)
        .await?;
    Ok(ids)
}

/// Whether `other_id` is an active member of any of `chama_ids`.
async fn shares_active_chama(
    conn: &mut AsyncPgConnection,
    chama_ids: &[String],
    other_id: &str,
) -> Result<bool, ApiError> {
    let count: i64 = memberships::table
        .filter(memberships::user_id.eq(other_id))
        .filter(memberships::is_active.eq(true))
        .filter(memberships::chama_id.eq_any(chama_ids))
        .count()
        .get_result(conn)
        .await?;
    Ok(count > 0)
}

/// Attach sender and recipient usernames to a batch of messages.
async fn with_usernames(
    conn: &mut AsyncPgConnection,
    rows: Vec<Message>,
) -> Result<Vec<MessageEntry>, ApiError> {
    let mut ids: Vec<&str> = rows
        .iter()
        .flat_map(|m| [m.sender_id.as_str(), m.recipient_id.as_str()])
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let names: HashMap<String, String> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::username))
        .load::<(String, String)>(conn)
        .await?
        .into_iter()
        .collect();

    Ok(rows
        .into_iter()
        .map(|message| MessageEntry {
            sender_username: names.get(&message.sender_id).cloned().unwrap_or_default(),
            recipient_username: names
                .get(&message.recipient_id)
                .cloned()
                .unwrap_or_default(),
            message,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// GET /api/v1/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    /// Maximum messages per folder (default 50, max 200).
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Mailbox {
    pub received: Vec<MessageEntry>,
    pub sent: Vec<MessageEntry>,
    pub unread_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "Messages",
    params(ListMessagesQuery),
    responses(
        (status = 200, description = "Inbox and sent messages, newest first", body = Mailbox),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_messages(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListMessagesQuery>,
) -> Result<Json<Mailbox>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut conn = state.db.get().await?;

    let received: Vec<Message> = messages::table
        .filter(messages::recipient_id.eq(&user_id))
        .order((messages::created_at.desc(), messages::id.desc()))
        .limit(limit)
        .select(Message::as_select())
        .load(&mut conn)
        .await?;

    let sent: Vec<Message> = messages::table
        .filter(messages::sender_id.eq(&user_id))
        .order((messages::created_at.desc(), messages::id.desc()))
        .limit(limit)
        .select(Message::as_select())
        .load(&mut conn)
        .await?;

    let unread_count: i64 = messages::table
        .filter(messages::recipient_id.eq(&user_id))
        .filter(messages::is_read.eq(false))
        .count()
        .get_result(&mut conn)
        .await?;

    Ok(Json(Mailbox {
        received: with_usernames(&mut conn, received).await?,
        sent: with_usernames(&mut conn, sent).await?,
        unread_count,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/v1/messages/recipients
// ---------------------------------------------------------------------------

#[derive(Debug, Queryable, Serialize, ToSchema)]
pub struct ChamaRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipientOptions {
    /// Users sharing at least one active chama with the caller.
    pub recipients: Vec<UserRef>,
    /// Chamas the caller may attach to a message.
    pub chamas: Vec<ChamaRef>,
}

#[utoipa::path(
    get,
    path = "/api/v1/messages/recipients",
    tag = "Messages",
    responses(
        (status = 200, description = "Valid recipients and taggable chamas", body = RecipientOptions),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_recipients(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RecipientOptions>, ApiError> {
    let mut conn = state.db.get().await?;

    let chama_ids = active_chama_ids(&mut conn, &user_id).await?;

    let recipients: Vec<UserRef> = memberships::table
        .inner_join(users::table)
        .filter(memberships::chama_id.eq_any(&chama_ids))
        .filter(memberships::is_active.eq(true))
        .filter(memberships::user_id.ne(&user_id))
        .select((users::id, users::username))
        .distinct()
        .order(users::username.asc())
        .load(&mut conn)
        .await?;

    let chamas: Vec<ChamaRef> = chamas::table
        .filter(chamas::id.eq_any(&chama_ids))
        .order(chamas::name.asc())
        .select((chamas::id, chamas::name))
        .load(&mut conn)
        .await?;

    Ok(Json(RecipientOptions { recipients, chamas }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub recipient_id: String,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub chama_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "Messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Invalid recipient, chama or fields", body = ApiErrorBody),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn send_message(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let mut errors = Vec::new();
    let recipient_id = validate::required_text(
        &mut errors,
        "recipient_id",
        &body.recipient_id,
        usize::MAX,
    );
    let subject = validate::required_text(&mut errors, "subject", &body.subject, validate::TITLE_MAX);
    let content = validate::required_text(&mut errors, "content", &body.content, usize::MAX);
    let chama_id = body
        .chama_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    ApiError::check(errors)?;

    if recipient_id == user_id {
        return Err(ApiError::invalid_field(
            "recipient_id",
            "You cannot send a message to yourself",
        ));
    }

    let mut conn = state.db.get().await?;

    let sender_chamas = active_chama_ids(&mut conn, &user_id).await?;

    if let Some(chama_id) = &chama_id {
        if !sender_chamas.contains(chama_id) {
            return Err(ApiError::invalid_field(
                "chama_id",
                "Select a chama you are an active member of",
            ));
        }
    }

    if !shares_active_chama(&mut conn, &sender_chamas, &recipient_id).await? {
        return Err(ApiError::invalid_field(
            "recipient_id",
            "You can only message members of your chamas",
        ));
    }

    let row: Message = diesel::insert_into(messages::table)
        .values(NewMessage {
            id: state.snowflake.generate(),
            sender_id: &user_id,
            recipient_id: &recipient_id,
            subject: &subject,
            content: &content,
            chama_id: chama_id.as_deref(),
            is_read: false,
            created_at: Utc::now(),
        })
        .returning(Message::as_returning())
        .get_result(&mut conn)
        .await?;

    tracing::info!(
        message_id = row.id,
        sender_id = %user_id,
        recipient_id = %recipient_id,
        "message sent"
    );

    Ok((StatusCode::CREATED, Json(row)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/messages/{id}
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/messages/{id}",
    tag = "Messages",
    params(("id" = i64, Path, description = "Message ID")),
    responses(
        (status = 200, description = "The message; marked read on the recipient's first view", body = MessageEntry),
        (status = 403, description = "Caller is neither sender nor recipient", body = ApiErrorBody),
        (status = 404, description = "Message not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn get_message(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageEntry>, ApiError> {
    let mut conn = state.db.get().await?;

    let mut message: Message = messages::table
        .find(id)
        .select(Message::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    if !message.involves(&user_id) {
        return Err(ApiError::forbidden("You do not have access to this message"));
    }

    if message.recipient_id == user_id && !message.is_read {
        // Only the view that actually flips the flag writes anything.
        let flipped = diesel::update(
            messages::table
                .find(id)
                .filter(messages::is_read.eq(false)),
        )
        .set(messages::is_read.eq(true))
        .execute(&mut conn)
        .await?;

        if flipped > 0 {
            tracing::info!(message_id = id, user_id = %user_id, "message read");
        }
        message.is_read = true;
    }

    let mut entries = with_usernames(&mut conn, vec![message]).await?;
    entries
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::internal("An internal error occurred"))
}
