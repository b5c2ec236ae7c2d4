//! Session access and refresh tokens.

use serde::{Deserialize, Serialize};

use crate::db::kv::KeyValueStore;
use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Opaque token generation
// ---------------------------------------------------------------------------

/// Generate an opaque random token with the given prefix.
pub fn generate_opaque_token(prefix: &str, bytes: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill(&mut buf[..]);
    format!("{}_{}", prefix, URL_SAFE_NO_PAD.encode(&buf))
}

/// Data stored alongside every session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
}

async fn store(
    kv: &dyn KeyValueStore,
    key: &str,
    data: &TokenData,
    ttl_secs: u64,
) -> Result<(), ApiError> {
    let value = serde_json::to_string(data).map_err(|_| ApiError::internal("serialization"))?;
    kv.set_ex(key, &value, ttl_secs).await
}

fn decode(value: &str) -> Result<TokenData, ApiError> {
    serde_json::from_str(value).map_err(|_| ApiError::internal("corrupt token data"))
}

// ---------------------------------------------------------------------------
// Access token (1-hour TTL)
// ---------------------------------------------------------------------------

pub const ACCESS_TTL_SECS: u64 = 3600;

fn access_key(token: &str) -> String {
    format!("chama:sat:{}", token)
}

pub fn generate_access_token() -> String {
    generate_opaque_token("sat", 32)
}

pub async fn store_access_token(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &TokenData,
) -> Result<(), ApiError> {
    store(kv, &access_key(token), data, ACCESS_TTL_SECS).await
}

pub async fn lookup_access_token(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<TokenData>, ApiError> {
    kv.get(&access_key(token))
        .await?
        .map(|v| decode(&v))
        .transpose()
}

pub async fn revoke_access_token(kv: &dyn KeyValueStore, token: &str) -> Result<(), ApiError> {
    kv.del(&access_key(token)).await
}

// ---------------------------------------------------------------------------
// Refresh token (30-day TTL, single use)
// ---------------------------------------------------------------------------

pub const REFRESH_TTL_SECS: u64 = 30 * 24 * 3600;

fn refresh_key(token: &str) -> String {
    format!("chama:srt:{}", token)
}

pub fn generate_refresh_token() -> String {
    generate_opaque_token("srt", 32)
}

pub async fn store_refresh_token(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &TokenData,
) -> Result<(), ApiError> {
    store(kv, &refresh_key(token), data, REFRESH_TTL_SECS).await
}

pub async fn consume_refresh_token(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<TokenData>, ApiError> {
    let val = kv.take(&refresh_key(token)).await?;
    val.map(|v| decode(&v)).transpose()
}

// ---------------------------------------------------------------------------
// Session issuance
// ---------------------------------------------------------------------------

/// A freshly issued access/refresh pair.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: String,
}

/// Issue and store a new access/refresh pair for `user_id`.
pub async fn issue_session(kv: &dyn KeyValueStore, user_id: &str) -> Result<Session, ApiError> {
    let access = generate_access_token();
    let refresh = generate_refresh_token();
    let data = TokenData {
        user_id: user_id.to_string(),
    };

    store_access_token(kv, &access, &data).await?;
    store_refresh_token(kv, &refresh, &data).await?;

    Ok(Session {
        access_token: access,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TTL_SECS,
        refresh_token: refresh,
    })
}
