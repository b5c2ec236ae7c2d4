//! Registration, login, token refresh and logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::{self, Session};
use crate::db::schema::{user_profiles, users};
use crate::error::{is_unique_violation, ApiError, ApiErrorBody};
use crate::extract::JsonBody;
use crate::models::profile::{NewUserProfile, UserProfile};
use crate::models::user::{NewUser, User, UserResponse};
use crate::permissions::Role;
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/register
// ---------------------------------------------------------------------------

/// Registration form. Any `role` sent by the client is ignored: new accounts
/// are always plain members.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserResponse,
    pub profile: UserProfile,
    pub session: Session,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and logged in", body = RegisterResponse),
        (status = 400, description = "Invalid or duplicate fields", body = ApiErrorBody),
    ),
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let mut errors = Vec::new();
    let username = validate::username(&mut errors, &body.username);
    let email = validate::email(&mut errors, "email", &body.email);
    validate::password(&mut errors, &body.password, &body.password_confirm);
    let phone_number = validate::optional_text(
        &mut errors,
        "phone_number",
        body.phone_number.as_deref(),
        Some(validate::PHONE_MAX),
    );
    ApiError::check(errors)?;

    let password_hash = hash_password(&body.password)?;
    let user_id = chama_common::id::prefixed_ulid(chama_common::id::prefix::USER);
    let now = Utc::now();

    let mut conn = state.db.get().await?;

    let (user, profile) = conn
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let user: User = diesel::insert_into(users::table)
                    .values(NewUser {
                        id: &user_id,
                        username: &username,
                        email: &email,
                        password_hash: &password_hash,
                        first_name: "",
                        last_name: "",
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(User::as_returning())
                    .get_result(conn)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            ApiError::invalid_field(
                                "username",
                                "A user with that username already exists",
                            )
                        } else {
                            ApiError::from(e)
                        }
                    })?;

                let profile: UserProfile = diesel::insert_into(user_profiles::table)
                    .values(NewUserProfile {
                        user_id: &user_id,
                        role: Role::Member.as_str(),
                        phone_number: &phone_number,
                        address: "",
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(UserProfile::as_returning())
                    .get_result(conn)
                    .await?;

                Ok((user, profile))
            }
            .scope_boxed()
        })
        .await?;

    let session = tokens::issue_session(state.kv.as_ref(), &user.id).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse::from(user),
            profile,
            session,
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/login
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub session: Session,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ApiErrorBody),
        (status = 401, description = "Invalid credentials", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut errors = Vec::new();
    let username = validate::required_text(
        &mut errors,
        "username",
        &body.username,
        validate::USERNAME_MAX,
    );
    if body.password.is_empty() {
        errors.push(crate::error::FieldError::new("password", "This field is required"));
    }
    ApiError::check(errors)?;

    let mut conn = state.db.get().await?;

    let user: Option<User> = users::table
        .filter(users::username.eq(&username))
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    let user = match user {
        Some(u) if verify_password(&body.password, &u.password_hash)? => u,
        _ => {
            tracing::warn!(username = %username, "login refused");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let session = tokens::issue_session(state.kv.as_ref(), &user.id).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        user: UserResponse::from(user),
        session,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/refresh
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = Session),
        (status = 401, description = "Invalid refresh token", body = ApiErrorBody),
    ),
)]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshRequest>,
) -> Result<Json<Session>, ApiError> {
    let kv = state.kv.as_ref();

    // Consume the old refresh token (single-use rotation).
    let data = tokens::consume_refresh_token(kv, &body.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let session = tokens::issue_session(kv, &data.user_id).await?;

    Ok(Json(session))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/logout
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Access token revoked"),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn logout(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    tokens::revoke_access_token(state.kv.as_ref(), &auth.token).await?;

    tracing::info!(user_id = %auth.user_id, "user logged out");

    Ok(StatusCode::NO_CONTENT)
}
