//! The signed-in user's own account and profile.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::pool::DbPool;
use crate::db::schema::{user_profiles, users};
use crate::error::{ApiError, ApiErrorBody};
use crate::extract::JsonBody;
use crate::models::profile::{UpdateUserProfile, UserProfile};
use crate::models::user::{UpdateUser, User, UserResponse};
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub profile: UserProfile,
}

/// Load a user together with their profile row.
pub async fn load_profile(pool: &DbPool, user_id: &str) -> Result<(User, UserProfile), ApiError> {
    let mut conn = pool.get().await?;

    users::table
        .inner_join(user_profiles::table)
        .filter(users::id.eq(user_id))
        .select((User::as_select(), UserProfile::as_select()))
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

// ---------------------------------------------------------------------------
// GET /api/v1/profile
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Current account and profile", body = ProfileResponse),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn get_profile(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (user, profile) = load_profile(&state.db, &user_id).await?;

    Ok(Json(ProfileResponse {
        user: UserResponse::from(user),
        profile,
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/v1/profile
// ---------------------------------------------------------------------------

/// Full replacement of the editable account and profile fields. Omitted
/// optional fields are cleared. The profile role is not editable here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 401, description = "Not logged in", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn update_profile(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut errors = Vec::new();
    let first_name = validate::optional_text(
        &mut errors,
        "first_name",
        body.first_name.as_deref(),
        Some(validate::NAME_MAX),
    );
    let last_name = validate::optional_text(
        &mut errors,
        "last_name",
        body.last_name.as_deref(),
        Some(validate::NAME_MAX),
    );
    let email = validate::email(&mut errors, "email", &body.email);
    let phone_number = validate::optional_text(
        &mut errors,
        "phone_number",
        body.phone_number.as_deref(),
        Some(validate::PHONE_MAX),
    );
    let address = validate::optional_text(&mut errors, "address", body.address.as_deref(), None);
    let profile_picture =
        validate::http_url(&mut errors, "profile_picture", body.profile_picture.as_deref());
    if let Some(dob) = body.date_of_birth {
        if dob > Utc::now().date_naive() {
            errors.push(crate::error::FieldError::new(
                "date_of_birth",
                "Date of birth cannot be in the future",
            ));
        }
    }
    ApiError::check(errors)?;

    let now = Utc::now();
    let date_of_birth = body.date_of_birth;
    let uid = user_id.clone();

    let mut conn = state.db.get().await?;

    let (user, profile) = conn
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let user: User = diesel::update(users::table.find(&uid))
                    .set(UpdateUser {
                        first_name,
                        last_name,
                        email,
                        updated_at: now,
                    })
                    .returning(User::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| ApiError::not_found("User not found"))?;

                let profile: UserProfile = diesel::update(user_profiles::table.find(&uid))
                    .set(UpdateUserProfile {
                        phone_number,
                        address,
                        date_of_birth,
                        profile_picture,
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

    tracing::info!(user_id = %user_id, "profile updated");

    Ok(Json(ProfileResponse {
        user: UserResponse::from(user),
        profile,
    }))
}
