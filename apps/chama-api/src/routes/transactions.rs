//! Group-level ledger transactions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::schema::transactions;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::extract::JsonBody;
use crate::models::transaction::{NewTransaction, Transaction, TransactionType};
use crate::permissions::{self, Capability};
use crate::validate;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/chamas/{id}/transactions",
        get(list_transactions).post(add_transaction),
    )
}

// ---------------------------------------------------------------------------
// POST /api/v1/chamas/{id}/transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddTransactionRequest {
    /// One of contribution, withdrawal, loan, expense, dividend, other.
    pub transaction_type: String,
    pub amount: Decimal,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub purpose: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/chamas/{id}/transactions",
    tag = "Transactions",
    params(("id" = String, Path, description = "Chama ID")),
    request_body = AddTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = Transaction),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 403, description = "Caller is not an admin, treasurer or chairperson", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn add_transaction(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<AddTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let mut errors = Vec::new();
    let transaction_type = match body.transaction_type.trim().parse::<TransactionType>() {
        Ok(t) => Some(t),
        Err(e) => {
            errors.push(FieldError::new("transaction_type", e.to_string()));
            None
        }
    };
    validate::amount(&mut errors, "amount", body.amount, validate::MIN_AMOUNT);
    let purpose = validate::required_text(&mut errors, "purpose", &body.purpose, validate::TITLE_MAX);
    let description =
        validate::optional_text(&mut errors, "description", body.description.as_deref(), None);
    ApiError::check(errors)?;
    let transaction_type = transaction_type.ok_or_else(|| {
        ApiError::invalid_field("transaction_type", "Unknown transaction type")
    })?;

    permissions::find_chama(&state.db, &id).await?;
    permissions::check_capability(&state.db, &id, &user_id, Capability::AddTransactions).await?;

    let now = Utc::now();
    let mut conn = state.db.get().await?;

    let row: Transaction = diesel::insert_into(transactions::table)
        .values(NewTransaction {
            id: state.snowflake.generate(),
            chama_id: &id,
            transaction_type: transaction_type.as_str(),
            amount: body.amount,
            date: body.date.unwrap_or_else(|| now.date_naive()),
            purpose: &purpose,
            description: &description,
            created_by: Some(&user_id),
            created_at: now,
        })
        .returning(Transaction::as_returning())
        .get_result(&mut conn)
        .await?;

    tracing::info!(
        chama_id = %id,
        user_id = %user_id,
        transaction_id = row.id,
        transaction_type = %transaction_type,
        amount = %row.amount,
        "transaction recorded"
    );

    Ok((StatusCode::CREATED, Json(row)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chamas/{id}/transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionList {
    pub data: Vec<Transaction>,
    pub count: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/chamas/{id}/transactions",
    tag = "Transactions",
    params(("id" = String, Path, description = "Chama ID")),
    responses(
        (status = 200, description = "Ledger entries, newest date first", body = TransactionList),
        (status = 403, description = "Not an active member", body = ApiErrorBody),
        (status = 404, description = "Chama not found", body = ApiErrorBody),
    ),
    security(("bearer" = [])),
)]
pub async fn list_transactions(
    AuthUser { user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionList>, ApiError> {
    permissions::find_chama(&state.db, &id).await?;
    permissions::require_active_membership(&state.db, &id, &user_id).await?;

    let mut conn = state.db.get().await?;

    let data: Vec<Transaction> = transactions::table
        .filter(transactions::chama_id.eq(&id))
        .order((
            transactions::date.desc(),
            transactions::created_at.desc(),
            transactions::id.desc(),
        ))
        .select(Transaction::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(TransactionList {
        count: data.len(),
        data,
    }))
}
