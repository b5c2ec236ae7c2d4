use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body whose rejections (bad syntax, missing or mistyped
/// fields) answer with the `VALIDATION_ERROR` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
