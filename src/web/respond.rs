//! Response writing and request body decoding helpers for handlers.

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

use super::context::Context;
use crate::error::AppError;

/// Serializes `data` as JSON with `status` and records the status in the
/// request values.
///
/// `204 No Content` is written without a body.
pub fn respond<T: Serialize>(ctx: &Context, data: T, status: StatusCode) -> Result<Response, AppError> {
    ctx.values().set_status_code(status);

    if status == StatusCode::NO_CONTENT {
        return Ok(status.into_response());
    }

    Ok((status, Json(data)).into_response())
}

/// Translates `err` into its client response and records the status.
pub fn respond_error(ctx: &Context, err: &AppError) -> Response {
    ctx.values().set_status_code(err.status());
    err.to_response()
}

/// Reads a JSON body and validates it.
///
/// # Errors
///
/// - `400` request error when the body is not valid JSON for `T`
/// - [`AppError::Validation`] when field validation fails
pub async fn decode<T>(req: Request) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let Json(value) = Json::<T>::from_request(req, &())
        .await
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    value.validate()?;

    Ok(value)
}
