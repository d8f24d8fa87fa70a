//! # Custom Extractors & Conversion
//!
//! Helpers that turn extractor rejections into [`AppError`]s, and the
//! [`IntoDomain`] trait that converts request DTOs into engine inputs.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use custody_core::ValidationError;

use crate::error::AppError;

/// Request DTOs that parse into a typed engine input.
pub trait IntoDomain {
    /// The engine-side type.
    type Output;

    /// Parse, reporting the first field that fails.
    fn into_domain(self) -> Result<Self::Output, ValidationError>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
///     // use req...
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and convert it with [`IntoDomain`]. Conversion
/// failures become 422 validation errors naming the field.
pub fn extract_domain_json<T: IntoDomain>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Output, AppError> {
    let value = extract_json(result)?;
    Ok(value.into_domain()?)
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse an optional JSON body. An empty body yields `T::default()`.
pub fn optional_json<T>(bytes: &[u8]) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse the request body as JSON: {e}")))
}
