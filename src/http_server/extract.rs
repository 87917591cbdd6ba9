//! Request extraction
//!
//! The frontend posts JSON without always setting a content type, and some
//! endpoints are called with no body at all. An empty body reads as `{}`;
//! anything else must parse as JSON or the request is a `BadRequest`.
//! Path segments and query strings that fail to decode are `BadRequest` too.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::errors::{ApiError, ApiResult};

/// JSON body, lenient about content type and emptiness
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Unreadable request body: {}", e)))?;
        parse_body(&bytes).map(JsonBody)
    }
}

/// Path parameters; rejections become a `BadRequest` envelope
#[derive(Debug, Clone)]
pub struct PathParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::BadRequest(format!("Invalid path parameter: {}", e.body_text()))
            })?;
        Ok(PathParam(value))
    }
}

/// Query-string parameters; rejections become a `BadRequest` envelope
#[derive(Debug, Clone)]
pub struct QueryParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParam<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::BadRequest(format!("Invalid query string: {}", e.body_text()))
            })?;
        Ok(QueryParam(value))
    }
}

pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> ApiResult<T> {
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {}", e)))
}
