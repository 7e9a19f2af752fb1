//! JSON API behind the WebApp dashboard.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod error;
pub mod middleware;
pub mod offers;
pub mod orders;
pub mod payments;
pub mod routes;
pub mod tickets;
pub mod users;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::error;

use parcel_core::OpResult;

pub use auth::{AppState, AppStateInner};
pub use error::{ApiError, ApiResult};
pub use routes::router;

/// Runs a blocking domain call off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> OpResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}

/// `Json` whose rejections use the API's JSON error body.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Parses an optional JSON body; an empty body yields `T::default()`.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}
