use axum::extract::{FromRequest, Request};
use axum::{Json, RequestExt};

use crate::error::ApiError;

/// A `Json<T>` extractor whose rejection maps to the same 422
/// `ApiError::Validation` shape as field-level validation failures,
/// instead of axum's default 400/415 — malformed JSON is a schema
/// violation here, not a transport error.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned + 'static,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = req
            .extract_with_state::<Json<T>, S, _>(state)
            .await
            .map_err(|rejection| ApiError::Validation(vec![rejection.to_string()]))?;
        Ok(Self(value))
    }
}
