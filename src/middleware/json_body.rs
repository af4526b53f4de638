use axum::{
    Json,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::PortalError;

/// JSON body extractor whose rejections use the `{ "status": ... }` shape
/// with a 400, like every other input failure of the API.
pub struct PortalJson<T>(pub T);

impl<T, S> FromRequest<S> for PortalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(PortalJson(value)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "rejecting request body");
                Err(PortalError::Validation(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                ))
                .into_response())
            }
        }
    }
}
