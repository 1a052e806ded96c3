//! Tenant identity taken from the `X-Client-ID` header

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fleetbill_common::{BillingError, TenantId};

pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Tenant making the request
#[derive(Debug, Clone, Copy)]
pub struct ClientId(pub TenantId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let raw = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .ok_or_else(|| {
                ApiError::new(
                    BillingError::Validation("Missing X-Client-ID header".into()),
                    path.as_str(),
                )
            })?
            .to_str()
            .map_err(|_| {
                ApiError::new(
                    BillingError::Validation("X-Client-ID header is not valid text".into()),
                    path.as_str(),
                )
            })?;

        TenantId::parse(raw)
            .map(ClientId)
            .map_err(|err| ApiError::new(err, path))
    }
}
