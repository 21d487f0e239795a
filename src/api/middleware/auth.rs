use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::api::errors::ApiError;
use crate::api::state::AppState;
use crate::auth::jwt::{verify_token, Claims};

/// Verified admin identity for protected routes
///
/// Rejects with 401 when the bearer token is missing or invalid, and with
/// 403 when the token does not carry the admin role.
///
/// Usage:
/// ```rust,ignore
/// async fn protected_handler(
///     AdminAuth(claims): AdminAuth,
/// ) -> Result<String, ApiError> {
///     Ok(format!("Hello admin {}", claims.sub))
/// }
/// ```
pub struct AdminAuth(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid authorization format. Use: Bearer <token>"))?;

        let claims = verify_token(token, &state.jwt_secret)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        if !claims.is_admin() {
            return Err(ApiError::forbidden("Admin role required"));
        }

        Ok(AdminAuth(claims))
    }
}
