use crate::{errors::AppError, AppState};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

/// Proof that the request carried the server's admin token.
/// Add it as a handler argument to protect a route.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let expected = state.admin_token.as_deref().ok_or(AppError::DeleteDisabled)?;

        let presented = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(AppError::Unauthorized)?;

        if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            Ok(AdminAuth)
        } else {
            tracing::warn!("Rejected admin request with wrong token");
            Err(AppError::Unauthorized)
        }
    }
}

/// Compares without short-circuiting on the first differing byte.
/// Lengths still leak, which is acceptable for a random token.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
