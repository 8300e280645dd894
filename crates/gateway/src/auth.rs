//! Minimal stand-in for the external authentication collaborator

use crate::error::GatewayError;
use axum::http::HeaderMap;

pub struct AuthContext {
    pub user_id: String,
    pub org_id: Option<String>,
    pub role: Option<String>,
}

pub fn authenticate(headers: &HeaderMap) -> Result<AuthContext, GatewayError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::AuthRequired)?
        .to_string();
    let org_id = headers
        .get("x-org-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok(AuthContext { user_id, org_id, role })
}
