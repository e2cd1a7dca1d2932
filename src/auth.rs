/// Caller identity extraction
///
/// Credentials are verified by an upstream gateway, which forwards the
/// authenticated user's id in the `x-user-id` header.
use crate::{context::AppContext, db::models::User, error::KindredError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Extract the caller id from request headers
pub fn extract_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Authenticated caller, resolved to an existing user
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: User,
}

impl UserContext {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for UserContext {
    type Rejection = KindredError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user_id = extract_user_id(&parts.headers)
            .ok_or_else(|| KindredError::Unauthorized("Missing x-user-id header".to_string()))?;

        let user = state
            .users
            .get_user(&user_id)
            .await?
            .ok_or_else(|| KindredError::Unauthorized("Unknown user".to_string()))?;

        Ok(UserContext { user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_user_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(extract_user_id(&headers), None);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" abc-123 "));
        assert_eq!(extract_user_id(&headers), Some("abc-123".to_string()));
    }
}
