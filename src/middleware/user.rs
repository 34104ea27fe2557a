use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the authenticated caller, set by the gateway in front of us
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's user id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;

        let user_id = raw
            .to_str()
            .map_err(|_| AppError::InvalidInput(format!("{} must be visible ASCII", USER_ID_HEADER)))?
            .trim();

        if user_id.is_empty() {
            return Err(AppError::Unauthorized(format!(
                "empty {} header",
                USER_ID_HEADER
            )));
        }

        Ok(UserId(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<UserId, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        UserId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_user_header() {
        assert_eq!(extract(Some(" u42 ")).await.unwrap(), UserId("u42".to_string()));
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized(_))));
        assert!(matches!(extract(Some("  ")).await, Err(AppError::Unauthorized(_))));
    }
}
