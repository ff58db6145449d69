use actix_web::HttpRequest;
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth as auth_service;

#[derive(Debug, Error)]
pub enum AuthMiddlewareError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
}

/// Extract the authenticated user ID from the Authorization header
pub fn extract_user_id(req: &HttpRequest, jwt_secret: &str) -> Result<Uuid, AuthMiddlewareError> {
    let token = bearer_token(req)?;

    auth_service::verify_jwt(token, jwt_secret).map_err(|_| AuthMiddlewareError::InvalidToken)
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthMiddlewareError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthMiddlewareError::MissingToken)?;

    header
        .to_str()
        .map_err(|_| AuthMiddlewareError::InvalidToken)?
        .strip_prefix("Bearer ")
        .ok_or(AuthMiddlewareError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_parses_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer some-token"))
            .to_http_request();

        assert_eq!(bearer_token(&req).unwrap(), "some-token");
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let req = TestRequest::default().to_http_request();

        assert!(matches!(
            bearer_token(&req),
            Err(AuthMiddlewareError::MissingToken)
        ));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_http_request();

        assert!(matches!(
            bearer_token(&req),
            Err(AuthMiddlewareError::InvalidToken)
        ));
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthMiddlewareError::MissingToken.to_string(),
            "Missing authorization token"
        );
        assert_eq!(
            AuthMiddlewareError::InvalidToken.to_string(),
            "Invalid authorization token"
        );
    }
}
