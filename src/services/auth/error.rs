//! Authentication / authorization failures.
//!
//! Every variant maps to exactly one `(code, status)` pair. The description is the
//! only text that reaches the client; library error details stay in the logs.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    HeaderMissing,

    #[error("{0}")]
    HeaderMalformed(&'static str),

    #[error("Unable to find the appropriate key.")]
    KeyNotFound,

    #[error("Unable to parse authentication token.")]
    TokenInvalid,

    #[error("Incorrect claims. Please, check the audience and issuer.")]
    ClaimsInvalid,

    #[error("Token expired.")]
    TokenExpired,

    #[error("Permissions not included in JWT.")]
    PermissionsMissing,

    #[error("Permission not found.")]
    PermissionDenied,

    #[error("Unable to load signing keys.")]
    KeySetUnavailable,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::HeaderMissing => "authorization_header_missing",
            Self::HeaderMalformed(_) | Self::KeyNotFound | Self::TokenInvalid => "invalid_header",
            Self::ClaimsInvalid | Self::PermissionsMissing => "invalid_claims",
            Self::TokenExpired => "token_expired",
            Self::PermissionDenied => "unauthorized",
            Self::KeySetUnavailable => "jwks_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::HeaderMissing
            | Self::HeaderMalformed(_)
            | Self::ClaimsInvalid
            | Self::TokenExpired
            | Self::KeySetUnavailable => StatusCode::UNAUTHORIZED,
            Self::KeyNotFound | Self::TokenInvalid | Self::PermissionsMissing => {
                StatusCode::BAD_REQUEST
            }
            Self::PermissionDenied => StatusCode::FORBIDDEN,
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AuthError::HeaderMissing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::KeyNotFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PermissionsMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::PermissionDenied.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn upstream_failure_is_not_reported_as_missing_key() {
        assert_ne!(AuthError::KeySetUnavailable.code(), AuthError::KeyNotFound.code());
        assert_ne!(
            AuthError::KeySetUnavailable.description(),
            AuthError::KeyNotFound.description()
        );
    }
}
