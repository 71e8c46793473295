//! `Authorization: Bearer <jwt>` ヘッダからトークンを取り出す
//!
//! Only the header shape is checked here; the token itself is opaque until the
//! verifier looks at it.

use super::error::AuthError;

/// Extract the raw JWT from an `Authorization` header value.
///
/// An empty (or whitespace-only) header is treated the same as a missing one.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(AuthError::HeaderMissing)?;

    let mut parts = header.split_whitespace();

    let scheme = parts.next().ok_or(AuthError::HeaderMissing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::HeaderMalformed(
            "Authorization header must start with \"Bearer\".",
        ));
    }

    let token = parts
        .next()
        .ok_or(AuthError::HeaderMalformed("Token not found."))?;

    if parts.next().is_some() {
        return Err(AuthError::HeaderMalformed(
            "Authorization header must be bearer token.",
        ));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn returns_token_for_well_formed_header() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(Some("bearer abc")), Ok("abc"));
        assert_eq!(extract_bearer(Some("BEARER   abc  ")), Ok("abc"));
    }

    #[test]
    fn missing_or_empty_header() {
        for header in [None, Some(""), Some("   ")] {
            let err = extract_bearer(header).unwrap_err();
            assert_eq!(err, AuthError::HeaderMissing);
            assert_eq!(err.code(), "authorization_header_missing");
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn malformed_headers_are_401_invalid_header() {
        let cases = [
            ("Basic dXNlcjpwYXNz", "Authorization header must start with \"Bearer\"."),
            ("Token abc", "Authorization header must start with \"Bearer\"."),
            ("abc.def.ghi", "Authorization header must start with \"Bearer\"."),
            ("Bearer", "Token not found."),
            ("Bearer a b", "Authorization header must be bearer token."),
        ];

        for (header, description) in cases {
            let err = extract_bearer(Some(header)).unwrap_err();
            assert_eq!(err.code(), "invalid_header", "header: {header}");
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "header: {header}");
            assert_eq!(err.description(), description, "header: {header}");
        }
    }
}
