//! Extract → verify → enforce, composed in front of a protected operation.

use std::future::Future;

use super::bearer::extract_bearer;
use super::error::AuthError;
use super::permissions::check_permission;
use super::verifier::{TokenVerifier, VerifiedClaims};

#[derive(Debug, Clone)]
pub struct AuthGate {
    verifier: TokenVerifier,
}

impl AuthGate {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    pub async fn warm_up(&self) -> Result<usize, AuthError> {
        self.verifier.warm_up().await
    }

    /// Run the whole pipeline for one request and hand back the verified claims.
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
        required: &str,
    ) -> Result<VerifiedClaims, AuthError> {
        let token = extract_bearer(authorization)?;
        let claims = self.verifier.verify(token).await?;
        check_permission(&claims, required)?;
        Ok(claims)
    }

    /// Wrap `operation`: it only runs once `authorize` succeeded, and receives the
    /// verified claims. On failure the operation is never invoked.
    pub async fn guard<F, Fut, T>(
        &self,
        authorization: Option<&str>,
        required: &str,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(VerifiedClaims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(authorization, required).await?;
        Ok(operation(claims).await)
    }
}
