use std::collections::BTreeSet;
use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;

use super::error::AuthError;
use super::jwks::KeySetCache;

/// Payload as it comes out of `jsonwebtoken::decode`. Never leaves this module.
#[derive(Debug, Deserialize)]
struct RawClaims {
    // not validated; a token without `sub` is still accepted
    #[serde(default)]
    sub: String,
    iss: String,
    // string or array; the audience check itself is done by `Validation`
    #[serde(default)]
    aud: serde_json::Value,
    exp: u64,
    #[serde(default)]
    iat: Option<u64>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Claims of a token that passed signature and claim validation.
///
/// Only `TokenVerifier::verify` builds this type, so holding one means the token
/// was verified. It is read-only and lives for a single request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedClaims {
    sub: String,
    iss: String,
    aud: Vec<String>,
    exp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permissions: Option<BTreeSet<String>>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl VerifiedClaims {
    fn from_raw(raw: RawClaims) -> Self {
        let aud = match raw.aud {
            serde_json::Value::String(s) => vec![s],
            serde_json::Value::Array(values) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        Self {
            sub: raw.sub,
            iss: raw.iss,
            aud,
            exp: raw.exp,
            iat: raw.iat,
            permissions: raw.permissions.map(|p| p.into_iter().collect()),
            extra: raw.extra,
        }
    }

    pub fn sub(&self) -> &str {
        &self.sub
    }

    pub fn iss(&self) -> &str {
        &self.iss
    }

    pub fn aud(&self) -> &[String] {
        &self.aud
    }

    pub fn exp(&self) -> u64 {
        self.exp
    }

    pub fn iat(&self) -> Option<u64> {
        self.iat
    }

    /// `None` when the token carries no `permissions` claim at all.
    pub fn permissions(&self) -> Option<&BTreeSet<String>> {
        self.permissions.as_ref()
    }

    /// Any other claim, e.g. `azp` or `scope`.
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

/// RSA access-token verifier backed by the identity provider's JWKS.
///
/// `jsonwebtoken::Validation` checks:
/// - signature, restricted to the configured allow-list
/// - `exp` (library-default leeway)
/// - `iss` == `https://{domain}/` and `aud` == configured audience
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<KeySetCache>,
    algorithms: Vec<Algorithm>,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.algorithms)
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig, keys: Arc<KeySetCache>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = config.algorithms.clone();
        validation.set_issuer(&[config.issuer()]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            keys,
            algorithms: config.algorithms.clone(),
            validation,
        }
    }

    pub async fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        // 1) unverified header: kid + alg
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            debug!(error = %e, "unparseable token header");
            AuthError::TokenInvalid
        })?;

        let kid = header
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AuthError::HeaderMalformed("Authorization malformed."))?;

        // 2) allow-list before any key lookup
        if !self.algorithms.contains(&header.alg) {
            warn!(alg = ?header.alg, "token signed with a disallowed algorithm");
            return Err(AuthError::TokenInvalid);
        }

        // 3) key by kid, pinned to the alg it was published with
        let published = self.keys.decoding_key(kid).await?;
        if !published.accepts(header.alg) {
            warn!(kid, alg = ?header.alg, "token alg differs from the key's published alg");
            return Err(AuthError::TokenInvalid);
        }

        // 4) signature + iss/aud/exp
        let data = jsonwebtoken::decode::<RawClaims>(token, &published.key, &self.validation)
            .map_err(classify)?;

        Ok(VerifiedClaims::from_raw(data.claims))
    }

    /// Load signing keys before the first request arrives.
    pub async fn warm_up(&self) -> Result<usize, AuthError> {
        self.keys.prefetch().await
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => {
            debug!(error = %err, "token claims rejected");
            AuthError::ClaimsInvalid
        }
        _ => {
            debug!(error = %err, "token rejected");
            AuthError::TokenInvalid
        }
    }
}

#[cfg(test)]
pub(crate) fn claims_for_test(permissions: Option<&[&str]>) -> VerifiedClaims {
    VerifiedClaims {
        sub: "auth0|tester".into(),
        iss: "https://dom/".into(),
        aud: vec!["casting".into()],
        exp: u64::MAX,
        iat: None,
        permissions: permissions.map(|p| p.iter().map(|s| s.to_string()).collect()),
        extra: serde_json::Map::new(),
    }
}
