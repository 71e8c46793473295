//! Test fixtures: fixed RSA key pairs, scripted JWKS sources and token minting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

use crate::config::{AuthConfig, JwksPolicy};

use super::gate::AuthGate;
use super::jwks::{JsonWebKeySet, JwksError, JwksFetcher, KeySetCache};
use super::verifier::TokenVerifier;

pub const DOMAIN: &str = "dom";
pub const AUDIENCE: &str = "casting";
pub const ISSUER: &str = "https://dom/";

pub const PRIMARY_KID: &str = "primary-key";
pub const FOREIGN_KID: &str = "foreign-key";

const PRIMARY_PEM: &str = include_str!("testdata/primary.pem");
const FOREIGN_PEM: &str = include_str!("testdata/foreign.pem");
const JWKS: &str = include_str!("testdata/jwks.json");
const JWKS_ROTATED: &str = include_str!("testdata/jwks_rotated.json");

pub fn jwks_document() -> JsonWebKeySet {
    serde_json::from_str(JWKS).expect("fixture jwks")
}

pub fn rotated_document() -> JsonWebKeySet {
    serde_json::from_str(JWKS_ROTATED).expect("fixture jwks")
}

pub fn fast_policy() -> JwksPolicy {
    JwksPolicy {
        cache_ttl: Duration::from_secs(600),
        min_refresh_interval: Duration::from_secs(30),
        fetch_timeout: Duration::from_secs(1),
        fetch_attempts: 3,
        retry_backoff: Duration::from_millis(1),
    }
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(DOMAIN, AUDIENCE, vec![Algorithm::RS256]).expect("fixture config")
}

/// JWKS source that replays scripted documents and counts calls.
pub struct ScriptedFetcher {
    docs: Mutex<VecDeque<JsonWebKeySet>>,
    last: Mutex<Option<JsonWebKeySet>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedFetcher {
    pub fn always(doc: JsonWebKeySet) -> Self {
        Self::sequence(vec![doc])
    }

    /// Serves `docs` in order, then keeps serving the last one.
    pub fn sequence(docs: Vec<JsonWebKeySet>) -> Self {
        Self {
            docs: Mutex::new(docs.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self::sequence(Vec::new())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JwksFetcher for ScriptedFetcher {
    async fn fetch(&self) -> Result<JsonWebKeySet, JwksError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.docs.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(doc) = next {
            *last = Some(doc);
        }

        last.clone()
            .ok_or_else(|| JwksError::Transport("connection refused".into()))
    }
}

pub fn cache_with(fetcher: Arc<ScriptedFetcher>) -> Arc<KeySetCache> {
    Arc::new(KeySetCache::new(fetcher, fast_policy()))
}

pub fn verifier_with(fetcher: Arc<ScriptedFetcher>) -> TokenVerifier {
    TokenVerifier::new(&auth_config(), cache_with(fetcher))
}

pub fn gate_with(fetcher: Arc<ScriptedFetcher>) -> AuthGate {
    AuthGate::new(verifier_with(fetcher))
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims of a valid token for the fixture tenant.
pub fn claims(permissions: &[&str]) -> Value {
    json!({
        "sub": "auth0|casting-director",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "iat": now(),
        "exp": now() + 3600,
        "permissions": permissions,
    })
}

pub fn sign_with(alg: Algorithm, kid: Option<&str>, pem: &str, claims: &Value) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture pem");
    jsonwebtoken::encode(&header, claims, &key).expect("sign fixture token")
}

pub fn sign(claims: &Value) -> String {
    sign_with(Algorithm::RS256, Some(PRIMARY_KID), PRIMARY_PEM, claims)
}

pub fn sign_foreign(kid: &str, claims: &Value) -> String {
    sign_with(Algorithm::RS256, Some(kid), FOREIGN_PEM, claims)
}

pub fn primary_pem() -> &'static str {
    PRIMARY_PEM
}
