//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! - The key set is fetched from `https://{domain}/.well-known/jwks.json` and kept
//!   as an immutable snapshot (`Arc<KeySet>`). A refresh swaps the whole snapshot,
//!   so a reader never sees a half-updated set.
//! - Refreshes are single-flight: concurrent misses queue on one gate and reuse the
//!   outcome of the fetch that was in flight when they arrived.
//! - Every fetch attempt is bounded by a timeout; attempts are bounded too. A failed
//!   refresh surfaces as `AuthError::KeySetUnavailable`, never as a missing key.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{AuthConfig, JwksPolicy};

use super::error::AuthError;

/// One entry of the published key set. Only the RSA parameters are interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKey {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// Transport-level failures while loading the key set.
///
/// Kept apart from `AuthError` so the cache can log the detail and retry before
/// collapsing everything into `KeySetUnavailable`.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("jwks request failed: {0}")]
    Transport(String),
    #[error("jwks endpoint returned HTTP {0}")]
    Status(u16),
    #[error("jwks document is malformed: {0}")]
    Malformed(String),
}

/// Source of the key set. The HTTP implementation is used in production; tests
/// inject their own to count and script fetches.
#[async_trait]
pub trait JwksFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> Result<JsonWebKeySet, JwksError>;
}

#[derive(Debug, Clone)]
pub struct HttpJwksFetcher {
    url: String,
    client: reqwest::Client,
}

impl HttpJwksFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JwksError::Transport(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    async fn fetch(&self) -> Result<JsonWebKeySet, JwksError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| JwksError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Status(response.status().as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JwksError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| JwksError::Malformed(e.to_string()))
    }
}

/// A verification key plus the algorithm it was published for, if any.
#[derive(Clone)]
pub struct PublishedKey {
    pub key: DecodingKey,
    pub alg: Option<Algorithm>,
}

impl PublishedKey {
    /// A key published with `alg` only verifies tokens signed with that algorithm.
    pub fn accepts(&self, alg: Algorithm) -> bool {
        self.alg.is_none_or(|pinned| pinned == alg)
    }
}

/// Immutable, parsed view of one fetched key set.
pub struct KeySet {
    keys: HashMap<String, PublishedKey>,
    fetched_at: Instant,
    generation: u64,
}

impl KeySet {
    fn from_document(doc: JsonWebKeySet, generation: u64) -> Self {
        let mut keys = HashMap::with_capacity(doc.keys.len());

        for jwk in doc.keys {
            let Some(kid) = jwk.kid.filter(|k| !k.is_empty()) else {
                debug!("skipping jwk without kid");
                continue;
            };
            if jwk.kty != "RSA" {
                debug!(kid = %kid, kty = %jwk.kty, "skipping non-RSA jwk");
                continue;
            }
            if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
                debug!(kid = %kid, "skipping jwk not meant for signatures");
                continue;
            }
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                debug!(kid = %kid, "skipping RSA jwk without n/e");
                continue;
            };

            let alg = match jwk.alg.as_deref().map(Algorithm::from_str) {
                None => None,
                Some(Ok(alg)) => Some(alg),
                Some(Err(_)) => {
                    debug!(kid = %kid, alg = ?jwk.alg, "skipping jwk with unknown alg");
                    continue;
                }
            };

            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    keys.insert(kid, PublishedKey { key, alg });
                }
                Err(err) => debug!(kid = %kid, error = %err, "skipping undecodable RSA jwk"),
            }
        }

        Self {
            keys,
            fetched_at: Instant::now(),
            generation,
        }
    }

    pub fn get(&self, kid: &str) -> Option<&PublishedKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

pub struct KeySetCache {
    fetcher: Arc<dyn JwksFetcher>,
    policy: JwksPolicy,
    current: RwLock<Option<Arc<KeySet>>>,
    // Bumped after every completed refresh, successful or not.
    refresh_epoch: AtomicU64,
    // Held for the duration of a fetch; guards the outcome of the last refresh.
    refresh_gate: Mutex<Option<AuthError>>,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("policy", &self.policy)
            .field("refresh_epoch", &self.refresh_epoch)
            .finish()
    }
}

impl KeySetCache {
    pub fn new(fetcher: Arc<dyn JwksFetcher>, policy: JwksPolicy) -> Self {
        Self {
            fetcher,
            policy,
            current: RwLock::new(None),
            refresh_epoch: AtomicU64::new(0),
            refresh_gate: Mutex::new(None),
        }
    }

    /// Cache backed by the identity provider's well-known JWKS endpoint.
    pub fn from_config(auth: &AuthConfig, policy: JwksPolicy) -> Result<Self, JwksError> {
        let fetcher = HttpJwksFetcher::new(auth.jwks_url(), policy.fetch_timeout)?;
        Ok(Self::new(Arc::new(fetcher), policy))
    }

    /// Resolve `kid` to a verification key, refreshing the set when it is stale or
    /// when an unknown kid shows up on a set old enough to have been rotated.
    pub async fn decoding_key(&self, kid: &str) -> Result<PublishedKey, AuthError> {
        let snapshot = self.snapshot();

        if let Some(set) = snapshot.as_deref()
            && set.age() < self.policy.cache_ttl
        {
            if let Some(key) = set.get(kid) {
                return Ok(key.clone());
            }
            if set.age() < self.policy.min_refresh_interval {
                return Err(AuthError::KeyNotFound);
            }
        }

        let set = self.refresh().await?;
        set.get(kid).cloned().ok_or(AuthError::KeyNotFound)
    }

    /// Load the key set ahead of the first request.
    pub async fn prefetch(&self) -> Result<usize, AuthError> {
        let set = self.refresh().await?;
        Ok(set.len())
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot()
            .is_some_and(|set| set.age() < self.policy.cache_ttl)
    }

    fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn refresh(&self) -> Result<Arc<KeySet>, AuthError> {
        let epoch = self.refresh_epoch.load(Ordering::Acquire);
        let mut last_outcome = self.refresh_gate.lock().await;

        // A refresh finished while we were queued: share its outcome.
        if self.refresh_epoch.load(Ordering::Acquire) != epoch {
            if let Some(err) = last_outcome.as_ref() {
                return Err(err.clone());
            }
            if let Some(set) = self.snapshot() {
                return Ok(set);
            }
        }

        let outcome = self.fetch_with_retry().await;

        let result = match outcome {
            Ok(doc) => {
                let generation = self.snapshot().map_or(1, |s| s.generation + 1);
                let set = Arc::new(KeySet::from_document(doc, generation));
                if set.is_empty() {
                    warn!("jwks contains no usable signing keys");
                }
                info!(generation, keys = set.len(), "jwks refreshed");

                *self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(set.clone());
                *last_outcome = None;
                Ok(set)
            }
            Err(err) => {
                *last_outcome = Some(err.clone());
                Err(err)
            }
        };

        self.refresh_epoch.fetch_add(1, Ordering::Release);
        result
    }

    async fn fetch_with_retry(&self) -> Result<JsonWebKeySet, AuthError> {
        let attempts = self.policy.fetch_attempts.max(1);
        let mut delay = self.policy.retry_backoff;

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.policy.fetch_timeout, self.fetcher.fetch()).await {
                Ok(Ok(doc)) => return Ok(doc),
                Ok(Err(err)) => warn!(attempt, attempts, error = %err, "jwks fetch failed"),
                Err(_) => warn!(
                    attempt,
                    attempts,
                    timeout = ?self.policy.fetch_timeout,
                    "jwks fetch timed out"
                ),
            }

            if attempt < attempts {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }

        Err(AuthError::KeySetUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::testing::{ScriptedFetcher, fast_policy, jwks_document, rotated_document};

    #[test]
    fn parsing_keeps_only_rsa_signing_keys_with_kid() {
        let set = KeySet::from_document(jwks_document(), 1);
        assert_eq!(set.len(), 1);
        assert!(set.get("primary-key").is_some());
        assert!(set.get("ec-key").is_none());
        assert!(set.get("enc-key").is_none());
        assert_eq!(set.get("primary-key").map(|k| k.alg), Some(Some(Algorithm::RS256)));
    }

    #[test]
    fn key_without_alg_accepts_any_allowed_algorithm() {
        let mut doc = jwks_document();
        doc.keys.retain(|k| k.kid.as_deref() == Some("primary-key"));
        doc.keys[0].alg = None;

        let set = KeySet::from_document(doc, 1);
        let key = set.get("primary-key").unwrap();

        assert!(key.accepts(Algorithm::RS256));
        assert!(key.accepts(Algorithm::PS512));
    }

    #[test]
    fn key_with_unknown_alg_is_skipped() {
        let mut doc = jwks_document();
        doc.keys.retain(|k| k.kid.as_deref() == Some("primary-key"));
        doc.keys[0].alg = Some("XS999".into());

        assert!(KeySet::from_document(doc, 1).is_empty());
    }

    #[test]
    fn malformed_document_is_rejected_by_serde() {
        let err = serde_json::from_str::<JsonWebKeySet>(r#"{"kid":"x"}"#);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn concurrent_misses_issue_a_single_fetch() {
        let fetcher = Arc::new(
            ScriptedFetcher::always(jwks_document()).with_delay(Duration::from_millis(100)),
        );
        let cache = Arc::new(KeySetCache::new(fetcher.clone(), fast_policy()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.decoding_key("primary-key").await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(fetcher.calls(), 1);
        assert!(cache.is_cached());
    }

    #[tokio::test]
    async fn unknown_kid_on_a_fresh_set_does_not_refetch() {
        let fetcher = Arc::new(ScriptedFetcher::always(jwks_document()));
        let cache = KeySetCache::new(fetcher.clone(), fast_policy());

        assert!(cache.decoding_key("primary-key").await.is_ok());
        let err = cache.decoding_key("unknown-key").await.err();

        assert_eq!(err, Some(AuthError::KeyNotFound));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_kid_after_min_interval_picks_up_rotated_keys() {
        let fetcher = Arc::new(ScriptedFetcher::sequence(vec![
            jwks_document(),
            rotated_document(),
        ]));
        let policy = JwksPolicy {
            min_refresh_interval: Duration::ZERO,
            ..fast_policy()
        };
        let cache = KeySetCache::new(fetcher.clone(), policy);

        assert!(cache.decoding_key("primary-key").await.is_ok());
        assert!(cache.decoding_key("foreign-key").await.is_ok());
        assert_eq!(fetcher.calls(), 2);

        // the old key is gone after rotation
        let err = cache.decoding_key("primary-key").await.err();
        assert_eq!(err, Some(AuthError::KeyNotFound));
    }

    #[tokio::test]
    async fn stale_set_is_refreshed() {
        let fetcher = Arc::new(ScriptedFetcher::always(jwks_document()));
        let policy = JwksPolicy {
            cache_ttl: Duration::ZERO,
            ..fast_policy()
        };
        let cache = KeySetCache::new(fetcher.clone(), policy);

        assert!(cache.decoding_key("primary-key").await.is_ok());
        assert!(cache.decoding_key("primary-key").await.is_ok());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_is_bounded_and_distinct_from_missing_key() {
        let fetcher = Arc::new(ScriptedFetcher::failing());
        let policy = JwksPolicy {
            fetch_attempts: 3,
            ..fast_policy()
        };
        let cache = KeySetCache::new(fetcher.clone(), policy);

        let err = cache.decoding_key("primary-key").await.err();

        assert_eq!(err, Some(AuthError::KeySetUnavailable));
        assert_eq!(fetcher.calls(), 3);
        assert!(!cache.is_cached());
    }

    #[tokio::test]
    async fn hung_fetch_times_out() {
        let fetcher = Arc::new(
            ScriptedFetcher::always(jwks_document()).with_delay(Duration::from_secs(30)),
        );
        let policy = JwksPolicy {
            fetch_timeout: Duration::from_millis(20),
            fetch_attempts: 2,
            ..fast_policy()
        };
        let cache = KeySetCache::new(fetcher.clone(), policy);

        let started = Instant::now();
        let err = cache.decoding_key("primary-key").await.err();

        assert_eq!(err, Some(AuthError::KeySetUnavailable));
        assert_eq!(fetcher.calls(), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn queued_callers_share_a_failed_refresh() {
        let fetcher =
            Arc::new(ScriptedFetcher::failing().with_delay(Duration::from_millis(200)));
        let policy = JwksPolicy {
            fetch_attempts: 1,
            ..fast_policy()
        };
        let cache = Arc::new(KeySetCache::new(fetcher.clone(), policy));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.decoding_key("primary-key").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().err(), Some(AuthError::KeySetUnavailable));
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn prefetch_reports_usable_key_count() {
        let fetcher = Arc::new(ScriptedFetcher::always(jwks_document()));
        let cache = KeySetCache::new(fetcher, fast_policy());

        assert_eq!(cache.prefetch().await, Ok(1));
        assert!(cache.is_cached());
    }

    #[test]
    fn http_fetcher_targets_well_known_url() {
        let auth = AuthConfig::new(
            "tenant.eu.auth0.com",
            "casting",
            vec![jsonwebtoken::Algorithm::RS256],
        )
        .unwrap();
        let fetcher = HttpJwksFetcher::new(auth.jwks_url(), Duration::from_secs(1)).unwrap();
        assert_eq!(
            fetcher.url(),
            "https://tenant.eu.auth0.com/.well-known/jwks.json"
        );
    }
}
