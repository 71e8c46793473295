/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth0 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動時に一度だけ読み込み、以降は immutable
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Identity-provider settings shared by the key-set cache and the token verifier.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub domain: String,
    pub audience: String,
    pub algorithms: Vec<Algorithm>,
}

impl AuthConfig {
    pub fn new(
        domain: impl Into<String>,
        audience: impl Into<String>,
        algorithms: Vec<Algorithm>,
    ) -> Result<Self, ConfigError> {
        let domain = domain.into().trim().trim_end_matches('/').to_string();
        if domain.is_empty() {
            return Err(ConfigError::Missing("AUTH0_DOMAIN"));
        }
        // domain must be a bare host; anything that does not survive URL parsing is rejected here
        let url = Url::parse(&format!("https://{}/", domain))
            .map_err(|_| ConfigError::Invalid("AUTH0_DOMAIN"))?;
        if url.host_str().is_none() || url.path() != "/" {
            return Err(ConfigError::Invalid("AUTH0_DOMAIN"));
        }

        if algorithms.is_empty() {
            return Err(ConfigError::Invalid("AUTH_ALGORITHMS"));
        }

        Ok(Self {
            domain,
            audience: audience.into(),
            algorithms,
        })
    }

    /// Expected `iss` claim: `https://{domain}/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }
}

/// Tuning knobs for the JWKS cache.
#[derive(Debug, Clone, Copy)]
pub struct JwksPolicy {
    // How long a fetched key set counts as fresh.
    pub cache_ttl: Duration,
    // Minimum age of the cached set before an unknown kid forces a refetch.
    pub min_refresh_interval: Duration,
    // Per-attempt bound on the HTTP fetch.
    pub fetch_timeout: Duration,
    pub fetch_attempts: u32,
    // First retry delay; doubled after each failed attempt.
    pub retry_backoff: Duration,
}

impl Default for JwksPolicy {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600),
            min_refresh_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(5),
            fetch_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub auth: AuthConfig,
    pub jwks: JwksPolicy,

    pub rows_per_page: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let domain =
            std::env::var("AUTH0_DOMAIN").map_err(|_| ConfigError::Missing("AUTH0_DOMAIN"))?;

        let audience =
            std::env::var("API_AUDIENCE").map_err(|_| ConfigError::Missing("API_AUDIENCE"))?;

        let algorithms = parse_algorithms(
            &std::env::var("AUTH_ALGORITHMS").unwrap_or_else(|_| "RS256".to_string()),
        )?;

        let auth = AuthConfig::new(domain, audience, algorithms)?;

        let defaults = JwksPolicy::default();
        let jwks = JwksPolicy {
            cache_ttl: env_seconds("JWKS_CACHE_TTL_SECONDS").unwrap_or(defaults.cache_ttl),
            min_refresh_interval: env_seconds("JWKS_MIN_REFRESH_INTERVAL_SECONDS")
                .unwrap_or(defaults.min_refresh_interval),
            fetch_timeout: env_seconds("JWKS_FETCH_TIMEOUT_SECONDS")
                .unwrap_or(defaults.fetch_timeout),
            fetch_attempts: std::env::var("JWKS_FETCH_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.fetch_attempts),
            retry_backoff: defaults.retry_backoff,
        };

        let rows_per_page = std::env::var("ROWS_PER_PAGE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);
        if rows_per_page < 1 {
            return Err(ConfigError::Invalid("ROWS_PER_PAGE"));
        }

        Ok(Self {
            addr,
            database_url,
            app_env,
            cors_allowed_origins,
            auth,
            jwks,
            rows_per_page,
        })
    }
}

fn env_seconds(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
}

/// Parse the comma-separated signature allow-list.
///
/// Keys come from an RSA JWKS, so only the RSA family is accepted. `none` and
/// HMAC algorithms are refused at start-up rather than at request time.
pub fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut out = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg =
            Algorithm::from_str(name).map_err(|_| ConfigError::Invalid("AUTH_ALGORITHMS"))?;

        match alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                if !out.contains(&alg) {
                    out.push(alg);
                }
            }
            _ => return Err(ConfigError::Invalid("AUTH_ALGORITHMS")),
        }
    }

    if out.is_empty() {
        return Err(ConfigError::Invalid("AUTH_ALGORITHMS"));
    }

    Ok(out)
}
