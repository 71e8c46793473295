/// Factory: build `AuthGate` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::jwks::{JwksError, KeySetCache};
use crate::services::auth::{AuthGate, TokenVerifier};

pub fn build_auth_gate(config: &Config) -> Result<Arc<AuthGate>, JwksError> {
    let keys = Arc::new(KeySetCache::from_config(&config.auth, config.jwks)?);
    let verifier = TokenVerifier::new(&config.auth, keys);

    Ok(Arc::new(AuthGate::new(verifier)))
}
