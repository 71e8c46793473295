pub mod bearer;
pub mod error;
pub mod factory;
pub mod gate;
pub mod jwks;
pub mod permissions;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use error::AuthError;
pub use factory::build_auth_gate;
pub use gate::AuthGate;
pub use verifier::{TokenVerifier, VerifiedClaims};
