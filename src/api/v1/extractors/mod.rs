/*!
 * Request extractors
 *
 * Public API:
 * - AuthClaims
 */
mod auth_claims;

pub use auth_claims::AuthClaims;
