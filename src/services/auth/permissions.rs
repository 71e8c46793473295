use super::error::AuthError;
use super::verifier::VerifiedClaims;

pub const READ_ACTORS: &str = "read:actors";
pub const CREATE_ACTORS: &str = "create:actors";
pub const EDIT_ACTORS: &str = "edit:actors";
pub const DELETE_ACTORS: &str = "delete:actors";

pub const READ_MOVIES: &str = "read:movies";
pub const CREATE_MOVIES: &str = "create:movies";
pub const EDIT_MOVIES: &str = "edit:movies";
pub const DELETE_MOVIES: &str = "delete:movies";

/// Check that `claims` grant `required`. An empty `required` only asks for a
/// verified token.
pub fn check_permission(claims: &VerifiedClaims, required: &str) -> Result<(), AuthError> {
    if required.is_empty() {
        return Ok(());
    }

    let granted = claims.permissions().ok_or(AuthError::PermissionsMissing)?;

    if !granted.contains(required) {
        return Err(AuthError::PermissionDenied);
    }

    Ok(())
}
