/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - db: PgPool, auth: AuthGate (JWKS cache を内包), rows_per_page
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use sqlx::PgPool;

use crate::services::auth::AuthGate;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub auth: Arc<AuthGate>,
    pub rows_per_page: i64,
}

impl AppState {
    pub fn new(db: PgPool, auth: Arc<AuthGate>, rows_per_page: i64) -> Self {
        Self {
            db,
            auth,
            rows_per_page,
        }
    }
}
