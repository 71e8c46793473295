//! access token (JWT) 検証 → 権限チェック → VerifiedClaims を extensions に入れる
//!
//! route ごとに必要な permission が違うため、Router 全体ではなく handler 単位で掛ける。
//!
//! 例：
//! ```ignore
//! .route(
//!     "/actors",
//!     access::require(get(list_actors), gate.clone(), READ_ACTORS)
//!         .merge(access::require(post(create_actor), gate.clone(), CREATE_ACTORS)),
//! )
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::AppError;
use crate::services::auth::{AuthError, AuthGate};

/// middleware に渡す state: どの gate で、どの permission を要求するか
#[derive(Clone)]
pub struct RequiredPermission {
    gate: Arc<AuthGate>,
    permission: &'static str,
}

/// `route` に `permission` の要求を掛ける。空文字なら「有効な token であること」だけを要求する。
/// route_layer なので、未定義 method への 405 は認証前に返る。
pub fn require<S>(
    route: MethodRouter<S>,
    gate: Arc<AuthGate>,
    permission: &'static str,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(
        RequiredPermission { gate, permission },
        enforce,
    ))
}

async fn enforce(
    State(required): State<RequiredPermission>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| {
                    AuthError::HeaderMalformed("Authorization header must be bearer token.")
                })?
                .to_owned(),
        ),
    };
    let path = req.uri().path().to_owned();

    required
        .gate
        .guard(
            authorization.as_deref(),
            required.permission,
            |claims| async move {
                tracing::debug!(
                    sub = %claims.sub(),
                    exp = claims.exp(),
                    iat = ?claims.iat(),
                    "access granted"
                );
                // middleware → extractor への受け渡し
                req.extensions_mut().insert(claims);
                next.run(req).await
            },
        )
        .await
        .map_err(|err| {
            tracing::warn!(
                code = err.code(),
                status = err.status().as_u16(),
                permission = required.permission,
                path = %path,
                "request rejected by access middleware"
            );
            err.into()
        })
}
