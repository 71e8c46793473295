/*
 * Responsibility
 * - Config読み込み → 依存生成 (PgPool / AuthGate) → Router 組み立て
 * - Middleware の適用 (http / CORS)、認可は route 側
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::auth::build_auth_gate;
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG=info,casting_agency=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: fail fast
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("loading configuration")?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("running migrations")?;

    let auth = build_auth_gate(config).context("building auth gate")?;

    // 起動時に鍵が取れなくても落とさない。最初の検証時に再取得する。
    match auth.warm_up().await {
        Ok(keys) => tracing::info!(keys, "jwks prefetched"),
        Err(err) => tracing::warn!(code = err.code(), "jwks prefetch failed, will retry on demand"),
    }

    Ok(AppState::new(db, auth, config.rows_per_page))
}

async fn not_found() -> AppError {
    AppError::not_found("Resource Not Found")
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(&state))
        .fallback(not_found)
        .with_state(state);

    let router = middleware::http::apply(router);
    middleware::cors::apply(router, config)
}
