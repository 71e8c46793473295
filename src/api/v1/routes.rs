/*
 * Responsibility
 * - v1 の URL 構造を定義 (/actors, /movies)
 * - method ごとに必要な permission を access::require で掛ける
 */
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::api::v1::handlers::{
    actors::{create_actor, delete_actor, list_actors, update_actor},
    movies::{create_movie, delete_movie, list_movies, update_movie},
};
use crate::middleware::auth::access::require;
use crate::services::auth::permissions::{
    CREATE_ACTORS, CREATE_MOVIES, DELETE_ACTORS, DELETE_MOVIES, EDIT_ACTORS, EDIT_MOVIES,
    READ_ACTORS, READ_MOVIES,
};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let gate = &state.auth;

    Router::new()
        .route(
            "/actors",
            require(get(list_actors), gate.clone(), READ_ACTORS)
                .merge(require(post(create_actor), gate.clone(), CREATE_ACTORS)),
        )
        .route(
            "/actors/{id}",
            require(patch(update_actor), gate.clone(), EDIT_ACTORS)
                .merge(require(delete(delete_actor), gate.clone(), DELETE_ACTORS)),
        )
        .route(
            "/movies",
            require(get(list_movies), gate.clone(), READ_MOVIES)
                .merge(require(post(create_movie), gate.clone(), CREATE_MOVIES)),
        )
        .route(
            "/movies/{id}",
            require(patch(update_movie), gate.clone(), EDIT_MOVIES)
                .merge(require(delete(delete_movie), gate.clone(), DELETE_MOVIES)),
        )
}
