/*
 * Responsibility
 * - /movies 系 CRUD handler
 * - 認可は route 側の access::require で済んでいる前提
 */
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};

use crate::{
    api::v1::{
        dto::actors::{CreatedResponse, DeletedResponse},
        dto::movies::{
            CreateMovieRequest, MovieEditedResponse, MovieListResponse, UpdateMovieRequest,
        },
        dto::pagination::PageQuery,
        extractors::AuthClaims,
    },
    error::AppError,
    repos::movie_repo,
    state::AppState,
};

fn movie_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::bad_request("Movie ID not given"))
}

pub async fn list_movies(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<MovieListResponse>, AppError> {
    let Query(page) = query.map_err(|_| AppError::bad_request("Invalid page"))?;
    let (limit, offset) = page
        .window(state.rows_per_page)
        .map_err(AppError::bad_request)?;

    let rows = movie_repo::list(&state.db, limit, offset).await?;
    if rows.is_empty() {
        return Err(AppError::not_found("No movies found"));
    }

    Ok(Json(MovieListResponse {
        success: true,
        movies: rows.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_movie(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    body: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let Json(req) = body.map_err(|_| AppError::bad_request("Invalid JSON"))?;
    let (title, release_date) = req.validate().map_err(AppError::unprocessable)?;

    let row = movie_repo::create(&state.db, title.trim(), release_date).await?;
    tracing::info!(sub = %claims.sub(), movie_id = row.id, "movie created");

    Ok(Json(CreatedResponse {
        success: true,
        created: row.id,
    }))
}

pub async fn update_movie(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateMovieRequest>, JsonRejection>,
) -> Result<Json<MovieEditedResponse>, AppError> {
    let id = movie_id(path)?;
    let Json(req) = body.map_err(|_| AppError::bad_request("Invalid JSON"))?;
    if req.is_empty() {
        return Err(AppError::bad_request("Invalid JSON"));
    }
    req.validate().map_err(AppError::unprocessable)?;

    let row = movie_repo::update(
        &state.db,
        id,
        req.title.as_deref().map(str::trim),
        req.release_date,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Movie Not Found"))?;
    tracing::info!(sub = %claims.sub(), movie_id = row.id, "movie updated");

    Ok(Json(MovieEditedResponse {
        success: true,
        edited: row.id,
        movie: vec![row.into()],
    }))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = movie_id(path)?;

    if !movie_repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Movie not found"));
    }
    tracing::info!(sub = %claims.sub(), movie_id = id, "movie deleted");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}
