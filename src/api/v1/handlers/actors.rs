/*
 * Responsibility
 * - /actors 系 CRUD handler
 * - 認可は route 側の access::require で済んでいる前提 (handler は VerifiedClaims を受け取るだけ)
 * - Json/Query/Path のリジェクトは AppError に寄せて {success:false,...} で返す
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
        dto::actors::{
            ActorListResponse, ActorUpdatedResponse, CreateActorRequest, CreatedResponse,
            DeletedResponse, UpdateActorRequest,
        },
        dto::pagination::PageQuery,
        extractors::AuthClaims,
    },
    error::AppError,
    repos::actor_repo,
    state::AppState,
};

fn actor_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::bad_request("Actor id not given."))
}

pub async fn list_actors(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ActorListResponse>, AppError> {
    let Query(page) = query.map_err(|_| AppError::bad_request("Invalid page"))?;
    let (limit, offset) = page
        .window(state.rows_per_page)
        .map_err(AppError::bad_request)?;

    let rows = actor_repo::list(&state.db, limit, offset).await?;
    if rows.is_empty() {
        return Err(AppError::not_found("No Actors found in Database!"));
    }

    Ok(Json(ActorListResponse {
        success: true,
        actors: rows.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_actor(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    body: Result<Json<CreateActorRequest>, JsonRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let Json(req) = body.map_err(|_| AppError::bad_request("Invalid JSON"))?;
    req.validate().map_err(AppError::unprocessable)?;

    let (Some(name), Some(age)) = (req.name.as_deref(), req.age) else {
        return Err(AppError::unprocessable("No Name"));
    };

    let row = actor_repo::create(&state.db, name.trim(), req.gender(), age).await?;
    tracing::info!(sub = %claims.sub(), actor_id = row.id, "actor created");

    Ok(Json(CreatedResponse {
        success: true,
        created: row.id,
    }))
}

pub async fn update_actor(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateActorRequest>, JsonRejection>,
) -> Result<Json<ActorUpdatedResponse>, AppError> {
    let id = actor_id(path)?;
    let Json(req) = body.map_err(|_| AppError::bad_request("Invalid JSON"))?;
    if req.is_empty() {
        return Err(AppError::bad_request("Invalid JSON"));
    }
    req.validate().map_err(AppError::unprocessable)?;

    let row = actor_repo::update(
        &state.db,
        id,
        req.name.as_deref().map(str::trim),
        req.gender.as_deref(),
        req.age,
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("Actor with id {} not found in records", id)))?;
    tracing::info!(sub = %claims.sub(), actor_id = row.id, "actor updated");

    Ok(Json(ActorUpdatedResponse {
        success: true,
        updated: row.id,
        actor: vec![row.into()],
    }))
}

pub async fn delete_actor(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = actor_id(path)?;

    if !actor_repo::delete(&state.db, id).await? {
        return Err(AppError::not_found(format!(
            "Actor with id {} not found in database.",
            id
        )));
    }
    tracing::info!(sub = %claims.sub(), actor_id = id, "actor deleted");

    Ok(Json(DeletedResponse {
        success: true,
        deleted: id,
    }))
}
