/*
 * Responsibility
 * - actors テーブル向け SQLx 操作
 * - PgPool を受け取り CRUD を提供 (list はページング済み)
 */
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;

#[derive(Debug, Clone, FromRow)]
pub struct ActorRow {
    pub id: i32,
    pub name: String,
    pub gender: String,
    pub age: i32,
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<ActorRow>, RepoError> {
    let rows = sqlx::query_as::<_, ActorRow>(
        r#"
        SELECT id, name, gender, age
        FROM actors
        ORDER BY id
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn create(db: &PgPool, name: &str, gender: &str, age: i32) -> Result<ActorRow, RepoError> {
    let row = sqlx::query_as::<_, ActorRow>(
        r#"
        INSERT INTO actors (name, gender, age)
        VALUES ($1, $2, $3)
        RETURNING id, name, gender, age
        "#,
    )
    .bind(name)
    .bind(gender)
    .bind(age)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn update(
    db: &PgPool,
    id: i32,
    name: Option<&str>,
    gender: Option<&str>,
    age: Option<i32>,
) -> Result<Option<ActorRow>, RepoError> {
    // None -> keep the stored value
    let row = sqlx::query_as::<_, ActorRow>(
        r#"
        UPDATE actors
        SET
            name = COALESCE($2, name),
            gender = COALESCE($3, gender),
            age = COALESCE($4, age)
        WHERE id = $1
        RETURNING id, name, gender, age
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(gender)
    .bind(age)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn delete(db: &PgPool, id: i32) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM actors
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
