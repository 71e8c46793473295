/*
 * Responsibility
 * - movies CRUD
 * - performances は FK (CASCADE) 前提なので削除時に関連行も消える
 */
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;

#[derive(Debug, Clone, FromRow)]
pub struct MovieRow {
    pub id: i32,
    pub title: String,
    pub release_date: NaiveDate,
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<MovieRow>, RepoError> {
    let rows = sqlx::query_as::<_, MovieRow>(
        r#"
        SELECT id, title, release_date
        FROM movies
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

pub async fn create(
    db: &PgPool,
    title: &str,
    release_date: NaiveDate,
) -> Result<MovieRow, RepoError> {
    let row = sqlx::query_as::<_, MovieRow>(
        r#"
        INSERT INTO movies (title, release_date)
        VALUES ($1, $2)
        RETURNING id, title, release_date
        "#,
    )
    .bind(title)
    .bind(release_date)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn update(
    db: &PgPool,
    id: i32,
    title: Option<&str>,
    release_date: Option<NaiveDate>,
) -> Result<Option<MovieRow>, RepoError> {
    let row = sqlx::query_as::<_, MovieRow>(
        r#"
        UPDATE movies
        SET
            title = COALESCE($2, title),
            release_date = COALESCE($3, release_date)
        WHERE id = $1
        RETURNING id, title, release_date
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(release_date)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn delete(db: &PgPool, id: i32) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM movies
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
