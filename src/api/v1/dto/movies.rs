/*
 * Responsibility
 * - Movies の request/response DTO
 * - release_date は "YYYY-MM-DD"
 */
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::repos::movie_repo::MovieRow;

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
}

impl CreateMovieRequest {
    pub fn validate(&self) -> Result<(&str, NaiveDate), &'static str> {
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or("No Title")?;
        let release_date = self.release_date.ok_or("No release_date")?;

        Ok((title, release_date))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
}

impl UpdateMovieRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.release_date.is_none()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err("No Title");
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub id: i32,
    pub title: String,
    pub release_date: NaiveDate,
}

impl From<MovieRow> for MovieResponse {
    fn from(row: MovieRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            release_date: row.release_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub success: bool,
    pub movies: Vec<MovieResponse>,
}

#[derive(Debug, Serialize)]
pub struct MovieEditedResponse {
    pub success: bool,
    pub edited: i32,
    pub movie: Vec<MovieResponse>,
}
