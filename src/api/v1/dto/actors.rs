/*
 * Responsibility
 * - Actors の request/response DTO
 * - validate() は 422 用のメッセージを返す
 */
use serde::{Deserialize, Serialize};

use crate::repos::actor_repo::ActorRow;

pub const DEFAULT_GENDER: &str = "Unknown";

#[derive(Debug, Deserialize)]
pub struct CreateActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl CreateActorRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err("No Name");
        }
        match self.age {
            None => return Err("No Age"),
            Some(age) if age <= 0 => return Err("Invalid Age"),
            Some(_) => {}
        }

        Ok(())
    }

    pub fn gender(&self) -> &str {
        self.gender
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(DEFAULT_GENDER)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl UpdateActorRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.gender.is_none()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err("No Name");
        }
        if let Some(age) = self.age
            && age <= 0
        {
            return Err("Invalid Age");
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ActorResponse {
    pub id: i32,
    pub name: String,
    pub gender: String,
    pub age: i32,
}

impl From<ActorRow> for ActorResponse {
    fn from(row: ActorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            gender: row.gender,
            age: row.age,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActorListResponse {
    pub success: bool,
    pub actors: Vec<ActorResponse>,
}

#[derive(Debug, Serialize)]
pub struct ActorUpdatedResponse {
    pub success: bool,
    pub updated: i32,
    pub actor: Vec<ActorResponse>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub created: i32,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub deleted: i32,
}
