pub mod actors;
pub mod movies;
pub mod pagination;
