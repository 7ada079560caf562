pub mod announcement;
pub mod conferences;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod forms;
pub mod profiles;
pub mod session;
pub mod tasks;
pub mod tx;

use axum::extract::FromRef;
use sqlx::SqlitePool;

pub use error::{ApiError, ApiResult};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub announcements: announcement::AnnouncementCache,
}
