pub mod create;
pub mod query;
pub mod registration;
pub mod store;
pub mod update;

use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use sqlx::SqlitePool;

use crate::domain::{Conference, ConferenceKey};
use crate::{ApiError, ApiResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conference", post(create::create_conference))
        .route(
            "/conference/{websafe_key}",
            get(get_conference).put(update::update_conference),
        )
        .route(
            "/conference/{websafe_key}/registration",
            post(registration::register_for_conference)
                .delete(registration::unregister_from_conference),
        )
        .route("/conferences/query", post(query::query_conferences))
        .route("/conferences/created", get(query::conferences_created))
        .route("/conferences/attending", get(query::conferences_to_attend))
}

#[debug_handler(state = AppState)]
async fn get_conference(
    State(db_pool): State<SqlitePool>,
    Path(websafe_key): Path<String>,
) -> ApiResult<Json<Conference>> {
    let key = ConferenceKey::from_websafe(&websafe_key).ok_or(ApiError::NotFound("conference"))?;
    let conference = store::get(&db_pool, &key)
        .await?
        .ok_or(ApiError::NotFound("conference"))?;
    Ok(Json(conference))
}
