use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;

use super::store;
use crate::domain::Conference;
use crate::forms::ConferenceQueryForm;
use crate::profiles;
use crate::session::CurrentUser;
use crate::{ApiError, ApiResult, AppState};

#[debug_handler(state = AppState)]
pub(super) async fn query_conferences(
    State(db_pool): State<SqlitePool>,
    Json(form): Json<ConferenceQueryForm>,
) -> ApiResult<Json<Vec<Conference>>> {
    Ok(Json(store::query(&db_pool, &form).await?))
}

#[debug_handler(state = AppState)]
pub(super) async fn conferences_created(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Conference>>> {
    Ok(Json(store::list_by_organizer(&db_pool, &user.user_id).await?))
}

#[debug_handler(state = AppState)]
pub(super) async fn conferences_to_attend(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Conference>>> {
    let profile = profiles::store::get(&db_pool, &user.user_id)
        .await?
        .ok_or(ApiError::NotFound("profile"))?;
    let conferences = store::get_many(&db_pool, &profile.conference_keys_to_attend).await?;
    Ok(Json(conferences))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conferences::{create, registration};
    use crate::db;
    use crate::forms::{ConferenceForm, Filter, FilterField, FilterOp, SortField};
    use serde_json::json;
    use time::macros::date;

    fn user(id: &str) -> CurrentUser {
        CurrentUser {
            user_id: id.to_owned(),
            email: format!("{id}@example.com"),
        }
    }

    async fn seed(pool: &SqlitePool) {
        let conferences = [
            ("Web Summit", "London", vec!["Web Technologies"], Some(date!(2026 - 06 - 10)), 20),
            ("MedTech Days", "London", vec!["Medical Innovations"], Some(date!(2026 - 09 - 01)), 5),
            ("Rust Nation", "Tokyo", vec!["Web Technologies", "Systems"], None, 8),
        ];
        for (name, city, topics, start_date, max) in conferences {
            let form = ConferenceForm {
                name: Some(name.to_owned()),
                city: Some(city.to_owned()),
                topics: Some(topics.into_iter().map(str::to_owned).collect()),
                start_date,
                max_attendees: Some(max),
                ..Default::default()
            };
            create::create(pool, &user("u-org"), form).await.unwrap();
        }
    }

    fn filter(field: FilterField, operator: FilterOp, value: serde_json::Value) -> Filter {
        Filter { field, operator, value }
    }

    #[tokio::test]
    async fn empty_query_lists_everything_ordered_by_name() {
        let pool = db::test_pool().await;
        seed(&pool).await;

        let all = store::query(&pool, &ConferenceQueryForm::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MedTech Days", "Rust Nation", "Web Summit"]);
    }

    #[tokio::test]
    async fn filters_combine() {
        let pool = db::test_pool().await;
        seed(&pool).await;

        let form = ConferenceQueryForm {
            filters: vec![
                filter(FilterField::City, FilterOp::Eq, json!("London")),
                filter(FilterField::Topic, FilterOp::Eq, json!("Web Technologies")),
            ],
            order: vec![],
        };
        let found = store::query(&pool, &form).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Web Summit");
    }

    #[tokio::test]
    async fn range_filter_and_sort_order() {
        let pool = db::test_pool().await;
        seed(&pool).await;

        let form = ConferenceQueryForm {
            filters: vec![filter(FilterField::MaxAttendees, FilterOp::Lt, json!(10))],
            order: vec![SortField::MaxAttendees, SortField::Name],
        };
        let found = store::query(&pool, &form).await.unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MedTech Days", "Rust Nation"]);
    }

    #[tokio::test]
    async fn month_filter_uses_the_derived_field() {
        let pool = db::test_pool().await;
        seed(&pool).await;

        let form = ConferenceQueryForm {
            filters: vec![filter(FilterField::Month, FilterOp::Eq, json!(6))],
            order: vec![],
        };
        let found = store::query(&pool, &form).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Web Summit");
    }

    #[tokio::test]
    async fn type_mismatch_is_a_bad_request() {
        let pool = db::test_pool().await;
        let form = ConferenceQueryForm {
            filters: vec![filter(FilterField::Month, FilterOp::Eq, json!("June"))],
            order: vec![],
        };
        let result = store::query(&pool, &form).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn created_lists_only_the_callers_conferences_by_name() {
        let pool = db::test_pool().await;
        seed(&pool).await;
        let other = ConferenceForm {
            name: Some("Other Con".to_owned()),
            ..Default::default()
        };
        create::create(&pool, &user("u-other"), other).await.unwrap();

        let created = store::list_by_organizer(&pool, "u-org").await.unwrap();
        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|c| c.organizer_user_id == "u-org"));
    }

    #[tokio::test]
    async fn to_attend_resolves_registered_keys() {
        let pool = db::test_pool().await;
        seed(&pool).await;
        let attendee = user("u-a");

        let all = store::query(&pool, &ConferenceQueryForm::default()).await.unwrap();
        registration::register(&pool, &attendee, &all[0].websafe_key).await.unwrap();

        let profile = profiles::store::get(&pool, "u-a").await.unwrap().unwrap();
        let attending = store::get_many(&pool, &profile.conference_keys_to_attend).await.unwrap();
        assert_eq!(attending.len(), 1);
        assert_eq!(attending[0].websafe_key, all[0].websafe_key);
    }
}
