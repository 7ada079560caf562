use axum::{debug_handler, extract::State, Json};
use sqlx::SqlitePool;

use super::store;
use crate::domain::{Conference, ConferenceKey};
use crate::forms::ConferenceForm;
use crate::profiles;
use crate::session::CurrentUser;
use crate::tasks;
use crate::tx::{self, TxOutcome};
use crate::{ApiResult, AppState};

#[debug_handler(state = AppState)]
pub(super) async fn create_conference(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    Json(form): Json<ConferenceForm>,
) -> ApiResult<Json<Conference>> {
    Ok(Json(create(&db_pool, &user, form).await?))
}

/// Creates the conference, lazily persisting the organizer's profile, and
/// enlists the confirmation-email task in the same transaction so the task
/// exists iff the creation commits.
pub async fn create(
    pool: &SqlitePool,
    user: &CurrentUser,
    form: ConferenceForm,
) -> ApiResult<Conference> {
    let (name, max_attendees) = store::validate_new(&form)?;
    let conference_id = store::allocate_id(pool).await?;
    let key = ConferenceKey {
        organizer_user_id: user.user_id.clone(),
        conference_id,
    };

    let user = user.clone();
    tx::transact(pool, move |conn| {
        let user = user.clone();
        let key = key.clone();
        let form = form.clone();
        let name = name.clone();
        Box::pin(async move {
            let profile =
                profiles::store::get_or_default(&mut *conn, &user.user_id, &user.email).await?;
            let conference =
                store::build_new(&key, profile.display_name.clone(), name, max_attendees, &form);
            store::insert(&mut *conn, &conference).await?;
            profiles::store::save(&mut *conn, &profile).await?;
            tasks::enqueue_confirmation_email(&mut *conn, &profile.main_email, &conference).await?;
            Ok(TxOutcome::Commit(conference))
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::ApiError;

    fn organizer() -> CurrentUser {
        CurrentUser {
            user_id: "u-org".to_owned(),
            email: "org@example.com".to_owned(),
        }
    }

    fn form(name: &str, max_attendees: i64) -> ConferenceForm {
        ConferenceForm {
            name: Some(name.to_owned()),
            max_attendees: Some(max_attendees),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_with_full_capacity_and_lazy_profile() {
        let pool = db::test_pool().await;
        let conference = create(&pool, &organizer(), form("RustConf", 10)).await.unwrap();

        assert_eq!(conference.seats_available, 10);
        assert_eq!(conference.organizer_display_name, "org");

        // the profile was created as a side effect
        let profile = profiles::store::get(&pool, "u-org").await.unwrap().unwrap();
        assert_eq!(profile.main_email, "org@example.com");

        // and the confirmation email task committed with it
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM email_tasks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn key_round_trips_through_the_store() {
        let pool = db::test_pool().await;
        let conference = create(&pool, &organizer(), form("RustConf", 5)).await.unwrap();

        let key = ConferenceKey::from_websafe(&conference.websafe_key).unwrap();
        let loaded = store::get(&pool, &key).await.unwrap().unwrap();
        assert_eq!(loaded.name, "RustConf");
        assert_eq!(loaded.websafe_key, conference.websafe_key);
    }

    #[tokio::test]
    async fn rejects_missing_name_without_side_effects() {
        let pool = db::test_pool().await;
        let result = create(&pool, &organizer(), ConferenceForm::default()).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conferences")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
