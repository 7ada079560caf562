use axum::{debug_handler, extract::Path, extract::State, Json};
use sqlx::SqlitePool;

use super::store;
use crate::domain::ConferenceKey;
use crate::profiles;
use crate::session::CurrentUser;
use crate::tx::{self, Denied, TxOutcome};
use crate::{ApiError, ApiResult, AppState};

#[debug_handler(state = AppState)]
pub(super) async fn register_for_conference(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    Path(websafe_key): Path<String>,
) -> ApiResult<Json<bool>> {
    Ok(Json(register(&db_pool, &user, &websafe_key).await?))
}

#[debug_handler(state = AppState)]
pub(super) async fn unregister_from_conference(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    Path(websafe_key): Path<String>,
) -> ApiResult<Json<bool>> {
    Ok(Json(unregister(&db_pool, &user, &websafe_key).await?))
}

/// Books one seat and records the registration on the profile, atomically.
/// Concurrent callers race on the conference row's write lock, so the last
/// seat goes to exactly one of them and the rest observe zero availability.
pub async fn register(
    pool: &SqlitePool,
    user: &CurrentUser,
    websafe_key: &str,
) -> ApiResult<bool> {
    let key = ConferenceKey::from_websafe(websafe_key).ok_or(ApiError::NotFound("conference"))?;

    let user = user.clone();
    let websafe_key = websafe_key.to_owned();
    tx::transact(pool, move |conn| {
        let key = key.clone();
        let user = user.clone();
        let websafe_key = websafe_key.clone();
        Box::pin(async move {
            let Some(mut conference) = store::get(&mut *conn, &key).await? else {
                return Ok(TxOutcome::Deny(Denied::NotFound("conference")));
            };
            let mut profile =
                profiles::store::get_or_default(&mut *conn, &user.user_id, &user.email).await?;

            if profile.conference_keys_to_attend.contains(&websafe_key) {
                return Ok(TxOutcome::Deny(Denied::Conflict("already registered")));
            }
            if conference.seats_available <= 0 {
                return Ok(TxOutcome::Deny(Denied::Conflict("no seats available")));
            }

            profile.add_conference_key(&websafe_key);
            conference.book_seats(1);
            profiles::store::save(&mut *conn, &profile).await?;
            store::save(&mut *conn, &conference).await?;
            Ok(TxOutcome::Commit(true))
        })
    })
    .await
}

/// Symmetric to `register`; unregistering from a conference the caller never
/// registered for is a `false` no-op, not an error.
pub async fn unregister(
    pool: &SqlitePool,
    user: &CurrentUser,
    websafe_key: &str,
) -> ApiResult<bool> {
    let key = ConferenceKey::from_websafe(websafe_key).ok_or(ApiError::NotFound("conference"))?;

    let user = user.clone();
    let websafe_key = websafe_key.to_owned();
    tx::transact(pool, move |conn| {
        let key = key.clone();
        let user = user.clone();
        let websafe_key = websafe_key.clone();
        Box::pin(async move {
            let Some(mut conference) = store::get(&mut *conn, &key).await? else {
                return Ok(TxOutcome::Deny(Denied::NotFound("conference")));
            };
            let mut profile =
                profiles::store::get_or_default(&mut *conn, &user.user_id, &user.email).await?;

            if !profile.remove_conference_key(&websafe_key) {
                return Ok(TxOutcome::Commit(false));
            }

            conference.give_back_seats(1);
            profiles::store::save(&mut *conn, &profile).await?;
            store::save(&mut *conn, &conference).await?;
            Ok(TxOutcome::Commit(true))
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conferences::create;
    use crate::db;
    use crate::forms::ConferenceForm;

    fn user(id: &str) -> CurrentUser {
        CurrentUser {
            user_id: id.to_owned(),
            email: format!("{id}@example.com"),
        }
    }

    async fn seed_conference(pool: &SqlitePool, max_attendees: i64) -> String {
        let form = ConferenceForm {
            name: Some("RustConf".to_owned()),
            max_attendees: Some(max_attendees),
            ..Default::default()
        };
        create::create(pool, &user("u-org"), form).await.unwrap().websafe_key
    }

    async fn seats_available(pool: &SqlitePool, websafe_key: &str) -> i64 {
        let key = ConferenceKey::from_websafe(websafe_key).unwrap();
        store::get(pool, &key).await.unwrap().unwrap().seats_available
    }

    #[tokio::test]
    async fn register_books_a_seat_and_records_the_key() {
        let pool = db::test_pool().await;
        let websafe_key = seed_conference(&pool, 10).await;

        assert!(register(&pool, &user("u-a"), &websafe_key).await.unwrap());

        assert_eq!(seats_available(&pool, &websafe_key).await, 9);
        let profile = profiles::store::get(&pool, "u-a").await.unwrap().unwrap();
        assert_eq!(profile.conference_keys_to_attend, vec![websafe_key]);
    }

    #[tokio::test]
    async fn double_registration_conflicts_and_decrements_once() {
        let pool = db::test_pool().await;
        let websafe_key = seed_conference(&pool, 10).await;
        let attendee = user("u-a");

        assert!(register(&pool, &attendee, &websafe_key).await.unwrap());
        let second = register(&pool, &attendee, &websafe_key).await;
        assert!(matches!(second, Err(ApiError::Conflict("already registered"))));

        assert_eq!(seats_available(&pool, &websafe_key).await, 9);
        let profile = profiles::store::get(&pool, "u-a").await.unwrap().unwrap();
        assert_eq!(profile.conference_keys_to_attend.len(), 1);
    }

    #[tokio::test]
    async fn sold_out_conference_rejects_everyone() {
        let pool = db::test_pool().await;
        let websafe_key = seed_conference(&pool, 1).await;

        assert!(register(&pool, &user("u-a"), &websafe_key).await.unwrap());
        for id in ["u-b", "u-c"] {
            let result = register(&pool, &user(id), &websafe_key).await;
            assert!(matches!(result, Err(ApiError::Conflict("no seats available"))));
        }
        assert_eq!(seats_available(&pool, &websafe_key).await, 0);
    }

    #[tokio::test]
    async fn register_then_unregister_round_trips() {
        let pool = db::test_pool().await;
        let websafe_key = seed_conference(&pool, 10).await;
        let attendee = user("u-a");

        assert!(register(&pool, &attendee, &websafe_key).await.unwrap());
        assert!(unregister(&pool, &attendee, &websafe_key).await.unwrap());

        assert_eq!(seats_available(&pool, &websafe_key).await, 10);
        let profile = profiles::store::get(&pool, "u-a").await.unwrap().unwrap();
        assert!(profile.conference_keys_to_attend.is_empty());
    }

    #[tokio::test]
    async fn unregister_without_registration_is_a_false_noop() {
        let pool = db::test_pool().await;
        let websafe_key = seed_conference(&pool, 10).await;

        assert!(!unregister(&pool, &user("u-a"), &websafe_key).await.unwrap());
        assert_eq!(seats_available(&pool, &websafe_key).await, 10);
    }

    #[tokio::test]
    async fn unknown_conference_is_not_found() {
        let pool = db::test_pool().await;
        let result = register(&pool, &user("u-a"), "bm90LXRoZXJlLzk5").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn two_callers_race_for_the_last_seat() {
        // real write contention needs a shared file-backed database
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("race.db").display());
        let pool = db::connect(&url).await.unwrap();
        db::init_schema(&pool).await.unwrap();

        let websafe_key = seed_conference(&pool, 10).await;
        sqlx::query("UPDATE conferences SET seats_available = 1")
            .execute(&pool)
            .await
            .unwrap();

        let a = {
            let pool = pool.clone();
            let websafe_key = websafe_key.clone();
            tokio::spawn(async move { register(&pool, &user("u-a"), &websafe_key).await })
        };
        let b = {
            let pool = pool.clone();
            let websafe_key = websafe_key.clone();
            tokio::spawn(async move { register(&pool, &user("u-b"), &websafe_key).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| matches!(r, Ok(true))).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(ApiError::Conflict("no seats available"))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
        assert_eq!(seats_available(&pool, &websafe_key).await, 0);
    }
}
