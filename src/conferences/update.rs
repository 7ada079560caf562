use axum::{debug_handler, extract::Path, extract::State, Json};
use sqlx::SqlitePool;

use super::store;
use crate::domain::{Conference, ConferenceKey};
use crate::forms::ConferenceForm;
use crate::profiles;
use crate::session::CurrentUser;
use crate::tx::{self, Denied, TxOutcome};
use crate::{ApiError, ApiResult, AppState};

#[debug_handler(state = AppState)]
pub(super) async fn update_conference(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    Path(websafe_key): Path<String>,
    Json(form): Json<ConferenceForm>,
) -> ApiResult<Json<Conference>> {
    Ok(Json(update(&db_pool, &user, &websafe_key, form).await?))
}

/// Authorizes and applies the update in one transaction; NotFound and
/// Forbidden come out of the closure as denial markers, never as storage
/// errors.
pub async fn update(
    pool: &SqlitePool,
    user: &CurrentUser,
    websafe_key: &str,
    form: ConferenceForm,
) -> ApiResult<Conference> {
    let key = ConferenceKey::from_websafe(websafe_key).ok_or(ApiError::NotFound("conference"))?;

    let user_id = user.user_id.clone();
    tx::transact(pool, move |conn| {
        let key = key.clone();
        let user_id = user_id.clone();
        let form = form.clone();
        Box::pin(async move {
            let Some(mut conference) = store::get(&mut *conn, &key).await? else {
                return Ok(TxOutcome::Deny(Denied::NotFound("conference")));
            };
            let profile = profiles::store::get(&mut *conn, &user_id).await?;
            if profile.is_none() || conference.organizer_user_id != user_id {
                return Ok(TxOutcome::Deny(Denied::Forbidden(
                    "only the organizer can update the conference",
                )));
            }
            if let Err(denied) = store::apply_form(&mut conference, &form) {
                return Ok(TxOutcome::Deny(denied));
            }
            store::save(&mut *conn, &conference).await?;
            Ok(TxOutcome::Commit(conference))
        })
    })
    .await
}
