pub mod store;

use axum::{
    debug_handler,
    extract::State,
    routing::get,
    Json, Router,
};
use sqlx::SqlitePool;

use crate::domain::Profile;
use crate::forms::ProfileForm;
use crate::session::CurrentUser;
use crate::{ApiError, ApiResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).post(save_profile))
}

#[debug_handler(state = AppState)]
async fn get_profile(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
) -> ApiResult<Json<Profile>> {
    let profile = store::get(&db_pool, &user.user_id)
        .await?
        .ok_or(ApiError::NotFound("profile"))?;
    Ok(Json(profile))
}

#[debug_handler(state = AppState)]
async fn save_profile(
    State(db_pool): State<SqlitePool>,
    user: CurrentUser,
    Json(form): Json<ProfileForm>,
) -> ApiResult<Json<Profile>> {
    let profile = save(&db_pool, &user, form).await?;
    Ok(Json(profile))
}

/// Lazily creates the profile on first save; fields absent from the form
/// keep their stored (or defaulted) values.
pub async fn save(
    db_pool: &SqlitePool,
    user: &CurrentUser,
    form: ProfileForm,
) -> ApiResult<Profile> {
    let mut profile = store::get_or_default(db_pool, &user.user_id, &user.email).await?;
    if let Some(display_name) = form.display_name {
        profile.display_name = display_name;
    }
    if let Some(tee_shirt_size) = form.tee_shirt_size {
        profile.tee_shirt_size = tee_shirt_size;
    }
    store::save(db_pool, &profile).await?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::TeeShirtSize;

    fn jane() -> CurrentUser {
        CurrentUser {
            user_id: "u-jane".to_owned(),
            email: "jane@example.com".to_owned(),
        }
    }

    #[tokio::test]
    async fn save_twice_with_same_inputs_is_idempotent() {
        let pool = db::test_pool().await;
        let form = ProfileForm {
            display_name: Some("Jane".to_owned()),
            tee_shirt_size: Some(TeeShirtSize::M),
        };

        let first = save(&pool, &jane(), form.clone()).await.unwrap();
        let second = save(&pool, &jane(), form).await.unwrap();

        assert_eq!(first.display_name, second.display_name);
        assert_eq!(first.tee_shirt_size, second.tee_shirt_size);
        let stored = store::get(&pool, "u-jane").await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Jane");
    }

    #[tokio::test]
    async fn partial_save_keeps_existing_fields() {
        let pool = db::test_pool().await;
        let form = ProfileForm {
            display_name: Some("Jane".to_owned()),
            tee_shirt_size: Some(TeeShirtSize::M),
        };
        save(&pool, &jane(), form).await.unwrap();

        let updated = save(
            &pool,
            &jane(),
            ProfileForm {
                display_name: None,
                tee_shirt_size: Some(TeeShirtSize::Xl),
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.display_name, "Jane");
        assert_eq!(updated.tee_shirt_size, TeeShirtSize::Xl);
    }
}
