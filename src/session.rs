use axum::{
    debug_handler,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{ApiError, ApiResult, AppState};

pub const USER_ID: &str = "user_id";
pub const USER_EMAIL: &str = "user_email";

/// Caller identity as resolved by the external identity provider and stashed
/// in the session. Absence means `Unauthorized`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::Internal(anyhow::Error::msg(msg)))?;

        let user_id = session.get::<String>(USER_ID).await?;
        let email = session.get::<String>(USER_EMAIL).await?;
        match (user_id, email) {
            (Some(user_id), Some(email)) => Ok(CurrentUser { user_id, email }),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/session", post(login).delete(logout))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionForm {
    user_id: String,
    email: String,
}

/// Trusts the identity the provider already resolved; the OAuth dance itself
/// lives outside this backend.
#[debug_handler]
async fn login(session: Session, Json(form): Json<SessionForm>) -> ApiResult<StatusCode> {
    session.insert(USER_ID, form.user_id).await?;
    session.insert(USER_EMAIL, form.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn logout(session: Session) -> StatusCode {
    session.clear().await;
    StatusCode::NO_CONTENT
}
