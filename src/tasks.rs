use std::time::Duration;

use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::Conference;

/// Enqueues the confirmation email in the same transaction as the conference
/// creation: the task row exists exactly when the creation committed.
pub async fn enqueue_confirmation_email(
    conn: &mut SqliteConnection,
    email: &str,
    conference: &Conference,
) -> Result<(), sqlx::Error> {
    let info = format!("{} ({})", conference.name, conference.websafe_key);
    sqlx::query("INSERT INTO email_tasks (id, email, conference_info, created_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::now_v7().to_string())
        .bind(email)
        .bind(info)
        .bind(time::OffsetDateTime::now_utc().unix_timestamp())
        .execute(conn)
        .await?;
    Ok(())
}

/// Drains the task table in the background. Actual delivery belongs to the
/// mail service; this worker hands tasks over (here: logs them) and deletes
/// the row afterwards, so a crash re-delivers rather than drops.
pub fn spawn_worker(pool: SqlitePool) {
    tokio::spawn(async move {
        loop {
            if let Err(err) = drain(&pool).await {
                tracing::warn!("email task worker: {err}");
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });
}

async fn drain(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let tasks: Vec<(String, String, String)> =
        sqlx::query_as("SELECT id, email, conference_info FROM email_tasks ORDER BY created_at")
            .fetch_all(pool)
            .await?;

    for (id, email, conference_info) in tasks {
        tracing::info!("sending confirmation email to {email} for {conference_info}");
        sqlx::query("DELETE FROM email_tasks WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
    }
    Ok(())
}
