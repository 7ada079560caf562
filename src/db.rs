use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            main_email TEXT NOT NULL,
            tee_shirt_size TEXT NOT NULL DEFAULT 'NOT_SPECIFIED',
            conference_keys_to_attend TEXT NOT NULL DEFAULT '[]'
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS conferences (
            organizer_user_id TEXT NOT NULL,
            conference_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            organizer_display_name TEXT NOT NULL,
            topics TEXT NOT NULL DEFAULT '[]',
            city TEXT,
            start_date DATE,
            end_date DATE,
            month INTEGER,
            max_attendees INTEGER NOT NULL DEFAULT 0,
            seats_available INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (organizer_user_id, conference_id)
        )",
    )
    .execute(pool)
    .await?;

    // single-row sequence backing ConferenceStore::allocate_id
    sqlx::query("CREATE TABLE IF NOT EXISTS conference_seq (next_id INTEGER NOT NULL)")
        .execute(pool)
        .await?;
    sqlx::query(
        "INSERT INTO conference_seq (next_id)
         SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM conference_seq)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS email_tasks (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            conference_info TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Single-connection in-memory database; tests that exercise real write
/// contention build their own file-backed pool instead.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&pool).await.unwrap();
    pool
}
