use std::time::Duration;

use futures_util::future::BoxFuture;
use rand::Rng;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{ApiError, ApiResult};

const MAX_ATTEMPTS: u32 = 5;

/// What a transaction closure hands back to the executor: either a value to
/// commit, or a business denial that commits nothing.
#[derive(Debug)]
pub enum TxOutcome<T> {
    Commit(T),
    Deny(Denied),
}

/// Business-rule denials raised from inside a transaction. They are carried
/// out as values and only become `ApiError`s once the transaction is done,
/// so the executor never confuses them with storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    NotFound(&'static str),
    Forbidden(&'static str),
    Conflict(&'static str),
}

impl From<Denied> for ApiError {
    fn from(denied: Denied) -> Self {
        match denied {
            Denied::NotFound(what) => ApiError::NotFound(what),
            Denied::Forbidden(msg) => ApiError::Forbidden(msg),
            Denied::Conflict(msg) => ApiError::Conflict(msg),
        }
    }
}

/// Runs `work` inside a write transaction, retrying on write contention.
///
/// The closure gets the transactional connection, so every read it issues
/// sees the transaction's own snapshot, never a stale pre-transaction one.
/// `BEGIN IMMEDIATE` takes the write lock up front, which turns a lost race
/// into a busy error here at the boundary instead of mid-closure.
pub async fn transact<T, F>(pool: &SqlitePool, work: F) -> ApiResult<T>
where
    F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<TxOutcome<T>, sqlx::Error>>,
{
    let mut conn = pool.acquire().await?;
    let mut attempt = 0;
    loop {
        match run_once(&mut conn, &work).await {
            Ok(TxOutcome::Commit(value)) => return Ok(value),
            Ok(TxOutcome::Deny(denied)) => return Err(denied.into()),
            Err(err) if retryable(&err) && attempt < MAX_ATTEMPTS => {
                attempt += 1;
                let jitter = rand::rng().random_range(5..25);
                tokio::time::sleep(Duration::from_millis(u64::from(attempt) * jitter)).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn run_once<T, F>(
    conn: &mut SqliteConnection,
    work: &F,
) -> Result<TxOutcome<T>, sqlx::Error>
where
    F: for<'c> Fn(&'c mut SqliteConnection) -> BoxFuture<'c, Result<TxOutcome<T>, sqlx::Error>>,
{
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    match work(&mut *conn).await {
        Ok(outcome) => {
            let end = match outcome {
                TxOutcome::Commit(_) => "COMMIT",
                TxOutcome::Deny(_) => "ROLLBACK",
            };
            if let Err(err) = sqlx::query(end).execute(&mut *conn).await {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(err);
            }
            Ok(outcome)
        }
        Err(err) => {
            // best effort; the error we report is the closure's
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(err)
        }
    }
}

fn retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("5" | "6" | "261" | "517"))
                || db.message().contains("database is locked")
                || db.message().contains("database table is locked")
        }
        _ => false,
    }
}
