use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};

use crate::domain::{Profile, TeeShirtSize};

pub async fn get<'c, E>(exec: E, user_id: &str) -> Result<Option<Profile>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query(
        "SELECT user_id, display_name, main_email, tee_shirt_size, conference_keys_to_attend
         FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(exec)
    .await?
    .map(|row| from_row(&row))
    .transpose()
}

/// Existing profile, or a fresh unsaved one with the display name defaulted
/// to the local part of the email. Nothing is persisted until `save`.
pub async fn get_or_default<'c, E>(
    exec: E,
    user_id: &str,
    email: &str,
) -> Result<Profile, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    if let Some(profile) = get(exec, user_id).await? {
        return Ok(profile);
    }
    Ok(Profile {
        user_id: user_id.to_owned(),
        display_name: default_display_name(email),
        main_email: email.to_owned(),
        tee_shirt_size: TeeShirtSize::NotSpecified,
        conference_keys_to_attend: vec![],
    })
}

/// Upsert; replaying the same profile is a no-op.
pub async fn save<'c, E>(exec: E, profile: &Profile) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let keys = serde_json::to_string(&profile.conference_keys_to_attend)
        .map_err(|err| sqlx::Error::Encode(Box::new(err)))?;
    sqlx::query(
        "INSERT INTO profiles (user_id, display_name, main_email, tee_shirt_size, conference_keys_to_attend)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
            display_name = excluded.display_name,
            main_email = excluded.main_email,
            tee_shirt_size = excluded.tee_shirt_size,
            conference_keys_to_attend = excluded.conference_keys_to_attend",
    )
    .bind(&profile.user_id)
    .bind(&profile.display_name)
    .bind(&profile.main_email)
    .bind(profile.tee_shirt_size)
    .bind(keys)
    .execute(exec)
    .await?;
    Ok(())
}

pub fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_owned()
}

fn from_row(row: &SqliteRow) -> Result<Profile, sqlx::Error> {
    let keys: String = row.try_get("conference_keys_to_attend")?;
    Ok(Profile {
        user_id: row.try_get("user_id")?,
        display_name: row.try_get("display_name")?,
        main_email: row.try_get("main_email")?,
        tee_shirt_size: row.try_get("tee_shirt_size")?,
        conference_keys_to_attend: serde_json::from_str(&keys)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
    })
}
