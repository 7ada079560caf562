use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};
use time::Date;

use crate::domain::{month_of, Conference, ConferenceKey};
use crate::error::{ApiError, ApiResult};
use crate::forms::{ConferenceForm, ConferenceQueryForm, FilterField, FilterOp};
use crate::tx::Denied;

const COLUMNS: &str = "organizer_user_id, conference_id, name, description, \
     organizer_display_name, topics, city, start_date, end_date, month, \
     max_attendees, seats_available";

/// Fresh conference id from the global sequence. Allocated outside the
/// creation transaction, like any key allocation: an id burned on a failed
/// creation is never reused.
pub async fn allocate_id(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) =
        sqlx::query_as("UPDATE conference_seq SET next_id = next_id + 1 RETURNING next_id")
            .fetch_one(pool)
            .await?;
    Ok(id)
}

/// Checks the creation form up front, before any write happens.
pub fn validate_new(form: &ConferenceForm) -> ApiResult<(String, i64)> {
    let name = form
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("conference name is required".to_owned()))?;
    let max_attendees = form.max_attendees.unwrap_or(0);
    if max_attendees < 0 {
        return Err(ApiError::BadRequest("maxAttendees must be >= 0".to_owned()));
    }
    Ok((name, max_attendees))
}

/// Builds the record for a new conference; seats start at full capacity.
pub fn build_new(
    key: &ConferenceKey,
    organizer_display_name: String,
    name: String,
    max_attendees: i64,
    form: &ConferenceForm,
) -> Conference {
    Conference {
        websafe_key: key.websafe(),
        organizer_user_id: key.organizer_user_id.clone(),
        conference_id: key.conference_id,
        name,
        description: form.description.clone(),
        organizer_display_name,
        topics: form.topics.clone().unwrap_or_default(),
        city: form.city.clone(),
        start_date: form.start_date,
        end_date: form.end_date,
        month: form.start_date.map(month_of),
        max_attendees,
        seats_available: max_attendees,
    }
}

/// Partial update: absent fields keep their values. Shrinking capacity below
/// the seats already booked is denied.
pub fn apply_form(conference: &mut Conference, form: &ConferenceForm) -> Result<(), Denied> {
    if let Some(name) = &form.name {
        if !name.trim().is_empty() {
            conference.name = name.clone();
        }
    }
    if let Some(description) = &form.description {
        conference.description = Some(description.clone());
    }
    if let Some(topics) = &form.topics {
        conference.topics = topics.clone();
    }
    if let Some(city) = &form.city {
        conference.city = Some(city.clone());
    }
    if let Some(start_date) = form.start_date {
        conference.start_date = Some(start_date);
        conference.month = Some(month_of(start_date));
    }
    if let Some(end_date) = form.end_date {
        conference.end_date = Some(end_date);
    }
    if let Some(max_attendees) = form.max_attendees {
        let booked = conference.max_attendees - conference.seats_available;
        if max_attendees < booked {
            return Err(Denied::Conflict("maxAttendees is below seats already booked"));
        }
        conference.max_attendees = max_attendees;
        conference.seats_available = max_attendees - booked;
    }
    Ok(())
}

pub async fn insert<'c, E>(exec: E, conference: &Conference) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let topics = encode_topics(conference)?;
    sqlx::query(
        "INSERT INTO conferences (organizer_user_id, conference_id, name, description, \
         organizer_display_name, topics, city, start_date, end_date, month, \
         max_attendees, seats_available) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&conference.organizer_user_id)
    .bind(conference.conference_id)
    .bind(&conference.name)
    .bind(&conference.description)
    .bind(&conference.organizer_display_name)
    .bind(topics)
    .bind(&conference.city)
    .bind(conference.start_date)
    .bind(conference.end_date)
    .bind(conference.month)
    .bind(conference.max_attendees)
    .bind(conference.seats_available)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn save<'c, E>(exec: E, conference: &Conference) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let topics = encode_topics(conference)?;
    sqlx::query(
        "UPDATE conferences SET name = ?, description = ?, organizer_display_name = ?, \
         topics = ?, city = ?, start_date = ?, end_date = ?, month = ?, \
         max_attendees = ?, seats_available = ? \
         WHERE organizer_user_id = ? AND conference_id = ?",
    )
    .bind(&conference.name)
    .bind(&conference.description)
    .bind(&conference.organizer_display_name)
    .bind(topics)
    .bind(&conference.city)
    .bind(conference.start_date)
    .bind(conference.end_date)
    .bind(conference.month)
    .bind(conference.max_attendees)
    .bind(conference.seats_available)
    .bind(&conference.organizer_user_id)
    .bind(conference.conference_id)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn get<'c, E>(exec: E, key: &ConferenceKey) -> Result<Option<Conference>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query(&format!(
        "SELECT {COLUMNS} FROM conferences WHERE organizer_user_id = ? AND conference_id = ?"
    ))
    .bind(&key.organizer_user_id)
    .bind(key.conference_id)
    .fetch_optional(exec)
    .await?
    .map(|row| from_row(&row))
    .transpose()
}

pub async fn list_by_organizer(
    pool: &SqlitePool,
    organizer_user_id: &str,
) -> Result<Vec<Conference>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {COLUMNS} FROM conferences WHERE organizer_user_id = ? ORDER BY name"
    ))
    .bind(organizer_user_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(from_row)
    .collect()
}

/// Resolves a batch of websafe keys; keys that no longer resolve are skipped.
pub async fn get_many(
    pool: &SqlitePool,
    websafe_keys: &[String],
) -> Result<Vec<Conference>, sqlx::Error> {
    let mut conferences = Vec::with_capacity(websafe_keys.len());
    for websafe in websafe_keys {
        let Some(key) = ConferenceKey::from_websafe(websafe) else {
            continue;
        };
        if let Some(conference) = get(pool, &key).await? {
            conferences.push(conference);
        }
    }
    Ok(conferences)
}

/// Arbitrary equality/range predicates with combinable sort orders, built
/// into one statement with bound parameters.
pub async fn query(
    pool: &SqlitePool,
    form: &ConferenceQueryForm,
) -> ApiResult<Vec<Conference>> {
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new(format!("SELECT {COLUMNS} FROM conferences"));

    for (i, filter) in form.filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match filter.field {
            FilterField::City => {
                qb.push("city ").push(filter.operator.sql()).push(" ");
                qb.push_bind(filter.string_value()?);
            }
            // topics is a JSON array; equality means set membership
            FilterField::Topic => {
                let prefix = match filter.operator {
                    FilterOp::Eq => "EXISTS",
                    FilterOp::Ne => "NOT EXISTS",
                    _ => {
                        return Err(ApiError::BadRequest(
                            "topic filters support EQ and NE only".to_owned(),
                        ))
                    }
                };
                qb.push(prefix)
                    .push(" (SELECT 1 FROM json_each(conferences.topics) WHERE json_each.value = ");
                qb.push_bind(filter.string_value()?);
                qb.push(")");
            }
            FilterField::Month | FilterField::MaxAttendees | FilterField::SeatsAvailable => {
                let column = match filter.field {
                    FilterField::Month => "month",
                    FilterField::MaxAttendees => "max_attendees",
                    _ => "seats_available",
                };
                qb.push(column).push(" ").push(filter.operator.sql()).push(" ");
                qb.push_bind(filter.int_value()?);
            }
        }
    }

    qb.push(" ORDER BY ");
    if form.order.is_empty() {
        qb.push("name");
    } else {
        for (i, sort) in form.order.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(sort.column());
        }
    }

    let rows = qb.build().fetch_all(pool).await.map_err(ApiError::from)?;
    rows.iter().map(from_row).collect::<Result<_, _>>().map_err(ApiError::from)
}

fn encode_topics(conference: &Conference) -> Result<String, sqlx::Error> {
    serde_json::to_string(&conference.topics).map_err(|err| sqlx::Error::Encode(Box::new(err)))
}

fn from_row(row: &SqliteRow) -> Result<Conference, sqlx::Error> {
    let topics: String = row.try_get("topics")?;
    let key = ConferenceKey {
        organizer_user_id: row.try_get("organizer_user_id")?,
        conference_id: row.try_get("conference_id")?,
    };
    Ok(Conference {
        websafe_key: key.websafe(),
        organizer_user_id: key.organizer_user_id,
        conference_id: key.conference_id,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        organizer_display_name: row.try_get("organizer_display_name")?,
        topics: serde_json::from_str(&topics).map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
        city: row.try_get("city")?,
        start_date: row.try_get::<Option<Date>, _>("start_date")?,
        end_date: row.try_get::<Option<Date>, _>("end_date")?,
        month: row.try_get("month")?,
        max_attendees: row.try_get("max_attendees")?,
        seats_available: row.try_get("seats_available")?,
    })
}
