use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    Xs,
    S,
    M,
    L,
    Xl,
    Xxl,
    Xxxl,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    /// Websafe keys of conferences the user holds a seat for, in
    /// registration order. Duplicates are rejected at registration time.
    pub conference_keys_to_attend: Vec<String>,
}

impl Profile {
    pub fn add_conference_key(&mut self, websafe_key: &str) {
        self.conference_keys_to_attend.push(websafe_key.to_owned());
    }

    /// Removes the key, reporting whether it was present. "Never registered"
    /// is uniformly a non-error here; callers decide what absence means.
    pub fn remove_conference_key(&mut self, websafe_key: &str) -> bool {
        let before = self.conference_keys_to_attend.len();
        self.conference_keys_to_attend.retain(|k| k != websafe_key);
        self.conference_keys_to_attend.len() < before
    }
}

/// Composite identity of a conference: the numeric id is scoped under the
/// organizer's profile. The websafe form is what leaves the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceKey {
    pub organizer_user_id: String,
    pub conference_id: i64,
}

impl ConferenceKey {
    pub fn websafe(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}/{}", self.organizer_user_id, self.conference_id))
    }

    pub fn from_websafe(websafe: &str) -> Option<Self> {
        let raw = URL_SAFE_NO_PAD.decode(websafe).ok()?;
        let raw = String::from_utf8(raw).ok()?;
        let (organizer_user_id, id) = raw.rsplit_once('/')?;
        Some(Self {
            organizer_user_id: organizer_user_id.to_owned(),
            conference_id: id.parse().ok()?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub websafe_key: String,
    pub organizer_user_id: String,
    #[serde(skip)]
    pub conference_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub organizer_display_name: String,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    /// Derived from the start date, kept alongside it for filtering.
    pub month: Option<i64>,
    pub max_attendees: i64,
    pub seats_available: i64,
}

impl Conference {
    pub fn key(&self) -> ConferenceKey {
        ConferenceKey {
            organizer_user_id: self.organizer_user_id.clone(),
            conference_id: self.conference_id,
        }
    }

    /// Decrements availability. Availability checks are the registration
    /// transaction's responsibility, which keeps this reusable for
    /// compensating updates.
    pub fn book_seats(&mut self, n: i64) {
        self.seats_available -= n;
    }

    /// Increments availability, clamped at capacity. In correct flows the
    /// clamp never fires since seats are only given back for held bookings.
    pub fn give_back_seats(&mut self, n: i64) {
        self.seats_available = (self.seats_available + n).min(self.max_attendees);
    }
}

pub fn month_of(date: Date) -> i64 {
    i64::from(u8::from(date.month()))
}
