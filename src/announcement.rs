use axum::{debug_handler, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub const ANNOUNCEMENT_KEY: &str = "RECENT_ANNOUNCEMENTS";

/// Read-through cache for the precomputed announcement string. This side
/// only ever reads; a periodic job owns population.
#[derive(Clone)]
pub struct AnnouncementCache {
    cache: moka::sync::Cache<String, String>,
}

impl AnnouncementCache {
    pub fn new() -> Self {
        Self {
            cache: moka::sync::Cache::new(16),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.cache.get(ANNOUNCEMENT_KEY)
    }

    pub fn set(&self, announcement: String) {
        self.cache.insert(ANNOUNCEMENT_KEY.to_owned(), announcement);
    }
}

impl Default for AnnouncementCache {
    fn default() -> Self {
        Self::new()
    }
}

#[debug_handler(state = crate::AppState)]
pub async fn get_announcement(State(cache): State<AnnouncementCache>) -> impl IntoResponse {
    match cache.get() {
        Some(announcement) => Json(json!({ "announcement": announcement })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_populated() {
        let cache = AnnouncementCache::new();
        assert_eq!(cache.get(), None);
        cache.set("conferences are filling up".to_owned());
        assert_eq!(cache.get().as_deref(), Some("conferences are filling up"));
    }
}
