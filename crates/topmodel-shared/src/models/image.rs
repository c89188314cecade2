use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::FEED_RETENTION_DAYS;

/// A community feed entry.
///
/// Author fields are copies of the user's profile at creation time and are
/// not updated when the profile changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub image_url: String,
    pub prompt: String,
    pub author: String,
    #[serde(default)]
    pub author_city: String,
    #[serde(default)]
    pub author_country: String,
    pub likes: u32,
    pub liked_by_user: bool,
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    pub fn new(
        id: String,
        image_url: String,
        prompt: String,
        author: &User,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            image_url,
            prompt,
            author: author.name.clone(),
            author_city: author.city.clone(),
            author_country: author.country.clone(),
            likes: 0,
            liked_by_user: false,
            created_at,
        }
    }

    /// Flip the user's like. The counter moves only on an actual transition
    /// of `liked_by_user` and never goes below zero.
    pub fn toggle_like(&mut self) {
        if self.liked_by_user {
            self.likes = self.likes.saturating_sub(1);
            self.liked_by_user = false;
        } else {
            self.likes = self.likes.saturating_add(1);
            self.liked_by_user = true;
        }
    }

    /// Still inside the feed retention window at `now`.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.created_at >= retention_cutoff(now)
    }
}

/// Oldest `created_at` still shown in the feed at `now`.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(FEED_RETENTION_DAYS)
}
