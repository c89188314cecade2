pub mod api;
pub mod models;

pub use models::*;

pub const APP_NAME: &str = "Top Model AI";

/// Minimum wait between two successful generations of the same user.
pub const COOLDOWN_MINUTES: i64 = 10;

/// Community feed entries older than this are hidden from the feed.
pub const FEED_RETENTION_DAYS: i64 = 7;

/// Path of the generation proxy endpoint, relative to the server root.
pub const GENERATE_PATH: &str = "/api/generate";
