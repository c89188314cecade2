use std::fmt;

use chrono::{DateTime, Duration, Utc};
use topmodel_shared::COOLDOWN_MINUTES;

/// Client-side wait between successful generations.
///
/// Advisory only: it disables the generate actions, nothing enforces it
/// on the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cooldown {
    until: Option<DateTime<Utc>>,
}

/// Remaining wait, rounded up to the next whole second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub minutes: i64,
    pub seconds: i64,
}

impl Cooldown {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            until: Some(now + Duration::minutes(COOLDOWN_MINUTES)),
        }
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }

    pub fn can_generate(&self, now: DateTime<Utc>) -> bool {
        self.until.map_or(true, |until| now >= until)
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Remaining {
        let millis = self
            .until
            .map(|until| (until - now).num_milliseconds().max(0))
            .unwrap_or(0);
        let total_secs = (millis + 999) / 1000;
        Remaining {
            minutes: total_secs / 60,
            seconds: total_secs % 60,
        }
    }
}

impl Remaining {
    pub fn is_zero(&self) -> bool {
        self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}
