use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    It,
    En,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Pt, Language::It, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::It => "it",
            Language::En => "en",
        }
    }

    /// Next language in display order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            Language::Pt => Language::It,
            Language::It => Language::En,
            Language::En => Language::Pt,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub language: Language,
    /// Selfie as a `data:image/...;base64,` URI.
    #[serde(default)]
    pub selfie: Option<String>,
    #[serde(default)]
    pub has_completed_setup: bool,
}

impl User {
    /// User created at login, before the profile step fills in the city.
    pub fn provisional(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: String::new(),
            country: country.into(),
            language: Language::default(),
            selfie: None,
            has_completed_setup: false,
        }
    }

    /// Name, city and country are all non-empty.
    pub fn has_profile(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.country.trim().is_empty()
    }

    pub fn has_selfie(&self) -> bool {
        self.selfie.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Everything a generation request needs is present.
    pub fn can_generate(&self) -> bool {
        self.has_profile() && self.has_selfie()
    }
}

// The selfie is a multi-megabyte base64 blob; keep it out of logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("city", &self.city)
            .field("country", &self.country)
            .field("language", &self.language)
            .field("selfie_len", &self.selfie.as_ref().map(String::len))
            .field("has_completed_setup", &self.has_completed_setup)
            .finish()
    }
}
