use std::env;

use anyhow::Context;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct Config {
    /// Missing key is not fatal at boot; generation requests answer 500 instead.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub upstream_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("UPSTREAM_TIMEOUT_SECS must be a number of seconds")?,
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string()) // 10 MiB
                .parse()
                .context("MAX_BODY_BYTES must be a byte count")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
        })
    }

    /// Defaults with no API key, for tests.
    pub fn test_default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            upstream_timeout_secs: 60,
            max_body_bytes: 10 * 1024 * 1024,
            port: 0,
        }
    }
}
