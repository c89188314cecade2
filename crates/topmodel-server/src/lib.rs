//! Generation proxy for Top Model AI.
//!
//! Holds the model API credential and forwards `POST /api/generate` calls to
//! the image model, so the key never reaches the client.

pub mod config;
pub mod error;
pub mod handlers;
pub mod prompt;
pub mod routes;
pub mod upstream;

pub use config::Config;
pub use routes::{create_router, AppState};
