use std::env;
use std::path::PathBuf;

use crate::share::default_download_dir;
use crate::store::Store;

/// Profile data a sign-in provider would hand over at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub first_name: String,
    pub country: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            first_name: "Gaetano".to_string(),
            country: "Brasil".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
    pub identity: Identity,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Identity::default();
        Ok(Self {
            server_url: env::var("TOPMODEL_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            data_dir: match env::var_os("TOPMODEL_DATA_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => Store::default_dir()?,
            },
            download_dir: match env::var_os("TOPMODEL_DOWNLOAD_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => default_download_dir()?,
            },
            identity: Identity {
                first_name: env::var("TOPMODEL_FIRST_NAME").unwrap_or(defaults.first_name),
                country: env::var("TOPMODEL_COUNTRY").unwrap_or(defaults.country),
            },
        })
    }
}
