use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use topmodel_shared::{GeneratedImage, User};

const USER_FILE: &str = "user.json";
const IMAGES_FILE: &str = "images.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// What a previous session left behind.
#[derive(Debug, Default)]
pub struct Loaded {
    pub user: Option<User>,
    /// Newest first, already limited to the retention window.
    pub images: Vec<GeneratedImage>,
}

/// Two JSON blobs in a data directory, each rewritten whole on every save.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Could not create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// `<platform data dir>/top-model-ai`
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::data_dir()
            .context("Could not find data directory")?
            .join("top-model-ai"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(USER_FILE)
    }

    fn images_path(&self) -> PathBuf {
        self.dir.join(IMAGES_FILE)
    }

    /// Load both blobs.
    ///
    /// Images older than the retention window are dropped and the shorter
    /// list is written back. Unreadable or unparsable data wipes the store
    /// and yields an empty state.
    pub fn load(&self, now: DateTime<Utc>) -> Loaded {
        let (user, images) = match self.read_all() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Discarding stored state: {}", e);
                if let Err(e) = self.clear() {
                    tracing::error!("Could not wipe stored state: {}", e);
                }
                return Loaded::default();
            }
        };

        let total = images.len();
        let images: Vec<GeneratedImage> = images
            .into_iter()
            .filter(|image| image.is_visible_at(now))
            .collect();

        if images.len() < total {
            tracing::info!(expired = total - images.len(), "pruning expired feed images");
            if let Err(e) = self.save_images(&images) {
                tracing::warn!("Could not prune expired images: {}", e);
            }
        }

        Loaded { user, images }
    }

    fn read_all(&self) -> Result<(Option<User>, Vec<GeneratedImage>), StoreError> {
        let user = read_blob(&self.user_path())?;
        let images = read_blob(&self.images_path())?.unwrap_or_default();
        Ok((user, images))
    }

    pub fn save_user(&self, user: &User) -> Result<(), StoreError> {
        write_blob(&self.user_path(), user)
    }

    pub fn save_images(&self, images: &[GeneratedImage]) -> Result<(), StoreError> {
        write_blob(&self.images_path(), images)
    }

    /// Remove both blobs. Missing files are not an error.
    pub fn clear(&self) -> Result<(), StoreError> {
        for path in [self.user_path(), self.images_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

fn write_blob<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let contents = serde_json::to_string(value)?;
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn user() -> User {
        let mut user = User::provisional("Ana", "Brasil");
        user.city = "SP".to_string();
        user
    }

    fn image(id: &str, created_at: DateTime<Utc>) -> GeneratedImage {
        GeneratedImage::new(
            id.to_string(),
            "data:image/png;base64,AAAA".to_string(),
            "X".to_string(),
            &user(),
            created_at,
        )
    }

    fn store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("data")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_store_loads_nothing() {
        let (_dir, store) = store();
        let loaded = store.load(now());
        assert!(loaded.user.is_none());
        assert!(loaded.images.is_empty());
    }

    #[test]
    fn saved_user_is_loaded_back() {
        let (_dir, store) = store();
        store.save_user(&user()).unwrap();
        assert_eq!(store.load(now()).user, Some(user()));
    }

    #[test]
    fn expired_images_are_filtered_and_pruned() {
        let (_dir, store) = store();
        let images = vec![
            image("fresh", now() - Duration::days(1)),
            image("edge", now() - Duration::days(7)),
            image("stale", now() - Duration::days(8)),
        ];
        store.save_images(&images).unwrap();

        let loaded = store.load(now());
        let ids: Vec<&str> = loaded.images.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["fresh", "edge"]);

        let on_disk: Vec<GeneratedImage> =
            serde_json::from_str(&fs::read_to_string(store.images_path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
    }

    #[test]
    fn reloading_a_filtered_list_is_idempotent() {
        let (_dir, store) = store();
        store
            .save_images(&[image("b", now() - Duration::hours(2)), image("a", now() - Duration::days(3))])
            .unwrap();

        let first = store.load(now()).images;
        store.save_images(&first).unwrap();
        let second = store.load(now()).images;
        assert_eq!(first, second);
    }

    #[test]
    fn order_is_preserved() {
        let (_dir, store) = store();
        let mut newest = image("newest", now() - Duration::hours(1));
        newest.likes = 0;
        let mut older = image("older", now() - Duration::hours(5));
        older.likes = 99;
        store.save_images(&[newest, older]).unwrap();

        let ids: Vec<String> = store.load(now()).images.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["newest", "older"]);
    }

    #[test]
    fn corrupt_blob_wipes_store() {
        let (_dir, store) = store();
        store.save_images(&[image("a", now())]).unwrap();
        fs::write(store.user_path(), "{not json").unwrap();

        let loaded = store.load(now());
        assert!(loaded.user.is_none());
        assert!(loaded.images.is_empty());
        assert!(!store.user_path().exists());
        assert!(!store.images_path().exists());
    }

    #[test]
    fn clear_is_fine_on_empty_store() {
        let (_dir, store) = store();
        store.clear().unwrap();
        store.save_user(&user()).unwrap();
        store.clear().unwrap();
        assert!(store.load(now()).user.is_none());
    }
}
