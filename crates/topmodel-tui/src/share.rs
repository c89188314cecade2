use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use topmodel_shared::GeneratedImage;

/// Directory images are exported to when no share target exists.
pub fn default_download_dir() -> Result<PathBuf> {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .context("Could not find a download directory")
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

/// Keep names portable: letters, digits, dash and underscore only.
fn file_stem(author: &str) -> String {
    let cleaned: String = author
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

fn decode_data_uri(uri: &str) -> Result<(&str, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("Image is not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("Image data URI has no payload"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("Image data URI is not base64 encoded"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .context("Image payload is not valid base64")?;
    Ok((mime, bytes))
}

/// Write the image to `dir/top-model-ai-<author>.<ext>` and return the path.
pub fn export_image(image: &GeneratedImage, dir: &Path) -> Result<PathBuf> {
    let (mime, bytes) = decode_data_uri(&image.image_url)?;
    fs::create_dir_all(dir).with_context(|| format!("Could not create {}", dir.display()))?;

    let path = dir.join(format!(
        "top-model-ai-{}.{}",
        file_stem(&image.author),
        extension_for(mime)
    ));
    fs::write(&path, &bytes).with_context(|| format!("Could not write {}", path.display()))?;

    tracing::info!(id = %image.id, bytes = bytes.len(), "image exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use topmodel_shared::User;

    fn image(author: &str, url: &str) -> GeneratedImage {
        let mut user = User::provisional(author, "Brasil");
        user.city = "SP".to_string();
        GeneratedImage::new("1".to_string(), url.to_string(), "X".to_string(), &user, Utc::now())
    }

    #[test]
    fn writes_decoded_bytes_with_author_name() {
        let dir = TempDir::new().unwrap();
        let path = export_image(&image("Ana", "data:image/png;base64,YWJj"), dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "top-model-ai-Ana.png");
        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn unknown_mime_falls_back_to_jpg_and_name_is_sanitised() {
        let dir = TempDir::new().unwrap();
        let path =
            export_image(&image("Ana/../x", "data:image/heic;base64,YWJj"), dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "top-model-ai-Ana____x.jpg");
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn rejects_non_data_uri() {
        let dir = TempDir::new().unwrap();
        assert!(export_image(&image("Ana", "https://example.com/a.png"), dir.path()).is_err());
        assert!(export_image(&image("Ana", "data:image/png;base64,%%%"), dir.path()).is_err());
    }
}
