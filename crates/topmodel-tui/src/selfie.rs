use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Same ceiling the proxy applies to request bodies.
pub const MAX_SELFIE_BYTES: u64 = 10 * 1024 * 1024;

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read an image file and encode it as a `data:` URI.
pub fn load_selfie(path: &Path) -> Result<String> {
    let Some(mime) = mime_for(path) else {
        bail!("Unsupported image type. Use a JPEG, PNG or WebP file.");
    };

    let meta = fs::metadata(path)
        .with_context(|| format!("Could not open {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a file", path.display());
    }
    if meta.len() > MAX_SELFIE_BYTES {
        bail!("The photo is too large (max 10 MB).");
    }

    let bytes = fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", path.display());
    }

    tracing::info!(bytes = bytes.len(), mime, "selfie loaded");
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn encodes_png_as_data_uri() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("me.PNG");
        fs::write(&path, b"abc").unwrap();

        assert_eq!(load_selfie(&path).unwrap(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn jpeg_extensions_share_a_mime_type() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpeg"] {
            let path = dir.path().join(name);
            fs::write(&path, b"x").unwrap();
            assert!(load_selfie(&path).unwrap().starts_with("data:image/jpeg;base64,"));
        }
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("me.gif");
        fs::write(&path, b"GIF89a").unwrap();

        let err = load_selfie(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported image type"));
    }

    #[test]
    fn missing_and_empty_files_fail() {
        let dir = TempDir::new().unwrap();
        assert!(load_selfie(&dir.path().join("nope.jpg")).is_err());

        let empty = dir.path().join("empty.webp");
        fs::write(&empty, b"").unwrap();
        assert!(load_selfie(&empty).is_err());
    }
}
