use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// URL prefix under which stored uploads are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Lowercased extension of `filename` if it is one we accept.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Whether `name` can only refer to a file directly inside the uploads dir.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}

/// Delete the file behind a stored `/uploads/...` reference.
/// References that are empty, remote or unsafe are left alone.
pub fn remove(dir: &Path, public_ref: &str) {
    let Some(name) = public_ref.strip_prefix(PUBLIC_PREFIX) else {
        return;
    };
    if !is_safe_name(name) {
        return;
    }
    if let Err(e) = std::fs::remove_file(dir.join(name)) {
        tracing::debug!("Could not remove upload {}: {}", name, e);
    }
}

/// Shrink `img` so neither edge exceeds `max_dim`. Never enlarges.
pub fn bound(img: DynamicImage, max_dim: u32) -> DynamicImage {
    if img.width() <= max_dim && img.height() <= max_dim {
        img
    } else {
        img.thumbnail(max_dim, max_dim)
    }
}

/// Decode, resize and write an upload under a fresh random name.
/// The client's filename only contributes its extension.
/// Returns the public reference, or `None` if anything fails.
pub fn store(dir: &Path, filename: &str, bytes: &[u8], max_dim: u32) -> Option<String> {
    let ext = allowed_extension(filename)?;
    let format = ImageFormat::from_extension(&ext)?;

    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!("Discarding undecodable upload: {}", e);
            return None;
        }
    };
    let img = bound(img, max_dim);
    // JPEG has no alpha channel
    let img = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img
    };

    let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), ext);
    let path: PathBuf = dir.join(&name);
    if let Err(e) = img.save_with_format(&path, format) {
        tracing::warn!("Failed to write upload {}: {}", path.display(), e);
        let _ = std::fs::remove_file(&path);
        return None;
    }

    Some(format!("{}{}", PUBLIC_PREFIX, name))
}

/// [`store`] on a blocking thread. Failure yields `None`.
pub async fn store_upload(
    dir: PathBuf,
    filename: String,
    bytes: Vec<u8>,
    max_dim: u32,
) -> Option<String> {
    match tokio::task::spawn_blocking(move || store(&dir, &filename, &bytes, max_dim)).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!("Image task failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |_, _| Rgba([255, 200, 0, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn allowed_extension_is_case_insensitive() {
        assert_eq!(allowed_extension("Cat.JPG").as_deref(), Some("jpg"));
        assert_eq!(allowed_extension("a.b.gif").as_deref(), Some("gif"));
        assert_eq!(allowed_extension("script.sh"), None);
        assert_eq!(allowed_extension("noextension"), None);
    }

    #[test]
    fn store_shrinks_and_keeps_aspect_ratio() {
        let tmp = tempfile::tempdir().unwrap();
        let stored = store(tmp.path(), "wide.png", &png_bytes(1800, 600), 900).unwrap();
        let name = stored.strip_prefix(PUBLIC_PREFIX).unwrap();

        let img = image::open(tmp.path().join(name)).unwrap();
        assert_eq!(img.width(), 900);
        assert_eq!(img.height(), 300);
    }

    #[test]
    fn store_never_enlarges() {
        let tmp = tempfile::tempdir().unwrap();
        let stored = store(tmp.path(), "small.png", &png_bytes(40, 20), 400).unwrap();
        let img = image::open(tmp.path().join(stored.strip_prefix(PUBLIC_PREFIX).unwrap())).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));
    }

    #[test]
    fn store_discards_client_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let stored = store(tmp.path(), "../../etc/passwd.png", &png_bytes(10, 10), 900).unwrap();
        let name = stored.strip_prefix(PUBLIC_PREFIX).unwrap();
        assert!(!name.contains('/'));
        assert!(!name.contains("passwd"));
        assert!(tmp.path().join(name).exists());
    }

    #[test]
    fn store_writes_jpeg_from_alpha_source() {
        let tmp = tempfile::tempdir().unwrap();
        let stored = store(tmp.path(), "photo.jpeg", &png_bytes(10, 10), 900);
        assert!(stored.unwrap().ends_with(".jpeg"));
    }

    #[test]
    fn safe_names_stay_inside_the_directory() {
        assert!(is_safe_name("0a1b2c.png"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name(".hidden"));
        assert!(!is_safe_name("../chrpi.db"));
        assert!(!is_safe_name("a/b.png"));
        assert!(!is_safe_name("a\\b.png"));
    }

    #[test]
    fn remove_deletes_only_local_uploads() {
        let tmp = tempfile::tempdir().unwrap();
        let stored = store(tmp.path(), "a.png", &png_bytes(4, 4), 900).unwrap();
        let outside = tmp.path().join("keep.txt");
        std::fs::write(&outside, "x").unwrap();

        remove(tmp.path(), "https://example.com/uploads/keep.txt");
        remove(tmp.path(), "/uploads/../keep.txt");
        remove(tmp.path(), &stored);

        assert!(outside.exists());
        assert!(!tmp.path().join(stored.strip_prefix(PUBLIC_PREFIX).unwrap()).exists());
    }

    #[test]
    fn store_rejects_garbage_and_bad_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store(tmp.path(), "x.png", b"not an image", 900).is_none());
        assert!(store(tmp.path(), "x.exe", &png_bytes(5, 5), 900).is_none());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
