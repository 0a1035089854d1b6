//! Icon normalization and theme installation

use image::imageops::FilterType;
use std::fs;
use std::path::Path;
use weblet_core::paths::instance_id;
use weblet_core::{Paths, WebletError, WebletResult};

/// Size of the canonical cached icon.
pub const ICON_SIZE: u32 = 128;

/// Hicolor theme buckets the icon is installed into.
const THEME_SIZES: &[u32] = &[16, 32, 48, 64, 128, 256];

/// Decode raw image bytes and write the canonical 128x128 PNG into
/// the icon cache. Returns the cached icon path.
pub fn cache_icon(paths: &Paths, webapp_id: &str, data: &[u8]) -> WebletResult<std::path::PathBuf> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| WebletError::desktop(format!("Failed to decode icon: {}", e)))?;

    let icons_dir = paths.icons_dir();
    fs::create_dir_all(&icons_dir)
        .map_err(|e| WebletError::desktop(format!("Failed to create icons directory: {}", e)))?;

    let target = paths.icon_path(webapp_id);
    decoded
        .resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3)
        .save_with_format(&target, image::ImageFormat::Png)
        .map_err(|e| WebletError::desktop(format!("Failed to write icon: {}", e)))?;

    Ok(target)
}

/// Install the cached icon into the user's hicolor theme under every
/// standard size, named by the webapp's instance id so desktop entries
/// can reference it by icon name.
pub fn install_theme_icons(paths: &Paths, webapp_id: &str, source: &Path) -> WebletResult<()> {
    let decoded = image::open(source)
        .map_err(|e| WebletError::desktop(format!("Failed to open icon {:?}: {}", source, e)))?;

    let icon_name = format!("{}.png", instance_id(webapp_id));
    for &size in THEME_SIZES {
        let dir = paths
            .icon_theme_dir()
            .join(format!("{size}x{size}"))
            .join("apps");
        fs::create_dir_all(&dir).map_err(|e| {
            WebletError::desktop(format!("Failed to create theme directory: {}", e))
        })?;

        decoded
            .resize_exact(size, size, FilterType::Lanczos3)
            .save_with_format(dir.join(&icon_name), image::ImageFormat::Png)
            .map_err(|e| WebletError::desktop(format!("Failed to write theme icon: {}", e)))?;
    }

    Ok(())
}

/// Remove every installed icon for a webapp. Missing files are fine.
pub fn remove_icons(paths: &Paths, webapp_id: &str) -> WebletResult<()> {
    remove_if_present(&paths.icon_path(webapp_id))?;

    let icon_name = format!("{}.png", instance_id(webapp_id));
    for &size in THEME_SIZES {
        let path = paths
            .icon_theme_dir()
            .join(format!("{size}x{size}"))
            .join("apps")
            .join(&icon_name);
        remove_if_present(&path)?;
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> WebletResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WebletError::desktop(format!(
            "Failed to remove {:?}: {}",
            path, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([10, 20, 30, 255]),
        ));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn test_cache_icon_normalizes_to_128() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());

        let cached = cache_icon(&paths, "app-a", &sample_png(300, 200)).unwrap();
        assert_eq!(cached, paths.icon_path("app-a"));

        let stored = image::open(&cached).unwrap();
        assert_eq!(stored.width(), ICON_SIZE);
        assert_eq!(stored.height(), ICON_SIZE);
    }

    #[test]
    fn test_cache_icon_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());
        assert!(cache_icon(&paths, "app-a", b"not an image").is_err());
    }

    #[test]
    fn test_theme_install_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_root(dir.path());

        let cached = cache_icon(&paths, "app-a", &sample_png(64, 64)).unwrap();
        install_theme_icons(&paths, "app-a", &cached).unwrap();

        let installed = paths
            .icon_theme_dir()
            .join("48x48")
            .join("apps")
            .join(format!("{}.png", instance_id("app-a")));
        assert!(installed.exists());

        remove_icons(&paths, "app-a").unwrap();
        assert!(!installed.exists());
        assert!(!cached.exists());

        // Removing again is a no-op.
        remove_icons(&paths, "app-a").unwrap();
    }
}
