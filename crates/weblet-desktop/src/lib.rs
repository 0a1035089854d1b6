//! Desktop environment integration
//!
//! Installs and removes the artifacts that make a webapp look like a
//! native application: a `.desktop` entry in the applications menu, an
//! optional desktop shortcut, themed icons, and a shell launcher as a
//! fallback for environments that do not read desktop entries.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use weblet_core::paths::instance_id;
use weblet_core::types::WebApp;
use weblet_core::{Paths, WebletError, WebletResult};

pub mod entry;
pub mod icons;
pub mod tray;

pub use tray::{LogTrayPublisher, TrayItem, TrayMenu, TrayPublisher};

pub struct DesktopIntegration {
    paths: Paths,
    exec_path: PathBuf,
}

impl DesktopIntegration {
    /// `exec_path` is the manager binary the generated entries launch.
    pub fn new(paths: Paths, exec_path: PathBuf) -> Self {
        Self { paths, exec_path }
    }

    /// Install or refresh every desktop artifact for a webapp. The
    /// menu entry is required; the desktop shortcut and menu cache
    /// refresh are best-effort.
    pub fn install(&self, webapp: &WebApp) -> WebletResult<()> {
        log::info!("Installing desktop entry for {}", webapp.name);

        let icon = self.install_icon(webapp)?;
        let contents = entry::render(webapp, &self.exec_path.to_string_lossy(), &icon);

        let entry_path = self.paths.desktop_file_path(&webapp.id);
        write_executable(&entry_path, &contents)?;

        self.write_launcher(webapp)?;
        self.copy_to_user_desktop(&webapp.id, &contents);
        self.refresh_menu_cache();
        Ok(())
    }

    /// Remove every desktop artifact for a webapp. Missing artifacts
    /// are fine; uninstall is used during deletion cleanup.
    pub fn uninstall(&self, webapp_id: &str) -> WebletResult<()> {
        log::info!("Removing desktop entries for {}", webapp_id);

        remove_if_present(&self.paths.desktop_file_path(webapp_id))?;
        if let Some(shortcut) = self.paths.user_desktop_file_path(webapp_id) {
            remove_if_present(&shortcut)?;
        }
        remove_if_present(&self.paths.launcher_script_path(webapp_id))?;
        icons::remove_icons(&self.paths, webapp_id)?;

        self.refresh_menu_cache();
        Ok(())
    }

    /// Regenerate the entries for every known webapp. Run at startup
    /// so renames, icon changes, and a moved binary propagate.
    pub fn sync_all(&self, webapps: &[WebApp]) -> WebletResult<()> {
        for webapp in webapps {
            if let Err(e) = self.install(webapp) {
                log::warn!("Failed to refresh desktop entry for {}: {}", webapp.name, e);
            }
        }
        Ok(())
    }

    pub fn entry_exists(&self, webapp_id: &str) -> bool {
        self.paths.desktop_file_path(webapp_id).is_file()
    }

    /// Themed icon name when the webapp has a cached icon, otherwise a
    /// generic fallback name.
    fn install_icon(&self, webapp: &WebApp) -> WebletResult<String> {
        if let Some(icon_path) = webapp.icon_path.as_deref().filter(|p| !p.is_empty()) {
            match icons::install_theme_icons(&self.paths, &webapp.id, Path::new(icon_path)) {
                Ok(()) => return Ok(instance_id(&webapp.id)),
                Err(e) => log::warn!("Icon install failed for {}: {}", webapp.name, e),
            }
        }
        Ok("web-browser".to_string())
    }

    /// Plain shell launcher for environments without a menu.
    fn write_launcher(&self, webapp: &WebApp) -> WebletResult<()> {
        let dir = self.paths.launchers_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            WebletError::desktop(format!("Failed to create launchers directory: {}", e))
        })?;

        let script = format!(
            "#!/bin/sh\nexec \"{}\" --webapp {} \"$@\"\n",
            self.exec_path.display(),
            webapp.id
        );
        write_executable(&self.paths.launcher_script_path(&webapp.id), &script)
    }

    fn copy_to_user_desktop(&self, webapp_id: &str, contents: &str) {
        let Some(shortcut) = self.paths.user_desktop_file_path(webapp_id) else {
            return;
        };
        let Some(desktop_dir) = shortcut.parent() else {
            return;
        };
        if !desktop_dir.is_dir() {
            return;
        }
        if let Err(e) = write_executable(&shortcut, contents) {
            log::warn!("Failed to place desktop shortcut: {}", e);
        }
    }

    /// Ask the desktop to re-read the applications directory. Absent
    /// tooling is not an error.
    fn refresh_menu_cache(&self) {
        let status = Command::new("update-desktop-database")
            .arg(self.paths.applications_dir())
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("update-desktop-database exited with {}", status),
            Err(e) => log::debug!("update-desktop-database unavailable: {}", e),
        }
    }
}

fn write_executable(path: &Path, contents: &str) -> WebletResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| WebletError::desktop(format!("Failed to create {:?}: {}", parent, e)))?;
    }
    fs::write(path, contents)
        .map_err(|e| WebletError::desktop(format!("Failed to write {:?}: {}", path, e)))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| WebletError::desktop(format!("Failed to set permissions: {}", e)))?;
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
    use weblet_core::unix_now;

    fn webapp(id: &str, name: &str) -> WebApp {
        WebApp {
            id: id.to_string(),
            name: name.to_string(),
            url: "https://example.com/".to_string(),
            icon_path: None,
            category: None,
            created_at: unix_now(),
            last_opened: None,
            open_count: 0,
        }
    }

    fn integration(root: &Path) -> DesktopIntegration {
        DesktopIntegration::new(Paths::with_root(root), PathBuf::from("/usr/bin/weblet"))
    }

    #[test]
    fn test_install_writes_entry_and_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = integration(dir.path());
        let app = webapp("app-a", "Mail");

        desktop.install(&app).unwrap();

        let paths = Paths::with_root(dir.path());
        let entry_path = paths.desktop_file_path("app-a");
        assert!(desktop.entry_exists("app-a"));

        let contents = fs::read_to_string(&entry_path).unwrap();
        assert!(contents.contains("Name=Mail"));
        assert!(contents.contains("Icon=web-browser"));

        let mode = fs::metadata(&entry_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let launcher = fs::read_to_string(paths.launcher_script_path("app-a")).unwrap();
        assert!(launcher.starts_with("#!/bin/sh\n"));
        assert!(launcher.contains("--webapp app-a"));
    }

    #[test]
    fn test_desktop_shortcut_only_when_directory_exists() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = integration(dir.path());
        let paths = Paths::with_root(dir.path());
        let app = webapp("app-a", "Mail");

        // No Desktop directory yet: install succeeds without it.
        desktop.install(&app).unwrap();
        let shortcut = paths.user_desktop_file_path("app-a").unwrap();
        assert!(!shortcut.exists());

        fs::create_dir_all(shortcut.parent().unwrap()).unwrap();
        desktop.install(&app).unwrap();
        assert!(shortcut.exists());
    }

    #[test]
    fn test_uninstall_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = integration(dir.path());
        let paths = Paths::with_root(dir.path());
        let app = webapp("app-a", "Mail");

        desktop.install(&app).unwrap();
        desktop.uninstall("app-a").unwrap();

        assert!(!desktop.entry_exists("app-a"));
        assert!(!paths.launcher_script_path("app-a").exists());

        // Uninstalling an unknown id is a no-op.
        desktop.uninstall("never-installed").unwrap();
    }

    #[test]
    fn test_install_with_cached_icon_uses_instance_name() {
        let dir = tempfile::tempdir().unwrap();
        let desktop = integration(dir.path());
        let paths = Paths::with_root(dir.path());

        let png = {
            let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
                64,
                64,
                image::Rgba([1, 2, 3, 255]),
            ));
            let mut bytes = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
            bytes
        };
        let cached = icons::cache_icon(&paths, "app-a", &png).unwrap();

        let mut app = webapp("app-a", "Mail");
        app.icon_path = Some(cached.to_string_lossy().into_owned());
        desktop.install(&app).unwrap();

        let contents = fs::read_to_string(paths.desktop_file_path("app-a")).unwrap();
        assert!(contents.contains(&format!("Icon={}", instance_id("app-a"))));
    }
}
