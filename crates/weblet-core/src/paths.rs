//! Identity and path resolution
//!
//! Every resource derived from a webapp identifier (profile directory,
//! icon file, desktop entry, PID file, launcher script) is resolved
//! here and nowhere else. Desktop integration, process tracking, and
//! profile isolation must agree bit-for-bit on these names, so the
//! derivations are pure functions of the identifier.

use std::path::{Path, PathBuf};

/// Application ID following reverse DNS notation
pub const APP_ID: &str = "io.github.weblet";

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
///
/// Used before embedding an identifier in names that must be D-Bus and
/// desktop-entry safe.
pub fn sanitize_id(webapp_id: &str) -> String {
    webapp_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// D-Bus safe suffix for per-webapp identifiers.
pub fn instance_suffix(webapp_id: &str) -> String {
    format!("webapp_{}", sanitize_id(webapp_id))
}

/// Full application ID used for standalone webapp instances.
pub fn instance_id(webapp_id: &str) -> String {
    format!("{APP_ID}.{}", instance_suffix(webapp_id))
}

/// The `.desktop` filename for a webapp (without path).
pub fn desktop_filename(webapp_id: &str) -> String {
    format!("{}.desktop", instance_id(webapp_id))
}

/// The icon filename (PNG) for a webapp.
pub fn icon_filename(webapp_id: &str) -> String {
    format!("{}.png", instance_id(webapp_id))
}

/// Resolved base directories for the application.
///
/// Constructed once from the environment (XDG Base Directory spec) or
/// from an explicit root in tests, then passed to whoever needs to
/// derive a path. Resolution is side-effect free; callers create
/// directories when they first write into them.
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    applications_dir: PathBuf,
    runtime_dir: Option<PathBuf>,
    desktop_dir: Option<PathBuf>,
}

impl Paths {
    /// Resolve directories from XDG environment variables with the
    /// usual home-relative fallbacks.
    pub fn from_env() -> Self {
        let data_home = env_path("XDG_DATA_HOME")
            .or_else(|| home_dir().map(|h| h.join(".local").join("share")))
            .unwrap_or_else(|| PathBuf::from("."));
        let config_home = env_path("XDG_CONFIG_HOME")
            .or_else(|| home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        let cache_home = env_path("XDG_CACHE_HOME")
            .or_else(|| home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_dir: config_home.join(APP_ID),
            data_dir: data_home.join(APP_ID),
            cache_dir: cache_home.join(APP_ID),
            applications_dir: data_home.join("applications"),
            runtime_dir: env_path("XDG_RUNTIME_DIR").map(|p| p.join(APP_ID)),
            desktop_dir: resolve_desktop_dir(),
        }
    }

    /// Root every directory under one path. Used by tests.
    pub fn with_root(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            applications_dir: root.join("applications"),
            runtime_dir: Some(root.join("runtime")),
            desktop_dir: Some(root.join("Desktop")),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.config_dir.join("webapps.db")
    }

    /// Directory holding every isolated profile.
    pub fn profiles_dir(&self) -> PathBuf {
        self.data_dir.join("profiles")
    }

    /// Isolated profile directory for one webapp.
    pub fn profile_dir(&self, webapp_id: &str) -> PathBuf {
        self.profiles_dir().join(webapp_id)
    }

    /// Saved session snapshot inside the profile.
    pub fn session_file(&self, webapp_id: &str) -> PathBuf {
        self.profile_dir(webapp_id).join("session.json")
    }

    /// Saved permission decisions inside the profile.
    pub fn permissions_file(&self, webapp_id: &str) -> PathBuf {
        self.profile_dir(webapp_id).join("permissions.json")
    }

    /// Cache directory paired with an isolated profile.
    pub fn profile_cache_dir(&self, webapp_id: &str) -> PathBuf {
        self.cache_dir.join("profiles").join(webapp_id)
    }

    /// Directory for cached webapp icons.
    pub fn icons_dir(&self) -> PathBuf {
        self.data_dir.join("icons")
    }

    /// Cached icon file for one webapp.
    pub fn icon_path(&self, webapp_id: &str) -> PathBuf {
        self.icons_dir().join(format!("{webapp_id}.png"))
    }

    /// Directory for log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.cache_dir.join("logs")
    }

    /// Directory for helper launcher scripts.
    pub fn launchers_dir(&self) -> PathBuf {
        self.data_dir.join("launchers")
    }

    /// Helper launcher script for one webapp.
    pub fn launcher_script_path(&self, webapp_id: &str) -> PathBuf {
        self.launchers_dir().join(format!("{webapp_id}.sh"))
    }

    /// Runtime directory tracking live webapp sessions.
    ///
    /// `None` when `XDG_RUNTIME_DIR` is not set; PID tracking is
    /// disabled in that case.
    pub fn sessions_dir(&self) -> Option<PathBuf> {
        self.runtime_dir.as_ref().map(|r| r.join("sessions"))
    }

    /// Control file holding the PID of a running webapp instance.
    pub fn pid_file(&self, webapp_id: &str) -> Option<PathBuf> {
        self.sessions_dir().map(|d| d.join(format!("{webapp_id}.pid")))
    }

    /// Directory where `.desktop` files are installed.
    pub fn applications_dir(&self) -> &Path {
        &self.applications_dir
    }

    /// Installed `.desktop` file for one webapp.
    pub fn desktop_file_path(&self, webapp_id: &str) -> PathBuf {
        self.applications_dir.join(desktop_filename(webapp_id))
    }

    /// Root of the hicolor icon theme for installed icon variants.
    pub fn icon_theme_dir(&self) -> PathBuf {
        self.data_dir
            .parent()
            .map(|d| d.to_path_buf())
            .unwrap_or_else(|| self.data_dir.clone())
            .join("icons")
            .join("hicolor")
    }

    /// Desktop shortcut for one webapp, if a desktop directory exists.
    pub fn user_desktop_file_path(&self, webapp_id: &str) -> Option<PathBuf> {
        self.desktop_dir
            .as_ref()
            .map(|d| d.join(desktop_filename(webapp_id)))
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Resolve the user's desktop directory: environment override first,
/// then the `user-dirs.dirs` configuration, then `~/Desktop`.
fn resolve_desktop_dir() -> Option<PathBuf> {
    if let Some(dir) = env_path("XDG_DESKTOP_DIR") {
        return Some(dir);
    }

    let home = home_dir()?;
    let user_dirs = home.join(".config").join("user-dirs.dirs");
    if let Ok(contents) = std::fs::read_to_string(&user_dirs) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(value) = line.strip_prefix("XDG_DESKTOP_DIR=") {
                let cleaned = value.trim().trim_matches('"');
                let expanded = cleaned.replace("$HOME", &home.to_string_lossy());
                return Some(PathBuf::from(expanded));
            }
        }
    }

    Some(home.join("Desktop"))
}
