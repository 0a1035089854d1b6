//! Common types used throughout Weblet

use crate::error::{WebletError, WebletResult};
use serde::{Deserialize, Serialize};

/// Unique identifier for a tab within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub u64);

impl TabId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a fresh webapp identifier.
///
/// Identifiers are opaque and never reused, so the join key for every
/// derived resource (profile, icon, desktop entry) stays stable for
/// the lifetime of the webapp.
pub fn generate_webapp_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A registered webapp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebApp {
    /// Opaque unique identifier, immutable after creation
    pub id: String,
    /// Display name (2-50 characters, trimmed)
    pub name: String,
    /// Normalized absolute HTTP/HTTPS URL
    pub url: String,
    /// Path to the locally cached icon, if any
    pub icon_path: Option<String>,
    /// Category id from the fixed category list
    pub category: Option<String>,
    /// Unix timestamp of creation
    pub created_at: i64,
    /// Unix timestamp of the most recent launch
    pub last_opened: Option<i64>,
    /// Number of times the webapp has been launched
    pub open_count: u32,
}

impl WebApp {
    pub fn has_custom_icon(&self) -> bool {
        self.icon_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Per-webapp settings, one record per webapp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAppSettings {
    pub webapp_id: String,
    pub allow_tabs: bool,
    pub allow_popups: bool,
    pub run_background: bool,
    pub show_tray: bool,
    pub enable_notif: bool,
    pub user_agent: Option<String>,
    pub javascript: bool,
    pub zoom_level: f64,
    pub window_width: i32,
    pub window_height: i32,
    pub window_x: Option<i32>,
    pub window_y: Option<i32>,
}

impl WebAppSettings {
    /// Default settings for a newly created webapp.
    pub fn new(webapp_id: impl Into<String>) -> Self {
        Self {
            webapp_id: webapp_id.into(),
            allow_tabs: true,
            allow_popups: true,
            run_background: false,
            show_tray: false,
            enable_notif: true,
            user_agent: None,
            javascript: true,
            zoom_level: 1.0,
            window_width: 1280,
            window_height: 720,
            window_x: None,
            window_y: None,
        }
    }

    /// Validate the type-level invariants, consuming and returning the
    /// settings so construction from raw values can be checked in one
    /// expression.
    pub fn checked(self) -> WebletResult<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> WebletResult<()> {
        if self.zoom_level <= 0.0 {
            return Err(WebletError::validation("zoom_level must be positive"));
        }
        if self.window_width <= 0 || self.window_height <= 0 {
            return Err(WebletError::validation(
                "window dimensions must be positive",
            ));
        }
        Ok(())
    }
}

/// UI theme for the manager window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "default" => Some(Self::Default),
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

/// What the manager does when launched without arguments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupBehavior {
    #[default]
    MainWindow,
    Hidden,
    RestoreSession,
}

impl StartupBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainWindow => "main_window",
            Self::Hidden => "hidden",
            Self::RestoreSession => "restore_session",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "main_window" => Some(Self::MainWindow),
            "hidden" => Some(Self::Hidden),
            "restore_session" => Some(Self::RestoreSession),
            _ => None,
        }
    }
}

/// UI language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::En => "en",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "pt" => Some(Self::Pt),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

/// Global application settings (a single record)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub theme: Theme,
    pub startup_behavior: StartupBehavior,
    pub shared_network_process: bool,
    pub language: Language,
}

impl AppSettings {
    /// Construct from raw key strings, rejecting unknown values.
    ///
    /// The store read path uses the lenient `from_key` fallbacks
    /// instead, so legacy rows never poison startup.
    pub fn from_raw(
        theme: &str,
        startup_behavior: &str,
        shared_network_process: bool,
        language: &str,
    ) -> WebletResult<Self> {
        let theme = Theme::from_key(theme)
            .ok_or_else(|| WebletError::validation(format!("invalid theme: {theme}")))?;
        let startup_behavior = StartupBehavior::from_key(startup_behavior).ok_or_else(|| {
            WebletError::validation(format!("invalid startup behavior: {startup_behavior}"))
        })?;
        let language = Language::from_key(language)
            .ok_or_else(|| WebletError::validation(format!("invalid language: {language}")))?;
        Ok(Self {
            theme,
            startup_behavior,
            shared_network_process,
            language,
        })
    }
}

/// A webapp category (immutable, fixed list)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

/// The fixed, non-editable category list.
pub const CATEGORIES: &[Category] = &[
    Category { id: "social", name: "Social", icon: "system-users-symbolic" },
    Category { id: "messaging", name: "Messaging", icon: "user-available-symbolic" },
    Category { id: "productivity", name: "Productivity", icon: "document-edit-symbolic" },
    Category { id: "entertainment", name: "Entertainment", icon: "emblem-music-symbolic" },
    Category { id: "news", name: "News", icon: "emblem-documents-symbolic" },
    Category { id: "development", name: "Development", icon: "applications-engineering-symbolic" },
    Category { id: "finance", name: "Finance", icon: "emblem-money-symbolic" },
    Category { id: "other", name: "Other", icon: "applications-other-symbolic" },
];

/// Look up a category by id.
pub fn category_by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_webapp_id();
        let b = generate_webapp_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_settings_defaults_are_valid() {
        let settings = WebAppSettings::new("abc");
        assert!(settings.validate().is_ok());
        assert!(settings.allow_tabs);
        assert_eq!(settings.zoom_level, 1.0);
    }

    #[test]
    fn test_settings_reject_zero_zoom() {
        let mut settings = WebAppSettings::new("abc");
        settings.zoom_level = 0.0;
        assert!(matches!(
            settings.checked(),
            Err(WebletError::Validation(_))
        ));
    }

    #[test]
    fn test_settings_reject_zero_dimensions() {
        let mut settings = WebAppSettings::new("abc");
        settings.window_height = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_accept_fractional_zoom() {
        let mut settings = WebAppSettings::new("abc");
        settings.zoom_level = 2.5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_app_settings_from_raw() {
        let settings = AppSettings::from_raw("dark", "hidden", true, "en").unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.startup_behavior, StartupBehavior::Hidden);
        assert_eq!(settings.language, Language::En);

        assert!(AppSettings::from_raw("neon", "hidden", true, "en").is_err());
        assert!(AppSettings::from_raw("dark", "sideways", true, "en").is_err());
        assert!(AppSettings::from_raw("dark", "hidden", true, "fr").is_err());
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(category_by_id("social").unwrap().name, "Social");
        assert!(category_by_id("unknown").is_none());
    }
}
