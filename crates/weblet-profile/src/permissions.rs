//! Remembered permission decisions
//!
//! Decisions are keyed by origin and permission kind and stored as
//! JSON inside the profile, so clearing a profile also forgets them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use weblet_core::{WebletError, WebletResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Notifications,
    Geolocation,
    Microphone,
    Camera,
    Clipboard,
}

/// Per-origin permission decisions for one webapp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    origins: HashMap<String, HashMap<PermissionKind, bool>>,
}

impl Permissions {
    /// Load from disk. A missing file yields an empty set; a corrupt
    /// file is an error so decisions are never silently dropped.
    pub fn load(path: &Path) -> WebletResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                WebletError::profile(format!("Failed to parse permissions: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(WebletError::profile(format!(
                "Failed to read permissions: {}",
                e
            ))),
        }
    }

    pub fn save(&self, path: &Path) -> WebletResult<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            WebletError::profile(format!("Failed to serialize permissions: {}", e))
        })?;
        std::fs::write(path, contents)
            .map_err(|e| WebletError::profile(format!("Failed to write permissions: {}", e)))
    }

    /// The remembered decision, if any. `None` means ask the user.
    pub fn decision(&self, origin: &str, kind: PermissionKind) -> Option<bool> {
        self.origins.get(origin).and_then(|k| k.get(&kind)).copied()
    }

    pub fn decide(&mut self, origin: &str, kind: PermissionKind, allowed: bool) {
        self.origins
            .entry(origin.to_string())
            .or_default()
            .insert(kind, allowed);
    }

    pub fn forget(&mut self, origin: &str) {
        self.origins.remove(origin);
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_and_forget() {
        let mut permissions = Permissions::default();
        permissions.decide("https://a.example", PermissionKind::Camera, true);
        assert_eq!(
            permissions.decision("https://a.example", PermissionKind::Camera),
            Some(true)
        );
        assert!(permissions
            .decision("https://a.example", PermissionKind::Microphone)
            .is_none());

        permissions.forget("https://a.example");
        assert!(permissions.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Permissions::load(&dir.path().join("permissions.json")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(Permissions::load(&path).is_err());
    }
}
