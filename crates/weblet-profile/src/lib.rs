//! Per-webapp profile isolation
//!
//! Every webapp gets its own data and cache directories, so cookies,
//! local storage, and caches never leak between webapps. Contexts are
//! cached per identifier and handed out as shared references; clearing
//! a profile evicts the context and removes its directories.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use weblet_core::{Paths, WebletError, WebletResult};

pub mod permissions;

pub use permissions::{PermissionKind, Permissions};

/// The storage backing one webapp's browsing state.
#[derive(Debug)]
pub struct BrowsingContext {
    webapp_id: String,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    shared_network: bool,
}

impl BrowsingContext {
    pub fn webapp_id(&self) -> &str {
        &self.webapp_id
    }

    /// Where cookies, local storage, and the IndexedDB live.
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Whether this context shares the network process with other
    /// webapps. Storage stays isolated either way.
    pub fn shared_network(&self) -> bool {
        self.shared_network
    }
}

pub struct ProfileManager {
    paths: Paths,
    contexts: HashMap<String, Arc<BrowsingContext>>,
}

impl ProfileManager {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            contexts: HashMap::new(),
        }
    }

    /// Get (creating on first use) the browsing context for a webapp.
    ///
    /// Repeated calls for the same identifier return the same context,
    /// regardless of the `shared_network` flag passed later; the flag
    /// is fixed when the context is first built.
    pub fn context(
        &mut self,
        webapp_id: &str,
        shared_network: bool,
    ) -> WebletResult<Arc<BrowsingContext>> {
        if let Some(context) = self.contexts.get(webapp_id) {
            return Ok(Arc::clone(context));
        }

        let data_dir = self.paths.profile_dir(webapp_id);
        let cache_dir = self.paths.profile_cache_dir(webapp_id);

        fs::create_dir_all(&data_dir).map_err(|e| {
            WebletError::profile(format!("Failed to create profile directory: {}", e))
        })?;
        fs::create_dir_all(&cache_dir).map_err(|e| {
            WebletError::profile(format!("Failed to create profile cache: {}", e))
        })?;

        log::info!("Created browsing context for webapp {}", webapp_id);

        let context = Arc::new(BrowsingContext {
            webapp_id: webapp_id.to_string(),
            data_dir,
            cache_dir,
            shared_network,
        });
        self.contexts
            .insert(webapp_id.to_string(), Arc::clone(&context));
        Ok(context)
    }

    /// Whether a profile directory exists on disk for this webapp.
    pub fn exists(&self, webapp_id: &str) -> bool {
        self.paths.profile_dir(webapp_id).is_dir()
    }

    /// Remove all stored browsing state for a webapp and evict its
    /// cached context. Safe to call for webapps with no profile.
    pub fn clear(&mut self, webapp_id: &str) -> WebletResult<()> {
        log::info!("Clearing profile for webapp {}", webapp_id);
        self.contexts.remove(webapp_id);

        remove_dir_if_present(&self.paths.profile_dir(webapp_id))?;
        remove_dir_if_present(&self.paths.profile_cache_dir(webapp_id))?;
        Ok(())
    }

    /// Load the saved permission decisions for a webapp. A missing
    /// file means nothing has been decided yet.
    pub fn load_permissions(&self, webapp_id: &str) -> WebletResult<Permissions> {
        Permissions::load(&self.paths.permissions_file(webapp_id))
    }

    pub fn save_permissions(
        &self,
        webapp_id: &str,
        permissions: &Permissions,
    ) -> WebletResult<()> {
        let path = self.paths.permissions_file(webapp_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                WebletError::profile(format!("Failed to create profile directory: {}", e))
            })?;
        }
        permissions.save(&path)
    }
}

fn remove_dir_if_present(dir: &PathBuf) -> WebletResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(WebletError::profile(format!(
            "Failed to remove {:?}: {}",
            dir, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn manager(root: &Path) -> ProfileManager {
        ProfileManager::new(Paths::with_root(root))
    }

    #[test]
    fn test_contexts_are_isolated_per_webapp() {
        let dir = tempfile::tempdir().unwrap();
        let mut profiles = manager(dir.path());

        let a = profiles.context("app-a", false).unwrap();
        let b = profiles.context("app-b", false).unwrap();

        assert_ne!(a.data_dir(), b.data_dir());
        assert_ne!(a.cache_dir(), b.cache_dir());
        assert!(a.data_dir().is_dir());
        assert!(b.data_dir().is_dir());
    }

    #[test]
    fn test_context_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut profiles = manager(dir.path());

        let first = profiles.context("app-a", true).unwrap();
        let second = profiles.context("app-a", false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.shared_network());
    }

    #[test]
    fn test_clear_removes_directories_and_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let mut profiles = manager(dir.path());

        let context = profiles.context("app-a", false).unwrap();
        std::fs::write(context.data_dir().join("cookies.sqlite"), b"x").unwrap();

        profiles.clear("app-a").unwrap();
        assert!(!profiles.exists("app-a"));

        // A fresh context starts from an empty directory.
        let fresh = profiles.context("app-a", false).unwrap();
        assert!(!fresh.data_dir().join("cookies.sqlite").exists());
    }

    #[test]
    fn test_clear_missing_profile_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut profiles = manager(dir.path());
        profiles.clear("never-created").unwrap();
    }

    #[test]
    fn test_permissions_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut profiles = manager(dir.path());
        profiles.context("app-a", false).unwrap();

        let mut permissions = profiles.load_permissions("app-a").unwrap();
        assert!(permissions
            .decision("https://example.com", PermissionKind::Notifications)
            .is_none());

        permissions.decide("https://example.com", PermissionKind::Notifications, true);
        permissions.decide("https://example.com", PermissionKind::Geolocation, false);
        profiles.save_permissions("app-a", &permissions).unwrap();

        let loaded = profiles.load_permissions("app-a").unwrap();
        assert_eq!(
            loaded.decision("https://example.com", PermissionKind::Notifications),
            Some(true)
        );
        assert_eq!(
            loaded.decision("https://example.com", PermissionKind::Geolocation),
            Some(false)
        );
    }
}
