//! Webapp lifecycle orchestration
//!
//! The manager owns the registry and coordinates every side effect a
//! lifecycle change implies: profile directories, desktop artifacts,
//! icon caching, and running instances. The database record is
//! authoritative; artifact cleanup is best-effort so a half-broken
//! desktop never wedges a delete.

use crate::icon_fetcher::IconFetcher;
use crate::process::ProcessTracker;
use std::path::PathBuf;
use url::Url;
use weblet_core::types::{
    category_by_id, generate_webapp_id, AppSettings, WebApp, WebAppSettings,
};
use weblet_core::validation::{validate_name, validate_url};
use weblet_core::{unix_now, Paths, WebletError, WebletResult};
use weblet_desktop::DesktopIntegration;
use weblet_profile::{PermissionKind, ProfileManager};
use weblet_store::Store;

/// Requested changes to an existing webapp. `None` fields are left
/// untouched.
#[derive(Debug, Default)]
pub struct WebAppUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub category: Option<Option<String>>,
    pub icon: Option<Vec<u8>>,
}

pub struct WebAppManager {
    store: Store,
    profiles: ProfileManager,
    desktop: DesktopIntegration,
    processes: ProcessTracker,
    paths: Paths,
    exec_path: PathBuf,
}

impl WebAppManager {
    pub fn new(paths: Paths, exec_path: PathBuf) -> WebletResult<Self> {
        std::fs::create_dir_all(paths.config_dir()).map_err(|e| {
            WebletError::Config(format!("Failed to create config directory: {}", e))
        })?;

        let store = Store::open(paths.database_path())?;
        Ok(Self {
            store,
            profiles: ProfileManager::new(paths.clone()),
            desktop: DesktopIntegration::new(paths.clone(), exec_path.clone()),
            processes: ProcessTracker::new(paths.clone()),
            paths,
            exec_path,
        })
    }

    /// Register a new webapp: validate, persist, and install its
    /// desktop presence. The webapp's identity is fixed here and never
    /// changes afterwards.
    pub fn create_webapp(
        &mut self,
        name: &str,
        url: &str,
        category: Option<&str>,
        icon: Option<&[u8]>,
    ) -> WebletResult<WebApp> {
        let name = validate_name(name)?;
        let url = validate_url(url)?;
        let home = Url::parse(&url)?;
        let category = validate_category(category)?;

        let id = generate_webapp_id();
        let icon_path = match icon {
            Some(data) => Some(
                weblet_desktop::icons::cache_icon(&self.paths, &id, data)?
                    .to_string_lossy()
                    .into_owned(),
            ),
            None => None,
        };

        let webapp = WebApp {
            id: id.clone(),
            name,
            url,
            icon_path,
            category,
            created_at: unix_now(),
            last_opened: None,
            open_count: 0,
        };

        let settings = WebAppSettings::new(&id);
        self.store.create_webapp(&webapp, &settings)?;

        // The profile exists from day one, and notifications default
        // to allowed for the webapp's own origin.
        let shared = self.store.load_app_settings()?.shared_network_process;
        self.profiles.context(&id, shared)?;
        if settings.enable_notif {
            let mut permissions = self.profiles.load_permissions(&id)?;
            permissions.decide(
                &home.origin().ascii_serialization(),
                PermissionKind::Notifications,
                true,
            );
            self.profiles.save_permissions(&id, &permissions)?;
        }

        self.desktop.install(&webapp)?;

        log::info!("Created webapp {} ({})", webapp.name, webapp.id);
        Ok(webapp)
    }

    /// Apply an edit. The identifier is stable, so the profile (and
    /// its cookies) survives; a running instance is nudged to re-read
    /// its branding.
    pub fn update_webapp(&mut self, id: &str, update: WebAppUpdate) -> WebletResult<WebApp> {
        let mut webapp = self.require_webapp(id)?;

        if let Some(name) = update.name {
            webapp.name = validate_name(&name)?;
        }
        if let Some(url) = update.url {
            webapp.url = validate_url(&url)?;
        }
        if let Some(category) = update.category {
            webapp.category = validate_category(category.as_deref())?;
        }
        if let Some(icon) = update.icon {
            webapp.icon_path = Some(
                weblet_desktop::icons::cache_icon(&self.paths, id, &icon)?
                    .to_string_lossy()
                    .into_owned(),
            );
        }

        self.store.update_webapp(&webapp)?;
        self.desktop.install(&webapp)?;

        match self.processes.refresh_branding(id) {
            Ok(true) => log::info!("Asked running instance of {} to refresh", webapp.name),
            Ok(false) => {}
            Err(e) => log::warn!("Could not refresh running instance: {}", e),
        }

        Ok(webapp)
    }

    /// Delete a webapp and everything derived from it. The instance is
    /// stopped first; artifact removal failures are logged but do not
    /// leave the record behind.
    pub fn delete_webapp(&mut self, id: &str) -> WebletResult<()> {
        let webapp = self.require_webapp(id)?;

        match self.processes.terminate(id) {
            Ok(true) => log::info!("Terminated running instance of {}", webapp.name),
            Ok(false) => {}
            Err(e) => log::warn!("Could not terminate instance: {}", e),
        }

        self.store.delete_webapp(id)?;

        self.processes.remove_pid(id);
        if let Err(e) = self.desktop.uninstall(id) {
            log::warn!("Desktop cleanup failed for {}: {}", webapp.name, e);
        }
        if let Err(e) = self.profiles.clear(id) {
            log::warn!("Profile cleanup failed for {}: {}", webapp.name, e);
        }

        log::info!("Deleted webapp {} ({})", webapp.name, id);
        Ok(())
    }

    /// Start a standalone instance, or do nothing if one is already
    /// running. Every successful launch is recorded.
    pub fn launch(&mut self, id: &str) -> WebletResult<()> {
        let webapp = self.require_webapp(id)?;

        if self.processes.is_running(id) {
            log::info!("{} is already running", webapp.name);
            return Ok(());
        }

        self.processes.spawn(id, &self.exec_path)?;
        self.store.record_opened(id)?;
        Ok(())
    }

    /// Ask a running instance to shut down. Returns false when nothing
    /// was running.
    pub fn close_running(&mut self, id: &str) -> WebletResult<bool> {
        self.require_webapp(id)?;
        self.processes.terminate(id)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.processes.is_running(id)
    }

    pub fn get_webapp(&self, id: &str) -> WebletResult<Option<WebApp>> {
        self.store.get_webapp(id)
    }

    pub fn list_webapps(&self) -> WebletResult<Vec<WebApp>> {
        self.store.get_all_webapps()
    }

    pub fn search(&self, query: &str) -> WebletResult<Vec<WebApp>> {
        self.store.search_webapps(query)
    }

    pub fn by_category(&self, category: &str) -> WebletResult<Vec<WebApp>> {
        self.store.get_by_category(category)
    }

    pub fn recent(&self, limit: u32) -> WebletResult<Vec<WebApp>> {
        self.store.get_recent(limit)
    }

    pub fn settings(&self, id: &str) -> WebletResult<WebAppSettings> {
        self.store
            .get_settings(id)?
            .ok_or_else(|| WebletError::not_found(format!("No webapp with id {}", id)))
    }

    pub fn update_settings(&mut self, settings: &WebAppSettings) -> WebletResult<()> {
        self.store.update_settings(settings)
    }

    pub fn app_settings(&self) -> WebletResult<AppSettings> {
        self.store.load_app_settings()
    }

    pub fn save_app_settings(&mut self, settings: &AppSettings) -> WebletResult<()> {
        self.store.save_app_settings(settings)
    }

    /// Regenerate every desktop entry. Run at startup so renames and
    /// binary moves propagate to the menu.
    pub fn refresh_desktop_entries(&mut self) -> WebletResult<()> {
        let webapps = self.store.get_all_webapps()?;
        log::info!("Refreshing desktop entries for {} webapps", webapps.len());
        self.desktop.sync_all(&webapps)
    }

    /// Fetch the site icon for an existing webapp and install it.
    pub fn refresh_icon(&mut self, id: &str, fetcher: &IconFetcher) -> WebletResult<bool> {
        let webapp = self.require_webapp(id)?;
        let url = Url::parse(&webapp.url)?;

        let Some(data) = fetcher.fetch(&url) else {
            return Ok(false);
        };
        self.set_icon(id, &data)?;
        Ok(true)
    }

    /// Cache new icon bytes for a webapp and reinstall its desktop
    /// presence with them.
    pub fn set_icon(&mut self, id: &str, data: &[u8]) -> WebletResult<()> {
        let cached = weblet_desktop::icons::cache_icon(&self.paths, id, data)?;
        self.store
            .update_icon_path(id, Some(&cached.to_string_lossy()))?;

        if let Some(webapp) = self.store.get_webapp(id)? {
            self.desktop.install(&webapp)?;
        }
        Ok(())
    }

    fn require_webapp(&self, id: &str) -> WebletResult<WebApp> {
        self.store
            .get_webapp(id)?
            .ok_or_else(|| WebletError::not_found(format!("No webapp with id {}", id)))
    }
}

fn validate_category(category: Option<&str>) -> WebletResult<Option<String>> {
    match category {
        None => Ok(None),
        Some(id) => match category_by_id(id) {
            Some(category) => Ok(Some(category.id.to_string())),
            None => Err(WebletError::validation(format!(
                "Unknown category: {}",
                id
            ))),
        },
    }
}
