//! Webapp window shell - tab strip, popup routing, session snapshots

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use url::Url;
use weblet_core::{types::TabId, WebletError, WebletResult};

/// Hard cap on simultaneous tabs in one webapp window.
pub const MAX_TABS: usize = 10;

#[derive(Debug, Clone)]
pub struct TabInfo {
    pub id: TabId,
    pub url: Url,
    pub title: Option<String>,
    pub loading: bool,
}

/// Where a popup request ends up, decided by the webapp's settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupDisposition {
    /// Popups disabled: drop the request.
    Suppress,
    /// Tabs enabled: open in a new tab of this window.
    NewTab(Url),
    /// Tabs disabled but popups allowed: open a separate window.
    NewWindow(Url),
}

/// What actually happened to a routed popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupAction {
    Suppressed,
    TabOpened(TabId),
    OpenWindow(Url),
}

/// Tab bookkeeping for one webapp window.
///
/// The shell guarantees the window always shows at least one tab:
/// closing the last tab replaces it with a fresh tab at the webapp's
/// home URL instead of leaving the window empty.
pub struct TabShell {
    webapp_name: String,
    home_url: Url,
    tabs: HashMap<TabId, TabInfo>,
    order: Vec<TabId>,
    active_tab: Option<TabId>,
    allow_tabs: bool,
    allow_popups: bool,
}

impl TabShell {
    pub fn new(
        webapp_name: impl Into<String>,
        home_url: Url,
        allow_tabs: bool,
        allow_popups: bool,
    ) -> Self {
        let mut shell = Self {
            webapp_name: webapp_name.into(),
            home_url,
            tabs: HashMap::new(),
            order: Vec::new(),
            active_tab: None,
            allow_tabs,
            allow_popups,
        };

        // Every window starts with its home tab.
        let home = shell.home_url.clone();
        shell.insert_tab(home);
        shell
    }

    /// Open a new tab at `url` and select it.
    pub fn create_tab(&mut self, url: Url) -> WebletResult<TabId> {
        if !self.allow_tabs {
            return Err(WebletError::Config(
                "Tabs are disabled for this webapp".to_string(),
            ));
        }
        if self.order.len() >= MAX_TABS {
            return Err(WebletError::Config(format!(
                "Tab limit of {} reached",
                MAX_TABS
            )));
        }

        log::info!("Opening tab at {}", url);
        Ok(self.insert_tab(url))
    }

    /// Close a tab. Closing the last remaining tab replaces it with a
    /// fresh home tab so the window never goes empty.
    pub fn close_tab(&mut self, tab_id: TabId) -> WebletResult<()> {
        if !self.tabs.contains_key(&tab_id) {
            return Err(WebletError::Config("Tab not found".to_string()));
        }

        if self.order.len() == 1 {
            log::info!("Last tab closed, returning to {}", self.home_url);
            let home = self.home_url.clone();
            let replacement = self.insert_tab(home);
            self.remove_tab(tab_id);
            self.active_tab = Some(replacement);
            return Ok(());
        }

        let was_active = self.active_tab == Some(tab_id);
        let index = self.order.iter().position(|&id| id == tab_id);
        self.remove_tab(tab_id);

        if was_active {
            // Select the left neighbor, or the new first tab.
            let next = index
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| self.order.get(i))
                .or_else(|| self.order.first());
            self.active_tab = next.copied();
        }

        Ok(())
    }

    pub fn select_tab(&mut self, tab_id: TabId) -> WebletResult<()> {
        if !self.tabs.contains_key(&tab_id) {
            return Err(WebletError::Config("Tab not found".to_string()));
        }
        self.active_tab = Some(tab_id);
        Ok(())
    }

    pub fn active_tab(&self) -> Option<&TabInfo> {
        self.active_tab.and_then(|id| self.tabs.get(&id))
    }

    pub fn get_tab(&self, tab_id: TabId) -> Option<&TabInfo> {
        self.tabs.get(&tab_id)
    }

    /// Tabs in display order.
    pub fn tabs(&self) -> Vec<&TabInfo> {
        self.order
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .collect()
    }

    pub fn tab_count(&self) -> usize {
        self.order.len()
    }

    pub fn navigate(&mut self, tab_id: TabId, url: Url) -> WebletResult<()> {
        let tab = self
            .tabs
            .get_mut(&tab_id)
            .ok_or_else(|| WebletError::Config("Tab not found".to_string()))?;
        log::info!("Navigating tab {:?} to {}", tab_id, url);
        tab.url = url;
        tab.loading = true;
        Ok(())
    }

    pub fn load_started(&mut self, tab_id: TabId) {
        if let Some(tab) = self.tabs.get_mut(&tab_id) {
            tab.loading = true;
        }
    }

    pub fn load_finished(&mut self, tab_id: TabId) {
        if let Some(tab) = self.tabs.get_mut(&tab_id) {
            tab.loading = false;
        }
    }

    /// Page title update from the renderer. Empty titles fall back to
    /// the webapp name.
    pub fn title_changed(&mut self, tab_id: TabId, title: &str) {
        if let Some(tab) = self.tabs.get_mut(&tab_id) {
            let title = title.trim();
            tab.title = if title.is_empty() {
                None
            } else {
                Some(title.to_string())
            };
        }
    }

    /// Display title for a tab: page title, or the webapp name while
    /// nothing better is known.
    pub fn display_title(&self, tab_id: TabId) -> String {
        self.tabs
            .get(&tab_id)
            .and_then(|tab| tab.title.clone())
            .unwrap_or_else(|| self.webapp_name.clone())
    }

    /// Update the fallback title after the webapp was renamed.
    pub fn set_webapp_name(&mut self, name: impl Into<String>) {
        self.webapp_name = name.into();
    }

    /// Decide what to do with a popup request. The target URL is
    /// preserved in every non-suppressed outcome.
    pub fn route_popup(&self, url: Url) -> PopupDisposition {
        if !self.allow_popups {
            return PopupDisposition::Suppress;
        }
        if self.allow_tabs {
            return PopupDisposition::NewTab(url);
        }
        PopupDisposition::NewWindow(url)
    }

    /// Route a popup and apply the outcome. A popup routed to a tab
    /// falls back to a separate window when the tab limit is reached.
    pub fn open_popup(&mut self, url: Url) -> PopupAction {
        match self.route_popup(url) {
            PopupDisposition::Suppress => {
                log::info!("Suppressed popup (popups disabled)");
                PopupAction::Suppressed
            }
            PopupDisposition::NewWindow(url) => PopupAction::OpenWindow(url),
            PopupDisposition::NewTab(url) => match self.create_tab(url.clone()) {
                Ok(tab_id) => PopupAction::TabOpened(tab_id),
                Err(_) => PopupAction::OpenWindow(url),
            },
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let tabs = self
            .order
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .map(|tab| TabSnapshot {
                url: tab.url.to_string(),
                title: tab.title.clone(),
            })
            .collect();

        let active_tab_index = self
            .active_tab
            .and_then(|active| self.order.iter().position(|&id| id == active));

        SessionSnapshot {
            tabs,
            active_tab_index,
        }
    }

    /// Replace the current tabs with a saved session. Unparsable URLs
    /// are skipped and anything beyond the tab limit is dropped; an
    /// empty result falls back to the home tab.
    pub fn load_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.tabs.clear();
        self.order.clear();
        self.active_tab = None;

        for tab_snapshot in snapshot.tabs {
            if self.order.len() >= MAX_TABS {
                break;
            }
            let url = match Url::parse(&tab_snapshot.url) {
                Ok(url) => url,
                Err(e) => {
                    log::warn!("Skipping saved tab {}: {}", tab_snapshot.url, e);
                    continue;
                }
            };
            let tab_id = self.insert_tab(url);
            if let Some(tab) = self.tabs.get_mut(&tab_id) {
                tab.title = tab_snapshot.title;
            }
        }

        if self.order.is_empty() {
            let home = self.home_url.clone();
            self.insert_tab(home);
            return;
        }

        self.active_tab = snapshot
            .active_tab_index
            .and_then(|index| self.order.get(index))
            .copied()
            .or_else(|| self.order.first().copied());
    }

    fn insert_tab(&mut self, url: Url) -> TabId {
        let tab_id = TabId::new();
        self.tabs.insert(
            tab_id,
            TabInfo {
                id: tab_id,
                url,
                title: None,
                loading: true,
            },
        );
        self.order.push(tab_id);
        self.active_tab = Some(tab_id);
        tab_id
    }

    fn remove_tab(&mut self, tab_id: TabId) {
        self.tabs.remove(&tab_id);
        self.order.retain(|&id| id != tab_id);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub url: String,
    pub title: Option<String>,
}

/// Serializable state of one window, written into the profile so a
/// session can be restored on the next launch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tabs: Vec<TabSnapshot>,
    pub active_tab_index: Option<usize>,
}

impl SessionSnapshot {
    /// Load from disk. A missing file means no saved session.
    pub fn load(path: &Path) -> WebletResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| WebletError::Config(format!("Failed to parse session: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WebletError::Config(format!(
                "Failed to read session: {}",
                e
            ))),
        }
    }

    pub fn save(&self, path: &Path) -> WebletResult<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| WebletError::Config(format!("Failed to serialize session: {}", e)))?;
        std::fs::write(path, contents)
            .map_err(|e| WebletError::Config(format!("Failed to write session: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Url {
        Url::parse("https://app.example.com/").unwrap()
    }

    fn other(path: &str) -> Url {
        Url::parse(&format!("https://app.example.com/{}", path)).unwrap()
    }

    fn shell() -> TabShell {
        TabShell::new("Example", home(), true, true)
    }

    #[test]
    fn test_window_starts_with_home_tab() {
        let shell = shell();
        assert_eq!(shell.tab_count(), 1);
        assert_eq!(shell.active_tab().unwrap().url, home());
    }

    #[test]
    fn test_create_tab_selects_it() {
        let mut shell = shell();
        let tab = shell.create_tab(other("inbox")).unwrap();
        assert_eq!(shell.tab_count(), 2);
        assert_eq!(shell.active_tab().unwrap().id, tab);
    }

    #[test]
    fn test_tab_limit_enforced() {
        let mut shell = shell();
        for i in 1..MAX_TABS {
            shell.create_tab(other(&format!("page{}", i))).unwrap();
        }
        assert_eq!(shell.tab_count(), MAX_TABS);
        assert!(shell.create_tab(other("overflow")).is_err());
        assert_eq!(shell.tab_count(), MAX_TABS);
    }

    #[test]
    fn test_create_tab_rejected_when_tabs_disabled() {
        let mut shell = TabShell::new("Example", home(), false, true);
        assert!(shell.create_tab(other("x")).is_err());
    }

    #[test]
    fn test_closing_last_tab_replaces_with_home() {
        let mut shell = shell();
        let first = shell.active_tab().unwrap().id;
        shell.navigate(first, other("deep/page")).unwrap();

        shell.close_tab(first).unwrap();

        assert_eq!(shell.tab_count(), 1);
        let replacement = shell.active_tab().unwrap();
        assert_ne!(replacement.id, first);
        assert_eq!(replacement.url, home());
    }

    #[test]
    fn test_closing_active_tab_selects_left_neighbor() {
        let mut shell = shell();
        let first = shell.active_tab().unwrap().id;
        let second = shell.create_tab(other("b")).unwrap();
        let third = shell.create_tab(other("c")).unwrap();

        shell.close_tab(third).unwrap();
        assert_eq!(shell.active_tab().unwrap().id, second);

        // Closing an inactive tab leaves the selection alone.
        shell.close_tab(first).unwrap();
        assert_eq!(shell.active_tab().unwrap().id, second);
    }

    #[test]
    fn test_title_fallback_to_webapp_name() {
        let mut shell = shell();
        let tab = shell.active_tab().unwrap().id;
        assert_eq!(shell.display_title(tab), "Example");

        shell.title_changed(tab, "Inbox (3)");
        assert_eq!(shell.display_title(tab), "Inbox (3)");

        shell.title_changed(tab, "   ");
        assert_eq!(shell.display_title(tab), "Example");
    }

    #[test]
    fn test_popup_routing_follows_settings() {
        let url = other("popup");

        let tabs_on = TabShell::new("T", home(), true, true);
        assert_eq!(
            tabs_on.route_popup(url.clone()),
            PopupDisposition::NewTab(url.clone())
        );

        let tabs_off = TabShell::new("T", home(), false, true);
        assert_eq!(
            tabs_off.route_popup(url.clone()),
            PopupDisposition::NewWindow(url.clone())
        );

        let popups_off = TabShell::new("T", home(), true, false);
        assert_eq!(popups_off.route_popup(url), PopupDisposition::Suppress);
    }

    #[test]
    fn test_popup_falls_back_to_window_at_tab_limit() {
        let mut shell = shell();
        for i in 1..MAX_TABS {
            shell.create_tab(other(&format!("page{}", i))).unwrap();
        }

        let url = other("popup");
        match shell.open_popup(url.clone()) {
            PopupAction::OpenWindow(opened) => assert_eq!(opened, url),
            action => panic!("expected window fallback, got {:?}", action),
        }
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut shell = shell();
        let first = shell.active_tab().unwrap().id;
        shell.title_changed(first, "Home");
        let second = shell.create_tab(other("b")).unwrap();
        shell.create_tab(other("c")).unwrap();
        shell.select_tab(second).unwrap();

        let snapshot = shell.snapshot();
        assert_eq!(snapshot.tabs.len(), 3);
        assert_eq!(snapshot.active_tab_index, Some(1));

        let mut restored = TabShell::new("Example", home(), true, true);
        restored.load_snapshot(snapshot);
        assert_eq!(restored.tab_count(), 3);
        assert_eq!(restored.active_tab().unwrap().url, other("b"));
        assert_eq!(restored.tabs()[0].title.as_deref(), Some("Home"));
    }

    #[test]
    fn test_load_snapshot_skips_bad_urls_and_clamps() {
        let mut tabs = vec![TabSnapshot {
            url: "not a url".to_string(),
            title: None,
        }];
        for i in 0..MAX_TABS + 5 {
            tabs.push(TabSnapshot {
                url: format!("https://app.example.com/p{}", i),
                title: None,
            });
        }

        let mut shell = shell();
        shell.load_snapshot(SessionSnapshot {
            tabs,
            active_tab_index: Some(99),
        });

        assert_eq!(shell.tab_count(), MAX_TABS);
        // Out-of-range active index falls back to the first tab.
        assert_eq!(shell.active_tab().unwrap().url, other("p0"));
    }

    #[test]
    fn test_load_empty_snapshot_falls_back_to_home() {
        let mut shell = shell();
        shell.load_snapshot(SessionSnapshot::default());
        assert_eq!(shell.tab_count(), 1);
        assert_eq!(shell.active_tab().unwrap().url, home());
    }

    #[test]
    fn test_session_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        assert!(SessionSnapshot::load(&path).unwrap().is_none());

        let shell = shell();
        shell.snapshot().save(&path).unwrap();

        let loaded = SessionSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.tabs.len(), 1);
    }
}
