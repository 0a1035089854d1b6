//! Tray menu model
//!
//! Webapps that run in the background expose a small fixed menu from
//! the system tray. The menu itself is a plain data model; publishing
//! it to a status-notifier host is behind a trait so the runtime can
//! plug in whatever the desktop offers, and failures stay best-effort.

use weblet_core::WebletResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayItem {
    /// Show (or focus) the webapp window.
    Open,
    Separator,
    /// Terminate the webapp instance.
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayMenu {
    pub title: String,
    pub icon_name: String,
    pub items: Vec<TrayItem>,
}

impl TrayMenu {
    /// The fixed menu shown for a background webapp.
    pub fn for_webapp(name: &str, icon_name: &str) -> Self {
        Self {
            title: name.to_string(),
            icon_name: icon_name.to_string(),
            items: vec![TrayItem::Open, TrayItem::Separator, TrayItem::Quit],
        }
    }
}

/// Sink for tray menus. Publishing is best-effort; a desktop without a
/// tray host simply drops the menu.
pub trait TrayPublisher {
    fn publish(&mut self, menu: &TrayMenu) -> WebletResult<()>;
    fn retract(&mut self) -> WebletResult<()>;
}

/// Publisher that only logs, used when no tray host is available.
#[derive(Debug, Default)]
pub struct LogTrayPublisher;

impl TrayPublisher for LogTrayPublisher {
    fn publish(&mut self, menu: &TrayMenu) -> WebletResult<()> {
        log::info!("Tray menu for {} ({} items)", menu.title, menu.items.len());
        Ok(())
    }

    fn retract(&mut self) -> WebletResult<()> {
        log::info!("Tray menu retracted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_shape_is_fixed() {
        let menu = TrayMenu::for_webapp("Mail", "io.example.mail");
        assert_eq!(
            menu.items,
            vec![TrayItem::Open, TrayItem::Separator, TrayItem::Quit]
        );
        assert_eq!(menu.title, "Mail");
    }
}
