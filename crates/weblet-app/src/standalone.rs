//! Standalone webapp instance
//!
//! One process per launched webapp. The instance registers its PID,
//! opens the webapp's isolated profile, and keeps a tab shell for its
//! window. Two signals drive it from outside: SIGTERM asks it to save
//! its session and exit, SIGUSR1 asks it to re-read its name and icon
//! after an edit in the manager.

use crate::process::ProcessTracker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;
use weblet_core::types::{StartupBehavior, WebApp, WebAppSettings};
use weblet_core::{Paths, WebletError, WebletResult};
use weblet_desktop::{LogTrayPublisher, TrayMenu, TrayPublisher};
use weblet_profile::ProfileManager;
use weblet_shell::{SessionSnapshot, TabShell};
use weblet_store::Store;

static TERMINATE_REQUESTED: AtomicBool = AtomicBool::new(false);
static REFRESH_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_terminate(_signal: libc::c_int) {
    TERMINATE_REQUESTED.store(true, Ordering::SeqCst);
}

extern "C" fn handle_refresh(_signal: libc::c_int) {
    REFRESH_REQUESTED.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, handle_terminate as libc::sighandler_t);
        libc::signal(libc::SIGUSR1, handle_refresh as libc::sighandler_t);
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    Refreshed,
    Terminated,
}

pub struct StandaloneRuntime {
    store: Store,
    webapp: WebApp,
    settings: WebAppSettings,
    shell: TabShell,
    tracker: ProcessTracker,
    paths: Paths,
    tray: Box<dyn TrayPublisher>,
    // In-process requests (tray Quit, window close). The statics above
    // belong to the signal handlers; these belong to this instance.
    terminate_requested: AtomicBool,
    refresh_requested: AtomicBool,
}

impl StandaloneRuntime {
    /// Bring up a webapp instance: load its record, register the PID,
    /// open the profile, and build the window shell (restoring the
    /// saved session when configured to).
    pub fn start(paths: Paths, webapp_id: &str) -> WebletResult<Self> {
        let mut store = Store::open(paths.database_path())?;

        let webapp = store
            .get_webapp(webapp_id)?
            .ok_or_else(|| WebletError::not_found(format!("No webapp with id {}", webapp_id)))?;
        let settings = store
            .get_settings(webapp_id)?
            .ok_or_else(|| WebletError::not_found(format!("No settings for {}", webapp_id)))?;
        let app_settings = store.load_app_settings()?;

        log::info!("Starting webapp {} ({})", webapp.name, webapp.id);

        install_signal_handlers();
        TERMINATE_REQUESTED.store(false, Ordering::SeqCst);
        REFRESH_REQUESTED.store(false, Ordering::SeqCst);

        let tracker = ProcessTracker::new(paths.clone());
        tracker.write_own_pid(webapp_id)?;

        let mut profiles = ProfileManager::new(paths.clone());
        profiles.context(webapp_id, app_settings.shared_network_process)?;

        let home_url = Url::parse(&webapp.url)?;
        let mut shell = TabShell::new(
            webapp.name.clone(),
            home_url,
            settings.allow_tabs,
            settings.allow_popups,
        );

        if app_settings.startup_behavior == StartupBehavior::RestoreSession {
            if let Some(snapshot) = SessionSnapshot::load(&paths.session_file(webapp_id))? {
                log::info!("Restoring saved session ({} tabs)", snapshot.tabs.len());
                shell.load_snapshot(snapshot);
            }
        }

        store.record_opened(webapp_id)?;

        let mut runtime = Self {
            store,
            webapp,
            settings,
            shell,
            tracker,
            paths,
            tray: Box::new(LogTrayPublisher),
            terminate_requested: AtomicBool::new(false),
            refresh_requested: AtomicBool::new(false),
        };
        runtime.publish_tray();
        Ok(runtime)
    }

    pub fn webapp(&self) -> &WebApp {
        &self.webapp
    }

    pub fn settings(&self) -> &WebAppSettings {
        &self.settings
    }

    pub fn shell(&mut self) -> &mut TabShell {
        &mut self.shell
    }

    /// Replace the tray sink. Used when the desktop offers a real
    /// status-notifier host.
    pub fn set_tray_publisher(&mut self, tray: Box<dyn TrayPublisher>) {
        self.tray = tray;
        self.publish_tray();
    }

    /// Request shutdown from inside the process (tray Quit, window
    /// close).
    pub fn request_terminate(&self) {
        self.terminate_requested.store(true, Ordering::SeqCst);
    }

    pub fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::SeqCst);
    }

    /// Handle pending signal and in-process requests. Terminate wins
    /// over refresh.
    pub fn poll(&mut self) -> WebletResult<PollOutcome> {
        let terminate = TERMINATE_REQUESTED.swap(false, Ordering::SeqCst)
            | self.terminate_requested.swap(false, Ordering::SeqCst);
        let refresh = REFRESH_REQUESTED.swap(false, Ordering::SeqCst)
            | self.refresh_requested.swap(false, Ordering::SeqCst);

        if terminate {
            self.shutdown()?;
            return Ok(PollOutcome::Terminated);
        }
        if refresh {
            self.refresh_branding()?;
            return Ok(PollOutcome::Refreshed);
        }
        Ok(PollOutcome::Continue)
    }

    /// Block until a terminate request arrives.
    pub fn run(&mut self) -> WebletResult<()> {
        loop {
            if self.poll()? == PollOutcome::Terminated {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    /// Re-read the webapp record after an edit in the manager.
    fn refresh_branding(&mut self) -> WebletResult<()> {
        let Some(webapp) = self.store.get_webapp(&self.webapp.id)? else {
            // Deleted while running; a terminate follows shortly.
            return Ok(());
        };

        log::info!("Refreshing branding: {} -> {}", self.webapp.name, webapp.name);
        self.shell.set_webapp_name(webapp.name.clone());
        self.webapp = webapp;
        self.publish_tray();
        Ok(())
    }

    /// Save the session, drop the PID file, and retract the tray.
    fn shutdown(&mut self) -> WebletResult<()> {
        log::info!("Shutting down webapp {}", self.webapp.name);

        let snapshot = self.shell.snapshot();
        if let Err(e) = snapshot.save(&self.paths.session_file(&self.webapp.id)) {
            log::warn!("Failed to save session: {}", e);
        }

        if self.settings.show_tray {
            self.tray.retract().ok();
        }
        self.tracker.remove_pid(&self.webapp.id);
        Ok(())
    }

    fn publish_tray(&mut self) {
        if !self.settings.show_tray {
            return;
        }
        let menu = TrayMenu::for_webapp(
            &self.webapp.name,
            &weblet_core::paths::instance_id(&self.webapp.id),
        );
        if let Err(e) = self.tray.publish(&menu) {
            log::warn!("Tray publish failed: {}", e);
        }
    }
}
