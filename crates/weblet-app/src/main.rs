//! Weblet - run websites as desktop applications
//!
//! One binary serves two roles. Without `--webapp` it is the manager:
//! registering, editing, launching, and removing webapps. With
//! `--webapp <id>` (the form desktop entries use) it becomes a
//! standalone instance of that webapp with its own profile and PID.

use clap::{Parser, Subcommand};
use weblet_app::icon_fetcher::IconFetcher;
use weblet_app::manager::{WebAppManager, WebAppUpdate};
use weblet_app::{process, standalone};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weblet_core::types::{Language, StartupBehavior, Theme};
use weblet_core::Paths;

#[derive(Parser)]
#[command(name = "weblet", version, about = "Run websites as desktop applications")]
struct Cli {
    /// Launch a webapp instance (used by generated desktop entries)
    #[arg(long, value_name = "ID")]
    webapp: Option<String>,

    /// With --webapp: open a fresh window instead of reusing one
    #[arg(long, requires = "webapp")]
    new_window: bool,

    /// Show the settings of a webapp
    #[arg(long, value_name = "ID", conflicts_with = "webapp")]
    preferences: Option<String>,

    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new webapp
    Add {
        url: String,
        /// Display name; fetched from the page title when omitted
        #[arg(long)]
        name: Option<String>,
        /// Category id (social, messaging, productivity, ...)
        #[arg(long)]
        category: Option<String>,
        /// Use a local image file as the icon
        #[arg(long, value_name = "FILE")]
        icon: Option<PathBuf>,
        /// Skip fetching site metadata (title and icon)
        #[arg(long)]
        no_fetch: bool,
    },
    /// List registered webapps
    List {
        /// Only show webapps in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// Search webapps by name
    Search { query: String },
    /// Show recently launched webapps
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Edit an existing webapp
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<String>,
        #[arg(long)]
        clear_category: bool,
        /// Replace the icon with a local image file
        #[arg(long, value_name = "FILE")]
        icon: Option<PathBuf>,
    },
    /// Remove a webapp, its profile, and its desktop entries
    Remove { id: String },
    /// Launch a webapp in its own window
    Launch { id: String },
    /// Ask a running webapp to close
    Close { id: String },
    /// Re-fetch the site icon for a webapp
    FetchIcon { id: String },
    /// Change per-webapp settings
    Set {
        id: String,
        #[arg(long)]
        allow_tabs: Option<bool>,
        #[arg(long)]
        allow_popups: Option<bool>,
        /// Keep running in the background when the window closes
        #[arg(long)]
        background: Option<bool>,
        #[arg(long)]
        tray: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        javascript: Option<bool>,
        #[arg(long)]
        zoom: Option<f64>,
        /// Custom user agent; an empty string restores the default
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Show or change global settings
    Config {
        /// default, dark, or light
        #[arg(long)]
        theme: Option<String>,
        /// main_window, hidden, or restore_session
        #[arg(long)]
        startup: Option<String>,
        #[arg(long)]
        shared_network: Option<bool>,
        /// pt or en
        #[arg(long)]
        language: Option<String>,
    },
    /// Regenerate every desktop entry
    Sync,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let paths = Paths::from_env();

    if let Some(webapp_id) = cli.webapp {
        return run_standalone(paths, &webapp_id, cli.new_window);
    }

    let exec_path = std::env::current_exe()?;
    let mut manager = WebAppManager::new(paths, exec_path)?;

    if let Some(webapp_id) = cli.preferences {
        return show_preferences(&manager, &webapp_id);
    }

    match cli.command.unwrap_or(Command::List { category: None }) {
        Command::Add {
            url,
            name,
            category,
            icon,
            no_fetch,
        } => {
            let mut icon_bytes = icon.map(std::fs::read).transpose()?;

            let metadata = if !no_fetch && (name.is_none() || icon_bytes.is_none()) {
                let target = url::Url::parse(&weblet_core::validation::validate_url(&url)?)?;
                IconFetcher::new()?.fetch_metadata(&target)
            } else {
                Default::default()
            };

            let name = match name.or(metadata.title) {
                Some(name) => name,
                None => anyhow::bail!("Could not determine a name for {}; pass --name", url),
            };
            if icon_bytes.is_none() {
                icon_bytes = metadata.icon;
            }

            let webapp = manager.create_webapp(
                &name,
                &url,
                category.as_deref(),
                icon_bytes.as_deref(),
            )?;
            println!("Added {} ({})", webapp.name, webapp.id);
        }
        Command::List { category } => {
            let webapps = match category.as_deref() {
                Some(category) => manager.by_category(category)?,
                None => manager.list_webapps()?,
            };
            print_webapps(&manager, &webapps);
        }
        Command::Search { query } => {
            let webapps = manager.search(&query)?;
            print_webapps(&manager, &webapps);
        }
        Command::Recent { limit } => {
            let webapps = manager.recent(limit)?;
            print_webapps(&manager, &webapps);
        }
        Command::Edit {
            id,
            name,
            url,
            category,
            clear_category,
            icon,
        } => {
            let category = if clear_category {
                Some(None)
            } else {
                category.map(Some)
            };
            let url_changed = url.is_some();
            let update = WebAppUpdate {
                name,
                url,
                category,
                icon: icon.map(std::fs::read).transpose()?,
            };
            let icon_provided = update.icon.is_some();
            let webapp = manager.update_webapp(&id, update)?;
            println!("Updated {}", webapp.name);

            if url_changed && !icon_provided {
                // A new site usually means a new favicon; older fetches
                // for the previous URL must not win over this one.
                let fetcher = IconFetcher::new()?;
                fetcher.invalidate();
                let home = url::Url::parse(&webapp.url)?;
                let updates = fetcher.fetch_in_background(&webapp.id, home);
                match updates.recv_timeout(Duration::from_secs(15)) {
                    Ok(found) if found.generation == fetcher.current_generation() => {
                        manager.set_icon(&found.webapp_id, &found.data)?;
                        println!("Icon updated for new site");
                    }
                    Ok(_) => log::debug!("Discarding icon fetched for a superseded URL"),
                    Err(_) => log::info!("No icon found for the new site"),
                }
            }
        }
        Command::Remove { id } => {
            manager.delete_webapp(&id)?;
            println!("Removed {}", id);
        }
        Command::Launch { id } => {
            manager.launch(&id)?;
        }
        Command::Close { id } => {
            if manager.close_running(&id)? {
                println!("Asked {} to close", id);
            } else {
                println!("{} is not running", id);
            }
        }
        Command::FetchIcon { id } => {
            let fetcher = IconFetcher::new()?;
            if manager.refresh_icon(&id, &fetcher)? {
                println!("Icon updated");
            } else {
                println!("No icon found");
            }
        }
        Command::Set {
            id,
            allow_tabs,
            allow_popups,
            background,
            tray,
            notifications,
            javascript,
            zoom,
            user_agent,
        } => {
            let mut settings = manager.settings(&id)?;
            if let Some(v) = allow_tabs {
                settings.allow_tabs = v;
            }
            if let Some(v) = allow_popups {
                settings.allow_popups = v;
            }
            if let Some(v) = background {
                settings.run_background = v;
            }
            if let Some(v) = tray {
                settings.show_tray = v;
            }
            if let Some(v) = notifications {
                settings.enable_notif = v;
            }
            if let Some(v) = javascript {
                settings.javascript = v;
            }
            if let Some(v) = zoom {
                settings.zoom_level = v;
            }
            if let Some(agent) = user_agent {
                weblet_core::validation::validate_user_agent(&agent)?;
                settings.user_agent = if agent.is_empty() { None } else { Some(agent) };
            }
            manager.update_settings(&settings)?;
            println!("Settings updated");
        }
        Command::Config {
            theme,
            startup,
            shared_network,
            language,
        } => {
            let mut settings = manager.app_settings()?;
            let mut changed = false;
            if let Some(theme) = theme {
                settings.theme = Theme::from_key(&theme)
                    .ok_or_else(|| anyhow::anyhow!("unknown theme: {}", theme))?;
                changed = true;
            }
            if let Some(startup) = startup {
                settings.startup_behavior = StartupBehavior::from_key(&startup)
                    .ok_or_else(|| anyhow::anyhow!("unknown startup behavior: {}", startup))?;
                changed = true;
            }
            if let Some(shared) = shared_network {
                settings.shared_network_process = shared;
                changed = true;
            }
            if let Some(language) = language {
                settings.language = Language::from_key(&language)
                    .ok_or_else(|| anyhow::anyhow!("unknown language: {}", language))?;
                changed = true;
            }
            if changed {
                manager.save_app_settings(&settings)?;
            }
            println!("theme            {}", settings.theme.as_str());
            println!("startup          {}", settings.startup_behavior.as_str());
            println!("shared_network   {}", settings.shared_network_process);
            println!("language         {}", settings.language.as_str());
        }
        Command::Sync => {
            manager.refresh_desktop_entries()?;
            println!("Desktop entries refreshed");
        }
    }

    Ok(())
}

fn init_logging(debug: bool) {
    // Route log-crate records from the library crates into tracing.
    if tracing_log::LogTracer::init().is_err() {
        return;
    }
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn run_standalone(paths: Paths, webapp_id: &str, new_window: bool) -> anyhow::Result<()> {
    // A second click on the desktop entry should not steal the PID
    // file from the running instance; the window manager focuses it.
    if !new_window && process::ProcessTracker::new(paths.clone()).is_running(webapp_id) {
        info!("Webapp {} is already running", webapp_id);
        return Ok(());
    }

    info!("Starting standalone instance for {}", webapp_id);
    let mut runtime = standalone::StandaloneRuntime::start(paths, webapp_id)?;
    runtime.run()?;
    Ok(())
}

fn show_preferences(manager: &WebAppManager, webapp_id: &str) -> anyhow::Result<()> {
    if let Some(webapp) = manager.get_webapp(webapp_id)? {
        println!("{} ({})", webapp.name, webapp.url);
    }
    let settings = manager.settings(webapp_id)?;
    println!("allow_tabs            {}", settings.allow_tabs);
    println!("allow_popups          {}", settings.allow_popups);
    println!("run_background        {}", settings.run_background);
    println!("show_tray             {}", settings.show_tray);
    println!("enable_notifications  {}", settings.enable_notif);
    println!("enable_javascript     {}", settings.javascript);
    println!("zoom_level            {}", settings.zoom_level);
    println!(
        "window                {}x{}",
        settings.window_width, settings.window_height
    );
    if let Some(agent) = settings.user_agent {
        println!("user_agent            {}", agent);
    }
    Ok(())
}

fn print_webapps(manager: &WebAppManager, webapps: &[weblet_core::types::WebApp]) {
    if webapps.is_empty() {
        println!("No webapps registered");
        return;
    }
    for webapp in webapps {
        let category = webapp.category.as_deref().unwrap_or("-");
        let running = if manager.is_running(&webapp.id) {
            "running"
        } else {
            ""
        };
        println!(
            "{}  {:<20} {:<12} {:<30} {}",
            webapp.id, webapp.name, category, webapp.url, running
        );
    }
}
