//! Persistent webapp registry backed by SQLite
//!
//! One database holds every registered webapp, its per-webapp settings
//! record, and the global application settings. Settings rows are
//! joined to their webapp by id and removed by cascade when the webapp
//! is deleted, so a webapp and its settings always exist together.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use weblet_core::types::{
    AppSettings, Language, StartupBehavior, Theme, WebApp, WebAppSettings,
};
use weblet_core::{unix_now, WebletError, WebletResult};

mod migrations;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `db_path` and bring
    /// its schema up to date.
    pub fn open<P: AsRef<Path>>(db_path: P) -> WebletResult<Self> {
        log::info!("Opening webapp store at {:?}", db_path.as_ref());

        let conn = Connection::open(db_path)
            .map_err(|e| WebletError::store(format!("Failed to open database: {}", e)))?;

        Self::from_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> WebletResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WebletError::store(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> WebletResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| WebletError::store(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::apply(&conn)?;

        Ok(Self { conn })
    }

    /// Insert a webapp and its settings record in one transaction.
    pub fn create_webapp(
        &mut self,
        webapp: &WebApp,
        settings: &WebAppSettings,
    ) -> WebletResult<()> {
        log::info!("Creating webapp {} ({})", webapp.name, webapp.id);

        let tx = self
            .conn
            .transaction()
            .map_err(|e| WebletError::store(format!("Failed to start transaction: {}", e)))?;

        tx.execute(
            "INSERT INTO webapps (id, name, url, icon_path, category, created_at, last_opened, open_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                webapp.id,
                webapp.name,
                webapp.url,
                webapp.icon_path,
                webapp.category,
                webapp.created_at,
                webapp.last_opened,
                webapp.open_count,
            ],
        )
        .map_err(|e| WebletError::store(format!("Failed to insert webapp: {}", e)))?;

        insert_settings(&tx, settings)?;

        tx.commit()
            .map_err(|e| WebletError::store(format!("Failed to commit webapp: {}", e)))?;

        Ok(())
    }

    pub fn get_webapp(&self, id: &str) -> WebletResult<Option<WebApp>> {
        self.conn
            .query_row(
                "SELECT id, name, url, icon_path, category, created_at, last_opened, open_count
                 FROM webapps WHERE id = ?1",
                params![id],
                row_to_webapp,
            )
            .optional()
            .map_err(|e| WebletError::store(format!("Failed to load webapp: {}", e)))
    }

    /// All webapps, ordered by name (case-insensitive).
    pub fn get_all_webapps(&self) -> WebletResult<Vec<WebApp>> {
        self.query_webapps(
            "SELECT id, name, url, icon_path, category, created_at, last_opened, open_count
             FROM webapps ORDER BY name COLLATE NOCASE",
            params![],
        )
    }

    /// Update the mutable fields of a webapp. The id never changes.
    pub fn update_webapp(&mut self, webapp: &WebApp) -> WebletResult<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE webapps SET name = ?1, url = ?2, icon_path = ?3, category = ?4
                 WHERE id = ?5",
                params![
                    webapp.name,
                    webapp.url,
                    webapp.icon_path,
                    webapp.category,
                    webapp.id,
                ],
            )
            .map_err(|e| WebletError::store(format!("Failed to update webapp: {}", e)))?;

        if updated == 0 {
            return Err(WebletError::not_found(format!(
                "No webapp with id {}",
                webapp.id
            )));
        }

        Ok(())
    }

    /// Delete a webapp. Its settings row goes with it by cascade.
    /// Returns false when the id did not exist.
    pub fn delete_webapp(&mut self, id: &str) -> WebletResult<bool> {
        log::info!("Deleting webapp {}", id);

        let deleted = self
            .conn
            .execute("DELETE FROM webapps WHERE id = ?1", params![id])
            .map_err(|e| WebletError::store(format!("Failed to delete webapp: {}", e)))?;

        Ok(deleted > 0)
    }

    /// Record a launch: bump the open count and stamp the time.
    pub fn record_opened(&mut self, id: &str) -> WebletResult<()> {
        self.conn
            .execute(
                "UPDATE webapps SET last_opened = ?1, open_count = open_count + 1 WHERE id = ?2",
                params![unix_now(), id],
            )
            .map_err(|e| WebletError::store(format!("Failed to record launch: {}", e)))?;
        Ok(())
    }

    pub fn update_icon_path(&mut self, id: &str, icon_path: Option<&str>) -> WebletResult<()> {
        self.conn
            .execute(
                "UPDATE webapps SET icon_path = ?1 WHERE id = ?2",
                params![icon_path, id],
            )
            .map_err(|e| WebletError::store(format!("Failed to update icon path: {}", e)))?;
        Ok(())
    }

    /// Case-insensitive substring search over the display name. An
    /// empty query returns everything.
    pub fn search_webapps(&self, query: &str) -> WebletResult<Vec<WebApp>> {
        let query = query.trim();
        if query.is_empty() {
            return self.get_all_webapps();
        }

        let pattern = format!("%{}%", query);
        self.query_webapps(
            "SELECT id, name, url, icon_path, category, created_at, last_opened, open_count
             FROM webapps
             WHERE name LIKE ?1 COLLATE NOCASE
             ORDER BY name COLLATE NOCASE",
            params![pattern],
        )
    }

    pub fn get_by_category(&self, category: &str) -> WebletResult<Vec<WebApp>> {
        self.query_webapps(
            "SELECT id, name, url, icon_path, category, created_at, last_opened, open_count
             FROM webapps WHERE category = ?1 ORDER BY name COLLATE NOCASE",
            params![category],
        )
    }

    /// Most recently launched webapps, newest first.
    pub fn get_recent(&self, limit: u32) -> WebletResult<Vec<WebApp>> {
        self.query_webapps(
            "SELECT id, name, url, icon_path, category, created_at, last_opened, open_count
             FROM webapps WHERE last_opened IS NOT NULL
             ORDER BY last_opened DESC LIMIT ?1",
            params![limit],
        )
    }

    pub fn get_settings(&self, webapp_id: &str) -> WebletResult<Option<WebAppSettings>> {
        self.conn
            .query_row(
                "SELECT webapp_id, allow_tabs, allow_popups, run_background, show_tray,
                        enable_notif, user_agent, javascript, zoom_level,
                        window_width, window_height, window_x, window_y
                 FROM webapp_settings WHERE webapp_id = ?1",
                params![webapp_id],
                row_to_settings,
            )
            .optional()
            .map_err(|e| WebletError::store(format!("Failed to load settings: {}", e)))
    }

    /// Persist a settings record. Invalid settings are rejected before
    /// touching the database.
    pub fn update_settings(&mut self, settings: &WebAppSettings) -> WebletResult<()> {
        settings.validate()?;

        let updated = self
            .conn
            .execute(
                "UPDATE webapp_settings SET
                    allow_tabs = ?1, allow_popups = ?2, run_background = ?3,
                    show_tray = ?4, enable_notif = ?5, user_agent = ?6,
                    javascript = ?7, zoom_level = ?8,
                    window_width = ?9, window_height = ?10,
                    window_x = ?11, window_y = ?12
                 WHERE webapp_id = ?13",
                params![
                    settings.allow_tabs,
                    settings.allow_popups,
                    settings.run_background,
                    settings.show_tray,
                    settings.enable_notif,
                    settings.user_agent,
                    settings.javascript,
                    settings.zoom_level,
                    settings.window_width,
                    settings.window_height,
                    settings.window_x,
                    settings.window_y,
                    settings.webapp_id,
                ],
            )
            .map_err(|e| WebletError::store(format!("Failed to update settings: {}", e)))?;

        if updated == 0 {
            return Err(WebletError::not_found(format!(
                "No settings for webapp {}",
                settings.webapp_id
            )));
        }

        Ok(())
    }

    /// Persist only the window geometry fields.
    pub fn update_window_state(
        &mut self,
        webapp_id: &str,
        width: i32,
        height: i32,
        x: Option<i32>,
        y: Option<i32>,
    ) -> WebletResult<()> {
        if width <= 0 || height <= 0 {
            return Err(WebletError::validation(
                "window dimensions must be positive",
            ));
        }

        self.conn
            .execute(
                "UPDATE webapp_settings SET window_width = ?1, window_height = ?2,
                        window_x = ?3, window_y = ?4
                 WHERE webapp_id = ?5",
                params![width, height, x, y, webapp_id],
            )
            .map_err(|e| WebletError::store(format!("Failed to update window state: {}", e)))?;
        Ok(())
    }

    /// Load global settings. Missing or unrecognized rows fall back to
    /// defaults so old databases keep working after upgrades.
    pub fn load_app_settings(&self) -> WebletResult<AppSettings> {
        let theme = self.get_app_setting("theme")?;
        let startup = self.get_app_setting("startup_behavior")?;
        let shared = self.get_app_setting("shared_network_process")?;
        let language = self.get_app_setting("language")?;

        Ok(AppSettings {
            theme: theme
                .as_deref()
                .and_then(Theme::from_key)
                .unwrap_or_default(),
            startup_behavior: startup
                .as_deref()
                .and_then(StartupBehavior::from_key)
                .unwrap_or_default(),
            shared_network_process: shared.as_deref() == Some("true"),
            language: language
                .as_deref()
                .and_then(Language::from_key)
                .unwrap_or_default(),
        })
    }

    pub fn save_app_settings(&mut self, settings: &AppSettings) -> WebletResult<()> {
        self.set_app_setting("theme", settings.theme.as_str())?;
        self.set_app_setting("startup_behavior", settings.startup_behavior.as_str())?;
        self.set_app_setting(
            "shared_network_process",
            if settings.shared_network_process { "true" } else { "false" },
        )?;
        self.set_app_setting("language", settings.language.as_str())?;
        Ok(())
    }

    fn get_app_setting(&self, key: &str) -> WebletResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| WebletError::store(format!("Failed to load setting {}: {}", key, e)))
    }

    fn set_app_setting(&mut self, key: &str, value: &str) -> WebletResult<()> {
        self.conn
            .execute(
                "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| WebletError::store(format!("Failed to save setting {}: {}", key, e)))?;
        Ok(())
    }

    fn query_webapps(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> WebletResult<Vec<WebApp>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| WebletError::store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params, row_to_webapp)
            .map_err(|e| WebletError::store(format!("Failed to query webapps: {}", e)))?;

        let mut webapps = Vec::new();
        for row in rows {
            webapps.push(
                row.map_err(|e| WebletError::store(format!("Failed to read webapp row: {}", e)))?,
            );
        }
        Ok(webapps)
    }
}

fn insert_settings(conn: &Connection, settings: &WebAppSettings) -> WebletResult<()> {
    conn.execute(
        "INSERT INTO webapp_settings (webapp_id, allow_tabs, allow_popups, run_background,
            show_tray, enable_notif, user_agent, javascript, zoom_level,
            window_width, window_height, window_x, window_y)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            settings.webapp_id,
            settings.allow_tabs,
            settings.allow_popups,
            settings.run_background,
            settings.show_tray,
            settings.enable_notif,
            settings.user_agent,
            settings.javascript,
            settings.zoom_level,
            settings.window_width,
            settings.window_height,
            settings.window_x,
            settings.window_y,
        ],
    )
    .map_err(|e| WebletError::store(format!("Failed to insert settings: {}", e)))?;
    Ok(())
}

fn row_to_webapp(row: &rusqlite::Row) -> rusqlite::Result<WebApp> {
    Ok(WebApp {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        icon_path: row.get(3)?,
        category: row.get(4)?,
        created_at: row.get(5)?,
        last_opened: row.get(6)?,
        open_count: row.get(7)?,
    })
}

fn row_to_settings(row: &rusqlite::Row) -> rusqlite::Result<WebAppSettings> {
    Ok(WebAppSettings {
        webapp_id: row.get(0)?,
        allow_tabs: row.get(1)?,
        allow_popups: row.get(2)?,
        run_background: row.get(3)?,
        show_tray: row.get(4)?,
        enable_notif: row.get(5)?,
        user_agent: row.get(6)?,
        javascript: row.get(7)?,
        zoom_level: row.get(8)?,
        window_width: row.get(9)?,
        window_height: row.get(10)?,
        window_x: row.get(11)?,
        window_y: row.get(12)?,
    })
}
