use chrono::Utc;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::{Path, PathBuf};

/// The LutLibrary manages the SQLite catalog database.
/// It remembers which LUT folders the user added, which LUTs are favorites,
/// and which LUT was last applied to each image (for exporting later on).
pub struct LutLibrary {
    conn: Connection,
    db_path: PathBuf,
}

impl LutLibrary {
    /// Open (or create) the catalog in the user's data directory:
    /// - Linux: ~/.local/share/lut-panel/lut_panel.db
    /// - macOS: ~/Library/Application Support/lut-panel/lut_panel.db
    /// - Windows: %APPDATA%\lut-panel\lut_panel.db
    pub fn new() -> SqlResult<Self> {
        let db_path = Self::get_db_path();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("⚠️  Could not create {}: {}", parent.display(), e);
            }
        }

        let conn = Connection::open(&db_path)?;
        info!("📁 LUT catalog at: {}", db_path.display());

        Self::with_connection(conn, db_path)
    }

    /// Catalog that lives only as long as the value (for tests)
    pub fn open_in_memory() -> SqlResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, db_path: PathBuf) -> SqlResult<Self> {
        let library = LutLibrary { conn, db_path };
        library.init_schema()?;
        Ok(library)
    }

    fn get_db_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push("lut-panel");
        path.push("lut_panel.db");
        path
    }

    /// Creates all tables and indexes if they don't exist
    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS lut_folders (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                path            TEXT NOT NULL UNIQUE,
                added_at        INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS favorites (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                lut_path        TEXT NOT NULL UNIQUE,
                added_at        INTEGER NOT NULL
            )",
            [],
        )?;

        // One row per image; re-applying replaces the LUT
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS applied_luts (
                image_path      TEXT PRIMARY KEY,
                lut_path        TEXT NOT NULL,
                applied_at      INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Remember a LUT folder; returns false if it was already known
    pub fn add_folder(&self, path: &str) -> SqlResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO lut_folders (path, added_at) VALUES (?1, ?2)",
            params![path, Utc::now().timestamp()],
        )?;
        Ok(inserted > 0)
    }

    pub fn remove_folder(&self, path: &str) -> SqlResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM lut_folders WHERE path = ?1", params![path])?;
        Ok(removed > 0)
    }

    /// All remembered folders, oldest first
    pub fn folders(&self) -> SqlResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM lut_folders ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    /// Flip a LUT's favorite flag; returns the new state
    pub fn toggle_favorite(&self, lut_path: &str) -> SqlResult<bool> {
        if self.is_favorite(lut_path)? {
            self.conn
                .execute("DELETE FROM favorites WHERE lut_path = ?1", params![lut_path])?;
            Ok(false)
        } else {
            self.conn.execute(
                "INSERT INTO favorites (lut_path, added_at) VALUES (?1, ?2)",
                params![lut_path, Utc::now().timestamp()],
            )?;
            Ok(true)
        }
    }

    pub fn is_favorite(&self, lut_path: &str) -> SqlResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM favorites WHERE lut_path = ?1",
                params![lut_path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn favorites(&self) -> SqlResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT lut_path FROM favorites ORDER BY lut_path")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect()
    }

    /// Record `lut_path` as the LUT applied to `image_path`
    pub fn save_applied_lut(&self, image_path: &str, lut_path: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO applied_luts (image_path, lut_path, applied_at) VALUES (?1, ?2, ?3)",
            params![image_path, lut_path, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// LUT last applied to `image_path`, if it was not removed since
    pub fn applied_lut(&self, image_path: &str) -> SqlResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT lut_path FROM applied_luts WHERE image_path = ?1",
                params![image_path],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn clear_applied_lut(&self, image_path: &str) -> SqlResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM applied_luts WHERE image_path = ?1", params![image_path])?;
        Ok(removed > 0)
    }

    /// Forget folders that no longer exist on disk
    pub fn verify_folders(&self) -> SqlResult<usize> {
        let mut removed_count = 0;
        for folder in self.folders()? {
            if !Path::new(&folder).is_dir() {
                self.remove_folder(&folder)?;
                removed_count += 1;
            }
        }

        if removed_count > 0 {
            warn!("⚠️  Removed {} missing LUT folders from the catalog", removed_count);
        }

        Ok(removed_count)
    }
}

impl std::fmt::Debug for LutLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LutLibrary")
            .field("db_path", &self.db_path)
            .finish()
    }
}
