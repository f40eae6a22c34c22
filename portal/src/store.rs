use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::debug;
use rusqlite::{Connection, params};

use crate::{
    config::{DEFAULT_BUSY_TIMEOUT_MS, PortalConfig},
    errors::PortalError,
    sql::Identifier,
};

/// Base schema. Dynamic columns are added later with `ALTER TABLE`.
const BASE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS departments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL UNIQUE COLLATE NOCASE,
        role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user', 'faculty')),
        department_id INTEGER NULL REFERENCES departments(id)
            ON UPDATE CASCADE ON DELETE SET NULL,
        scholar_link TEXT NULL
    );
    CREATE TABLE IF NOT EXISTS publications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id)
            ON UPDATE CASCADE ON DELETE CASCADE,
        title TEXT NOT NULL,
        authors TEXT,
        year VARCHAR(16),
        citations VARCHAR(16)
    );
    CREATE TABLE IF NOT EXISTS patents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id)
            ON UPDATE CASCADE ON DELETE CASCADE,
        title VARCHAR(255) NOT NULL CHECK (length(title) <= 255),
        inventors TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS commercializations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id)
            ON UPDATE CASCADE ON DELETE CASCADE,
        project_name VARCHAR(255) NOT NULL CHECK (length(project_name) <= 255),
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS dynamic_fields (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_name VARCHAR(128) NOT NULL,
        field_name VARCHAR(128) NOT NULL COLLATE NOCASE,
        field_label VARCHAR(255) NOT NULL,
        field_type VARCHAR(64) NOT NULL,
        is_required TINYINT(1) NOT NULL DEFAULT 0,
        options TEXT,
        UNIQUE (table_name, field_name)
    );
";

/// Connection settings for the portal database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn from_portal_config(config: &PortalConfig) -> Result<Self, PortalError> {
        config.validate()?;
        Ok(Self {
            path: config.database_path()?,
            busy_timeout_ms: config.database.busy_timeout_ms,
        })
    }
}

/// Hands out one connection per operation.
///
/// Callers hold the returned [`Connection`] for the duration of a single operation;
/// dropping it releases the handle on every exit path.
#[derive(Debug, Clone)]
pub struct Database {
    config: DatabaseConfig,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Result<Self, PortalError> {
        if config.busy_timeout_ms == 0 {
            return Err(PortalError::Config {
                message: "busy_timeout_ms must be greater than zero".to_string(),
            });
        }
        ensure_parent_dir(&config.path)?;
        Ok(Self { config })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Opens a fresh connection with foreign keys enforced.
    pub fn connect(&self) -> Result<Connection, PortalError> {
        let conn = Connection::open(&self.config.path)?;
        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Creates the base tables if they are missing.
    pub fn bootstrap(&self) -> Result<(), PortalError> {
        let conn = self.connect()?;
        ensure_base_tables(&conn)?;
        debug!("base schema ensured at {}", self.config.path.display());
        Ok(())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), PortalError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| PortalError::Config {
            message: format!("failed to create {}: {err}", parent.display()),
        })?;
    }
    Ok(())
}

pub fn ensure_base_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(BASE_SCHEMA)
}

/// Physical column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &Identifier) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let names = stmt.query_map(params![table.as_str()], |row| row.get::<_, String>(0))?;
    names.collect()
}

/// Case-insensitive membership, matching how SQLite resolves column names.
pub fn has_column(columns: &[String], name: &str) -> bool {
    columns.iter().any(|column| column.eq_ignore_ascii_case(name))
}
