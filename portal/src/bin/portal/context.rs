use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use portal::{ActingUser, DatabaseConfig, Portal, PortalConfig};

/// Environment variable holding the database path when no config file exists
pub const DATABASE_ENV: &str = "PORTAL_DB";

/// Location of the `.portal` directory and its loaded configuration
pub struct ProjectContext {
    /// Directory containing `.portal/`, or the working directory if none was found
    pub project_root: PathBuf,
    /// Path to .portal directory
    pub portal_dir: PathBuf,
    /// Path to config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: Option<PortalConfig>,
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    /// Find project context starting from the given directory
    pub fn find_from(start: &Path) -> Result<Self> {
        let project_root = Self::find_project_root(start).unwrap_or_else(|| start.to_path_buf());
        Self::from_root(project_root)
    }

    /// Create context from a known project root
    pub fn from_root(project_root: PathBuf) -> Result<Self> {
        let portal_dir = project_root.join(".portal");
        let config_path = portal_dir.join("config.toml");

        let config = if config_path.exists() {
            Some(PortalConfig::load(&config_path).with_context(|| format!("Failed to load {}", config_path.display()))?)
        } else {
            None
        };

        Ok(Self {
            project_root,
            portal_dir,
            config_path,
            config,
        })
    }

    /// Nearest ancestor holding `.portal/config.toml`
    fn find_project_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(".portal").join("config.toml").exists())
            .map(Path::to_path_buf)
    }

    pub fn is_initialized(&self) -> bool {
        self.portal_dir.exists() && self.config_path.exists()
    }

    /// Database settings from the config file, or from `PORTAL_DB`
    pub fn database_config(&self) -> Result<DatabaseConfig> {
        let config = self.config.clone().unwrap_or_default();
        let mut database = DatabaseConfig::from_portal_config(&config).with_context(|| {
            format!("No database configured. Run 'portal init' or set {DATABASE_ENV}.")
        })?;
        if database.path.is_relative() {
            database.path = self.project_root.join(&database.path);
        }
        Ok(database)
    }

    pub fn open_portal(&self) -> Result<Portal> {
        let database = self.database_config()?;
        Portal::open(database.clone())
            .with_context(|| format!("Failed to open database at {}", database.path.display()))
    }

    /// Directory reports are written to, relative to the project root
    pub fn report_dir(&self) -> PathBuf {
        let dir = self
            .config
            .as_ref()
            .map(|config| config.portal.report_dir.clone())
            .unwrap_or_else(|| PortalConfig::default().portal.report_dir);
        self.project_root.join(dir)
    }
}

/// Resolves `--as` into an acting user, loading the role from storage
pub fn acting_user(portal: &Portal, acting_as: Option<i64>) -> Result<ActingUser> {
    let user_id = acting_as.context("This command needs a caller. Pass --as <user id> or set PORTAL_USER.")?;
    portal
        .acting_user(user_id)
        .with_context(|| format!("Unknown user {user_id}"))
}
