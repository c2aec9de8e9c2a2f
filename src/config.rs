use std::env;
use std::path::PathBuf;

/// Database file used when `OXIGIT_STORE_DB` is not set.
pub const DEFAULT_DATABASE: &str = "oxigit-store.sqlite3";

/// Git executable used when `OXIGIT_STORE_GIT` is not set.
pub const DEFAULT_GIT: &str = "git";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: PathBuf,
    pub git: PathBuf,
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var_os(key)
        .filter(|var| !var.is_empty())
        .map(|var| var.to_string_lossy().to_string())
        .unwrap_or_else(|| default.to_owned())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database: env_or_default("OXIGIT_STORE_DB", DEFAULT_DATABASE).into(),
            git: env_or_default("OXIGIT_STORE_GIT", DEFAULT_GIT).into(),
        }
    }

    /// Applies command line overrides on top of the environment.
    pub fn with_overrides(mut self, database: Option<PathBuf>, git: Option<PathBuf>) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(git) = git {
            self.git = git;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.into(),
            git: DEFAULT_GIT.into(),
        }
    }
}
