//! Configuration loading and validation.
//!
//! Sources are layered, later ones overriding earlier ones:
//! 1. built-in defaults ([`Config::default()`]),
//! 2. a TOML file (explicit path, or `config.toml` in the platform config
//!    directory when it exists),
//! 3. `LDSS_`-prefixed environment variables (e.g. `LDSS_CONNECTION_LIMIT=4`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ldss_cache::DEFAULT_CONNECTION_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const ENV_PREFIX: &str = "LDSS_";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_SEARCH_BUFFER: usize = 64;

/// A language the library knows how to open a catalog for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Numeric id, used in on-disk paths.
    pub id: u32,
    /// Short code used on the command line and in catalog file names (e.g. `eng`).
    pub code: String,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for catalogs and downloaded book databases.
    pub data_dir: PathBuf,
    /// Maximum number of books with an open database connection at once.
    pub connection_limit: usize,
    /// Code of the language used when none is given.
    pub default_language: String,
    pub languages: Vec<LanguageConfig>,
    /// Capacity of the search result channel.
    pub search_buffer: usize,
    /// Local directory to "download" missing books from. Without one, books
    /// that aren't already present can't be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from(".ldss"));
        Self {
            data_dir,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            default_language: "eng".to_string(),
            languages: vec![LanguageConfig {
                id: 1,
                code: "eng".to_string(),
                name: "English".to_string(),
            }],
            search_buffer: DEFAULT_SEARCH_BUFFER,
            mirror: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources and validate it.
    ///
    /// When `path` is `None`, the platform config directory is checked for a
    /// `config.toml`; a missing file there is not an error.
    #[instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Invalid(format!("config file not found: {}", path.display())));
                }
                figment = figment.merge(Toml::file(path));
            },
            None => {
                if let Some(dirs) = project_dirs() {
                    let default = dirs.config_dir().join(CONFIG_FILE);
                    debug!(path = %default.display(), "Looking for default config file");
                    figment = figment.merge(Toml::file(default));
                }
            },
        }
        let config: Config = figment.merge(Env::prefixed(ENV_PREFIX)).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but make no sense together.
    pub fn validate(&self) -> Result<()> {
        if self.connection_limit == 0 {
            exn::bail!(ErrorKind::Invalid("connection_limit must be at least 1".to_string()));
        }
        if self.search_buffer == 0 {
            exn::bail!(ErrorKind::Invalid("search_buffer must be at least 1".to_string()));
        }
        if self.language(&self.default_language).is_none() {
            exn::bail!(ErrorKind::Invalid(format!("default language `{}` is not configured", self.default_language)));
        }
        Ok(())
    }

    pub fn language(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "ldss", "ldss")
}
