//! User configuration handling
//!
//! Loads the optional `esbn.config.json` / `etsc.config.json` override file.
//! A broken file never stops a build: it is reported and the build falls back
//! to defaults.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, warn};

pub use schema::*;

/// Config file tried first when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "esbn.config.json";

/// Config file tried when the primary one yields nothing
pub const FALLBACK_CONFIG_FILE: &str = "etsc.config.json";

/// Script configs older setups used, paired with their data-file replacement
const LEGACY_SCRIPT_CONFIGS: &[(&str, &str)] = &[
    ("esbn.config.js", DEFAULT_CONFIG_FILE),
    ("etsc.config.js", FALLBACK_CONFIG_FILE),
];

/// Errors raised while reading a user config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {message}", path.display())]
    Json { path: PathBuf, message: String },

    #[error("invalid TOML in {}: {message}", path.display())]
    Toml { path: PathBuf, message: String },

    #[error("unsupported config format '{extension}' for {}; use .json, .json5 or .toml", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
}

impl UserConfig {
    /// Parse a config file, choosing the format from its extension
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match extension.as_str() {
            "json" | "json5" => json5::from_str(&content).map_err(|e| ConfigError::Json {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::Toml {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Locate and load the user config for a build
    ///
    /// Tries `cli_config` (or [`DEFAULT_CONFIG_FILE`]) and then
    /// [`FALLBACK_CONFIG_FILE`], both relative to `cwd`. Falls back to an
    /// empty config when neither yields one.
    pub fn discover(cwd: &Path, cli_config: Option<&Path>) -> Self {
        for (script, replacement) in legacy_script_configs(cwd) {
            warn!(
                "Ignoring {}: script configs are not loaded, move its settings to {}",
                script.display(),
                replacement
            );
        }

        let primary = cli_config.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        load_user_config(&cwd.join(primary))
            .or_else(|| load_user_config(&cwd.join(FALLBACK_CONFIG_FILE)))
            .unwrap_or_default()
    }
}

/// Script config files present in `cwd`, with the file that replaces each
fn legacy_script_configs(cwd: &Path) -> Vec<(PathBuf, &'static str)> {
    LEGACY_SCRIPT_CONFIGS
        .iter()
        .map(|(script, replacement)| (cwd.join(script), *replacement))
        .filter(|(path, _)| path.is_file())
        .collect()
}

/// Load a user config file if it exists
///
/// Returns `None` both when the file is absent and when it fails to load;
/// load failures are logged.
pub fn load_user_config(path: &Path) -> Option<UserConfig> {
    if !path.exists() {
        debug!("No config file at {}", path.display());
        return None;
    }

    match UserConfig::from_file(path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(err) => {
            error!("Config file has some errors:");
            error!("{:?}", anyhow::Error::new(err));
            None
        }
    }
}
