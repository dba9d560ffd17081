// Configuration loading and parsing (config/goaldraft.toml).

use goaldraft_core::draft::state::DraftSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "goaldraft.toml";

/// Files shipped in `defaults/` and copied into `config/` on first run.
const SHIPPED_FILES: [&str; 3] = [CONFIG_FILE, "leagues.toml", "slot_titles.csv"];

/// Longest pick clock accepted: one year.
pub const MAX_PICK_TIME_SECS: u64 = 365 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub draft: DraftConfig,
    pub autopick: AutopickConfig,
    pub ws_port: u16,
    /// Empty means the per-user default location.
    pub db_path: String,
    pub seed: SeedPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    pub pick_time_secs: u64,
}

impl DraftConfig {
    pub fn settings(&self) -> DraftSettings {
        DraftSettings {
            pick_time: chrono::Duration::seconds(self.pick_time_secs as i64),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutopickConfig {
    pub enabled: bool,
    pub sweep_interval_secs: u64,
}

impl AutopickConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPaths {
    pub leagues: String,
    /// Optional CSV of slot titles.
    #[serde(default)]
    pub titles: Option<String>,
}

// ---------------------------------------------------------------------------
// goaldraft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the whole file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    draft: DraftConfig,
    autopick: AutopickConfig,
    server: ServerSection,
    #[serde(default)]
    database: DatabaseSection,
    seed: SeedPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    ws_port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/goaldraft.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    let file: ConfigFile = toml::from_str(text)?;
    Ok(Config {
        draft: file.draft,
        autopick: file.autopick,
        ws_port: file.server.ws_port,
        db_path: file.database.path,
        seed: file.seed,
    })
}

/// Copy any shipped file missing from `config/` out of `defaults/`.
/// Returns the files that were copied. Existing files are left alone.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(vec![]);
        }
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither defaults/ nor config/ directory found in {}",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for name in SHIPPED_FILES {
        let source = defaults_dir.join(name);
        let target = config_dir.join(name);
        if target.exists() || !source.is_file() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {}: {e}", source.display()),
        })?;
        copied.push(target);
    }
    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draft.pick_time_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.pick_time_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.draft.pick_time_secs > MAX_PICK_TIME_SECS {
        return Err(ConfigError::ValidationError {
            field: "draft.pick_time_secs".into(),
            message: format!("must be at most {MAX_PICK_TIME_SECS} (one year)"),
        });
    }

    if config.autopick.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "autopick.sweep_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.seed.leagues.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "seed.leagues".into(),
            message: "must name a leagues file".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
