use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::args::CliArgs;
use crate::dirs;

const CONFIG_DIR_NAME: &str = "jevons";
const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PORT: u16 = 8765;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub port: u16,
    pub sync_interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            sync_interval_secs: jevons_app::DEFAULT_SYNC_INTERVAL_SECS,
            data_dir: None,
            source_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: CliConfig,
    pub file: PathBuf,
    pub created: bool,
}

/// Effective settings after applying flag > env > file > default.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub source_dir: PathBuf,
    pub sync_interval_secs: u64,
    pub port: u16,
}

pub fn load_or_create() -> Result<ConfigLoad> {
    let dir = config_dir()?;
    load_or_create_in(&dir)
}

fn load_or_create_in(dir: &Path) -> Result<ConfigLoad> {
    let file = dir.join(CONFIG_FILE_NAME);
    if file.exists() {
        let contents = fs::read_to_string(&file)
            .with_context(|| format!("read config {}", file.display()))?;
        let config: CliConfig = toml::from_str(&contents)
            .with_context(|| format!("parse config {}", file.display()))?;
        return Ok(ConfigLoad {
            config,
            file,
            created: false,
        });
    }

    fs::create_dir_all(dir).with_context(|| format!("create config dir {}", dir.display()))?;
    let config = CliConfig::default();
    let contents = toml::to_string_pretty(&config).context("serialize config")?;
    fs::write(&file, contents).with_context(|| format!("write config {}", file.display()))?;
    Ok(ConfigLoad {
        config,
        file,
        created: true,
    })
}

fn config_dir() -> Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(xdg).join(CONFIG_DIR_NAME));
    }
    let home = dirs::home_dir().context("resolve HOME")?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Resolves settings from parsed args (which already include the `JEVONS_*`
/// variables), the legacy `CLAUDE_USAGE_*` variables and the config file.
pub fn resolve(
    args: &CliArgs,
    port_flag: Option<u16>,
    file: &CliConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let pick_dir = |flag: &Option<PathBuf>, legacy_var: &str, from_file: &Option<String>| {
        flag.clone()
            .or_else(|| env(legacy_var).filter(|v| !v.is_empty()).map(PathBuf::from))
            .or_else(|| from_file.as_deref().map(app_api::expand_home_path))
    };
    Settings {
        data_dir: pick_dir(&args.data_dir, "CLAUDE_USAGE_DATA_DIR", &file.data_dir)
            .unwrap_or_else(dirs::default_data_dir),
        source_dir: pick_dir(&args.source_dir, "CLAUDE_USAGE_SOURCE_DIR", &file.source_dir)
            .unwrap_or_else(ingest::default_source_dir),
        sync_interval_secs: args.interval.unwrap_or(file.sync_interval_secs),
        port: port_flag.unwrap_or(file.port),
    }
}
