use anyhow::{Context, Result};
use directories::BaseDirs;
use log::warn;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the per-user directory holding config, clip history and log.
pub const CONFIG_DIR_ENV: &str = "PAL_CONFIG_DIR";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Scanned after the platform's own application directories.
    #[serde(default)]
    pub extra_dirs: Vec<PathBuf>,
    /// Regexes matched against record names and ids.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Skip desktop entries marked `NoDisplay`/`Hidden` and read only their main group.
    #[serde(default)]
    pub respect_no_display: bool,
}

impl CatalogConfig {
    pub fn exclusions(&self) -> Vec<Regex> {
        self.exclude
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid exclude pattern {:?}: {}", pattern, e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ClipboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_true() -> bool { true }
fn default_poll_interval_ms() -> u64 { 500 }
fn default_preview_chars() -> usize { 10 }

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
            preview_chars: default_preview_chars(),
        }
    }
}

impl ClipboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// `%APPDATA%\pal` on Windows, `~/.config/pal` everywhere else.
fn resolve_config_dir(override_dir: Option<OsString>) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    match BaseDirs::new() {
        Some(base) if cfg!(windows) => base.config_dir().join("pal"),
        Some(base) => base.home_dir().join(".config").join("pal"),
        None => PathBuf::from(".pal"),
    }
}

/// The per-user directory, created owner-only if missing.
pub fn config_dir() -> Result<PathBuf> {
    let dir = resolve_config_dir(env::var_os(CONFIG_DIR_ENV));
    create_private_dir(&dir)?;
    Ok(dir)
}

pub fn create_private_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
        .create(dir)
        .with_context(|| format!("cannot create directory {:?}", dir))
}

/// Missing file means defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config: Config = toml::from_str(&content).with_context(|| format!("parsing {:?}", path))?;
    Ok(config)
}
