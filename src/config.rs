use serde::Deserialize;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use anyhow::{Context, Result};
use std::fs;

use desktop_entry::{DesktopEntry, MimeType};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    pub mime: Option<MimeConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub name: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    pub icon: Option<PathBuf>,
    #[serde(rename = "type", default = "default_type")]
    pub entry_type: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_arch")]
    pub arch: String,
    pub apps_path: Option<PathBuf>,
    pub icons_path: Option<PathBuf>,
    #[serde(default = "default_perm")]
    pub perm: u32,
    #[serde(default = "default_oss")]
    pub oss: Vec<String>,
    #[serde(default = "default_true")]
    pub update_if_changed: bool,
    #[serde(default = "default_true")]
    pub rerun_if_changed: bool,
}

fn default_version() -> String { "0.0.0".to_string() }
fn default_type() -> String { "Application".to_string() }
fn default_arch() -> String { "x86_64".to_string() }
fn default_perm() -> u32 { desktop_entry::model::DEFAULT_PERM }
fn default_oss() -> Vec<String> { vec!["linux".to_string()] }
fn default_true() -> bool { true }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: None,
            version: default_version(),
            icon: None,
            entry_type: default_type(),
            categories: String::new(),
            comment: String::new(),
            arch: default_arch(),
            apps_path: None,
            icons_path: None,
            perm: default_perm(),
            oss: default_oss(),
            update_if_changed: true,
            rerun_if_changed: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct MimeConfig {
    #[serde(rename = "type")]
    pub mime_type: String,
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub generic_icon: String,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl From<MimeConfig> for MimeType {
    fn from(mime: MimeConfig) -> Self {
        MimeType {
            mime_type: mime.mime_type,
            path: mime.path,
            comment: mime.comment,
            generic_icon: mime.generic_icon,
            patterns: mime.patterns,
        }
    }
}

impl Config {
    /// Builds the entry. `name` must be set by now, the icon file is read if given.
    pub fn into_entry(self) -> Result<DesktopEntry> {
        let app = self.app;
        let name = app.name.context("application name is required (--name or [app].name)")?;
        let icon = match &app.icon {
            Some(path) => {
                fs::read(path).with_context(|| format!("reading icon {}", path.display()))?
            }
            None => Vec::new(),
        };

        let mut entry = DesktopEntry::new(name, app.version, icon);
        entry.entry_type = app.entry_type;
        entry.categories = app.categories;
        entry.comment = app.comment;
        entry.arch = app.arch;
        entry.perm = app.perm;
        entry.oss = app.oss;
        entry.update_if_changed = app.update_if_changed;
        entry.rerun_if_changed = app.rerun_if_changed;
        if let Some(path) = app.apps_path {
            entry.apps_path = path;
        }
        if let Some(path) = app.icons_path {
            entry.icons_path = path;
        }
        entry.mime_type = self.mime.map(MimeType::from);
        Ok(entry)
    }
}

pub fn default_config_path() -> PathBuf {
    let proj_dirs = ProjectDirs::from("org", "desktop-entry", "desktop-entry");
    if let Some(dirs) = &proj_dirs {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("config.toml")
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

    if !config_path.exists() {
        if path.is_some() {
            anyhow::bail!("config file {} does not exist", config_path.display());
        }
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("parsing {}", config_path.display()))?;
    Ok(config)
}
