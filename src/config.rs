use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const STATE_DIR_VAR: &str = "GH_INVOICER_DIR";
const APP_DIR_NAME: &str = "gh-invoicer";
const TOKEN_FILE: &str = "token";
const SETTINGS_FILE: &str = "settings.json";
const APP_INSTALLED_FILE: &str = "app_installed";

pub const APP_INSTALL_URL: &str = "https://github.com/apps/invoice-writer/installations/new";

/// Contractor and client settings, persisted as a single JSON blob.
///
/// Every field carries a default so blobs written by older versions load
/// cleanly; unknown keys are ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub contractor_company: String,
    pub contractor_id: String,
    pub hourly_rate: f64,
    pub currency: String,
    pub bank_info: String,
    pub payment_method: String,
    pub last_client: String,
    pub orgs: Vec<String>,
    pub project_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            contractor_company: String::new(),
            contractor_id: String::new(),
            hourly_rate: 0.0,
            currency: "USD".to_string(),
            bank_info: String::new(),
            payment_method: "Wire Transfer".to_string(),
            last_client: "Studio Vibi INC".to_string(),
            orgs: vec!["StudioVibi".to_string(), "HigherOrderCO".to_string()],
            project_name: "Work".to_string(),
        }
    }
}

/// Filesystem locations for the token, settings blob and install flag.
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    pub fn new() -> Result<Self> {
        let root = match env::var(STATE_DIR_VAR) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::config_dir()
                .context("could not determine a config directory for this platform")?
                .join(APP_DIR_NAME),
        };
        Ok(Self { root })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("unable to create state dir {}", self.root.display()))
    }
}

pub fn load_settings(paths: &StatePaths) -> Result<Settings> {
    let path = paths.file(SETTINGS_FILE);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("unable to read settings from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("settings file {} is not valid JSON", path.display()))
}

pub fn save_settings(paths: &StatePaths, settings: &Settings) -> Result<()> {
    paths.ensure_root()?;
    let path = paths.file(SETTINGS_FILE);
    let raw = serde_json::to_string_pretty(settings)?;
    fs::write(&path, raw)
        .with_context(|| format!("unable to write settings to {}", path.display()))
}

pub fn load_token(paths: &StatePaths) -> Result<Option<String>> {
    let path = paths.file(TOKEN_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("unable to read token from {}", path.display()))?;
    let token = raw.trim().to_string();
    Ok(if token.is_empty() { None } else { Some(token) })
}

pub fn save_token(paths: &StatePaths, token: &str) -> Result<()> {
    paths.ensure_root()?;
    let path = paths.file(TOKEN_FILE);
    fs::write(&path, token).with_context(|| format!("unable to write token to {}", path.display()))
}

pub fn clear_token(paths: &StatePaths) -> Result<()> {
    let path = paths.file(TOKEN_FILE);
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("unable to remove token at {}", path.display()))?;
    }
    Ok(())
}

pub fn app_install_confirmed(paths: &StatePaths) -> bool {
    paths.file(APP_INSTALLED_FILE).exists()
}

pub fn confirm_app_install(paths: &StatePaths) -> Result<()> {
    paths.ensure_root()?;
    let path = paths.file(APP_INSTALLED_FILE);
    fs::write(&path, "true")
        .with_context(|| format!("unable to write install flag to {}", path.display()))
}
