use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::ProjectionFields;

const APP_DIR: &str = "Cypher-Lens";

/// Server and client settings persisted as `settings.json` in the per-user
/// config directory. Database credentials are not stored here; see
/// [`crate::db::neo4j::DbSettings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "AppSettings::default_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "AppSettings::default_port")]
    pub api_port: u16,
    // If None, server traffic logs go to OS temp dir
    #[serde(default)]
    pub api_log_override: Option<PathBuf>,
    #[serde(default = "AppSettings::default_api_log_enabled")]
    pub api_log_enabled: bool,
    // Column aliases the graph view reads (n, r, m)
    #[serde(default)]
    pub projection: ProjectionFields,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_bind_addr: Self::default_bind_addr(),
            api_port: Self::default_port(),
            api_log_override: None,
            api_log_enabled: Self::default_api_log_enabled(),
            projection: ProjectionFields::default(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Cypher-Lens
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join(APP_DIR);
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Cypher-Lens
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join(APP_DIR);
            }
            return PathBuf::from(APP_DIR);
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Cypher-Lens or ~/.config/Cypher-Lens
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join(APP_DIR);
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join(APP_DIR);
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Self::from_json(&s)
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Return the directory where the settings file (settings.json) is stored.
    /// This is OS-specific and resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    pub(crate) fn default_bind_addr() -> String { "127.0.0.1".to_string() }
    pub(crate) fn default_port() -> u16 { 8787 }
    pub(crate) fn default_api_log_enabled() -> bool { true }

    pub fn api_endpoint(&self) -> String {
        format!("{}:{}", self.api_bind_addr, self.api_port)
    }

    /// Default API log directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Cypher-Lens/api-logs
    pub fn api_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(APP_DIR);
        p.push("api-logs");
        p
    }

    /// Effective API log directory, or None when traffic logging is switched off.
    pub fn api_log_dir(&self) -> Option<PathBuf> {
        if !self.api_log_enabled { return None; }
        Some(self.api_log_override.clone().unwrap_or_else(Self::api_log_default_dir))
    }
}
