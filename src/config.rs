//! rapi configuration (`config.toml`)
//!
//! Every field has a default, so a missing file or section is fine.
//!
//! ```toml
//! [apt_key]
//! command = "apt-key"
//! gpg = "/usr/bin/gpg"
//! delete_attempts = 5
//! keyserver = "keyserver.ubuntu.com"
//!
//! [iis]
//! powershell = "powershell.exe"
//! scripts_dir = "~/iis-proxy"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RapiConfig {
    pub apt_key: AptKeyConfig,
    pub iis: IisConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AptKeyConfig {
    /// `apt-key` executable
    pub command: String,
    /// `gpg` executable used to verify key files
    pub gpg: String,
    /// How often `apt-key del` is retried while the key is still listed
    pub delete_attempts: u32,
    /// Default key server for `server`
    pub keyserver: String,
}

impl Default for AptKeyConfig {
    fn default() -> Self {
        Self {
            command: "apt-key".to_string(),
            gpg: "/usr/bin/gpg".to_string(),
            delete_attempts: 5,
            keyserver: "keyserver.ubuntu.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IisConfig {
    pub powershell: String,
    /// Directory holding the fetch/enforce scripts, defaults to `<config dir>/iis`
    pub scripts_dir: Option<String>,
}

impl Default for IisConfig {
    fn default() -> Self {
        Self {
            powershell: "powershell.exe".to_string(),
            scripts_dir: None,
        }
    }
}

impl IisConfig {
    /// Resolved scripts directory with `~` and variables expanded
    pub fn scripts_dir(&self) -> Result<PathBuf> {
        match &self.scripts_dir {
            Some(dir) => Ok(paths::expand(dir)),
            None => Ok(paths::config_dir()?.join("iis")),
        }
    }
}

impl RapiConfig {
    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        let path = paths::config_file()?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
