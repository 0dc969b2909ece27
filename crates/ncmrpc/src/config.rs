//! TOML configuration.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::presence::DEFAULT_CLIENT_ID;
use crate::process::{TARGET_EXECUTABLE, TARGET_MODULE};
use crate::signature::{SignatureSet, builtin_signatures, load_signatures};
use crate::status::{DEFAULT_IDLE_TIMEOUT, DEFAULT_TOLERANCE_SECS};

/// `<config dir>/ncmrpc/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ncmrpc").join("config.toml"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub sync: SyncConfig,
    pub presence: PresenceConfig,
    pub metadata: MetadataConfig,
    pub signatures: SignaturesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub executable: String,
    pub module: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            executable: TARGET_EXECUTABLE.to_string(),
            module: TARGET_MODULE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: f64,
    pub tolerance_secs: f64,
    pub idle_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub client_id: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Overrides `%LOCALAPPDATA%\Netease\CloudMusic\webdata\file`
    pub webdata_dir: Option<PathBuf>,
    pub history: bool,
    pub queue: bool,
    pub remote: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            webdata_dir: None,
            history: true,
            queue: true,
            remote: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturesConfig {
    /// JSON signature file replacing the builtin set
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file not found, using defaults: {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sync.interval_secs.is_finite() && self.sync.interval_secs >= 0.05) {
            return Err(Error::Config(format!(
                "sync.interval_secs must be at least 0.05, got {}",
                self.sync.interval_secs
            )));
        }
        if !(self.sync.tolerance_secs.is_finite() && self.sync.tolerance_secs > 0.0) {
            return Err(Error::Config(format!(
                "sync.tolerance_secs must be positive, got {}",
                self.sync.tolerance_secs
            )));
        }
        if self.presence.client_id.is_empty() {
            return Err(Error::Config("presence.client_id is empty".to_string()));
        }
        Ok(())
    }

    /// Signature set from the configured file, or the builtin set.
    pub fn signature_set(&self) -> Result<SignatureSet> {
        match &self.signatures.path {
            Some(path) => {
                let set = load_signatures(path)?;
                info!("Loaded signatures from {}", path.display());
                Ok(set)
            }
            None => Ok(builtin_signatures()),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sync.interval(), Duration::from_secs(1));
        assert_eq!(config.sync.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(config.presence.client_id, "1045242932128645180");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[sync]\ntolerance_secs = 0.3\n\n[metadata]\nremote = false\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sync.tolerance_secs, 0.3);
        assert_eq!(config.sync.interval_secs, 1.0);
        assert!(!config.metadata.remote);
        assert!(config.metadata.history);
        assert_eq!(config.target.executable, "cloudmusic.exe");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[sync]\ninterval_secs = 0.0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));

        fs::write(&path, "[sync\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }

    #[test]
    fn test_signature_set_default_and_file() {
        let config = Config::default();
        assert!(config.signature_set().unwrap().validate().is_ok());

        let dir = tempdir().unwrap();
        let path = dir.path().join("signatures.json");
        crate::signature::save_signatures(&path, &builtin_signatures()).unwrap();
        let config = Config {
            signatures: SignaturesConfig { path: Some(path) },
            ..Config::default()
        };
        assert_eq!(
            config.signature_set().unwrap().entries.len(),
            builtin_signatures().entries.len()
        );
    }
}
