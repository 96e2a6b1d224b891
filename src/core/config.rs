//! Configuration management with layered hierarchy
//!
//! Values are resolved in priority order:
//! 1. Built-in defaults
//! 2. `config.yaml` in the application base directory (a `type: config` document)
//! 3. Environment variables (`SSHINV_DATA_DIR`, `SSHINV_SSH_PORT`, `SSHINV_SSH_TIMEOUT`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::entity::{decode_as, encode, Entity};
use crate::core::error::{Error, Result};
use crate::core::identity::DocumentType;

/// Name of the configuration document inside the base directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inventory data directory; empty means the base directory,
    /// relative paths are resolved against it
    pub data_dir: String,

    pub theme: String,

    pub language: String,

    /// Port used for hosts created without an explicit port
    pub default_ssh_port: u16,

    /// Connection timeout in seconds
    pub ssh_timeout: u64,

    /// Directory holding `config.yaml`
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            theme: "light".to_string(),
            language: "en".to_string(),
            default_ssh_port: 22,
            ssh_timeout: 30,
            base_dir: default_base_dir(),
        }
    }
}

impl Entity for Config {
    const TYPE: DocumentType = DocumentType::Config;

    fn key(&self) -> &str {
        "config"
    }

    fn name(&self) -> &str {
        "config"
    }

    fn description(&self) -> &str {
        ""
    }

    fn validate(&self) -> Result<()> {
        check_port(self.default_ssh_port)?;
        check_timeout(self.ssh_timeout)
    }
}

fn check_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::invalid(
            DocumentType::Config,
            "config",
            format!("invalid port: {}", port),
        ));
    }
    Ok(())
}

fn check_timeout(timeout: u64) -> Result<()> {
    if timeout == 0 {
        return Err(Error::invalid(
            DocumentType::Config,
            "config",
            format!("invalid timeout: {}", timeout),
        ));
    }
    Ok(())
}

impl Config {
    /// Load configuration from the default base directory
    pub fn load() -> Result<Self> {
        Self::load_from(&default_base_dir())
    }

    /// Load configuration from `base_dir/config.yaml`, creating it with
    /// defaults when missing, then apply environment overrides
    pub fn load_from(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            let (_, mut config) = decode_as::<Config>(&contents, &path)?;
            config.base_dir = base_dir.to_path_buf();
            config
        } else {
            let config = Config {
                base_dir: base_dir.to_path_buf(),
                ..Default::default()
            };
            config.save()?;
            tracing::info!("Created default configuration at {}", path.display());
            config
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("SSHINV_DATA_DIR") {
            self.data_dir = dir;
        }
        if let Ok(port) = std::env::var("SSHINV_SSH_PORT") {
            match port.parse() {
                Ok(port) => self.default_ssh_port = port,
                Err(_) => tracing::warn!("Ignoring invalid SSHINV_SSH_PORT: {}", port),
            }
        }
        if let Ok(timeout) = std::env::var("SSHINV_SSH_TIMEOUT") {
            match timeout.parse() {
                Ok(timeout) => self.ssh_timeout = timeout,
                Err(_) => tracing::warn!("Ignoring invalid SSHINV_SSH_TIMEOUT: {}", timeout),
            }
        }
    }

    /// Write the configuration to `config.yaml` in its base directory
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).map_err(|e| Error::io(&self.base_dir, e))?;
        let path = self.path();
        std::fs::write(&path, encode(self)?).map_err(|e| Error::io(&path, e))
    }

    /// Directory holding `config.yaml`
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the configuration file
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Resolved inventory data directory
    pub fn data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            return self.base_dir.clone();
        }
        let dir = PathBuf::from(&self.data_dir);
        if dir.is_absolute() {
            dir
        } else {
            self.base_dir.join(dir)
        }
    }

    pub fn set_data_dir(&mut self, dir: impl Into<String>) -> Result<()> {
        self.data_dir = dir.into();
        self.save()
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) -> Result<()> {
        self.theme = theme.into();
        self.save()
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> Result<()> {
        self.language = language.into();
        self.save()
    }

    pub fn set_default_ssh_port(&mut self, port: u16) -> Result<()> {
        check_port(port)?;
        self.default_ssh_port = port;
        self.save()
    }

    pub fn set_ssh_timeout(&mut self, timeout: u64) -> Result<()> {
        check_timeout(timeout)?;
        self.ssh_timeout = timeout;
        self.save()
    }

    /// Apply several edits and save once
    ///
    /// Nothing is changed if the closure or the validation fails.
    pub fn update<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ConfigEditor) -> Result<()>,
    {
        let mut editor = ConfigEditor { cfg: self.clone() };
        edit(&mut editor)?;
        editor.cfg.validate()?;
        editor.cfg.save()?;
        *self = editor.cfg;
        Ok(())
    }

    /// Set a field by its document key (as used by `sshinv config set`)
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |reason: String| Error::invalid(DocumentType::Config, "config", reason);
        match key {
            "data_dir" => self.set_data_dir(value),
            "theme" => self.set_theme(value),
            "language" => self.set_language(value),
            "default_ssh_port" => {
                let port = value
                    .parse()
                    .map_err(|_| invalid(format!("invalid port: {}", value)))?;
                self.set_default_ssh_port(port)
            }
            "ssh_timeout" => {
                let timeout = value
                    .parse()
                    .map_err(|_| invalid(format!("invalid timeout: {}", value)))?;
                self.set_ssh_timeout(timeout)
            }
            other => Err(invalid(format!("unknown config key '{}'", other))),
        }
    }
}

/// Write access to configuration fields inside [`Config::update`]
pub struct ConfigEditor {
    cfg: Config,
}

impl ConfigEditor {
    pub fn set_data_dir(&mut self, dir: impl Into<String>) {
        self.cfg.data_dir = dir.into();
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) {
        self.cfg.theme = theme.into();
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.cfg.language = language.into();
    }

    pub fn set_default_ssh_port(&mut self, port: u16) -> Result<()> {
        check_port(port)?;
        self.cfg.default_ssh_port = port;
        Ok(())
    }

    pub fn set_ssh_timeout(&mut self, timeout: u64) -> Result<()> {
        check_timeout(timeout)?;
        self.cfg.ssh_timeout = timeout;
        Ok(())
    }
}

/// Default application base directory
pub fn default_base_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "sshinv")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".sshinv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default_config() {
        let tmp = tempdir().unwrap();
        let config = Config::load_from(tmp.path()).unwrap();

        assert!(tmp.path().join(CONFIG_FILE).exists());
        assert_eq!(config.theme, "light");
        assert_eq!(config.default_ssh_port, 22);
        assert_eq!(config.ssh_timeout, 30);

        let contents = std::fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        assert!(contents.starts_with("type: config"));
    }

    #[test]
    fn test_load_reads_existing_config() {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            "type: config\ntheme: dark\nssh_timeout: 10\n",
        )
        .unwrap();

        let config = Config::load_from(tmp.path()).unwrap();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.ssh_timeout, 10);
        // missing keys fall back to defaults
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_load_rejects_other_document_type() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "type: host\nid: x\n").unwrap();
        let err = Config::load_from(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TagMismatch);
    }

    #[test]
    fn test_invalid_timeout_rejected_on_load() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "type: config\nssh_timeout: 0\n").unwrap();
        let err = Config::load_from(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_data_dir_resolution() {
        let tmp = tempdir().unwrap();
        let mut config = Config::load_from(tmp.path()).unwrap();
        config.data_dir = String::new();
        assert_eq!(config.data_dir(), tmp.path());

        config.data_dir = "inventory".to_string();
        assert_eq!(config.data_dir(), tmp.path().join("inventory"));

        let abs = tmp.path().join("elsewhere");
        config.data_dir = abs.to_string_lossy().to_string();
        assert_eq!(config.data_dir(), abs);
    }

    #[test]
    fn test_setters_validate_and_persist() {
        let tmp = tempdir().unwrap();
        let mut config = Config::load_from(tmp.path()).unwrap();

        assert!(config.set_default_ssh_port(0).is_err());
        assert!(config.set_ssh_timeout(0).is_err());
        config.set_default_ssh_port(2222).unwrap();
        config.set_theme("dark").unwrap();

        let reloaded = Config::load_from(tmp.path()).unwrap();
        assert_eq!(reloaded.default_ssh_port, 2222);
        assert_eq!(reloaded.theme, "dark");
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let tmp = tempdir().unwrap();
        let mut config = Config::load_from(tmp.path()).unwrap();

        let result = config.update(|e| {
            e.set_theme("dark");
            e.set_ssh_timeout(0)
        });
        assert!(result.is_err());
        assert_eq!(config.theme, "light");

        config
            .update(|e| {
                e.set_theme("dark");
                e.set_language("ko");
                e.set_ssh_timeout(5)
            })
            .unwrap();
        assert_eq!(config.theme, "dark");
        assert_eq!(Config::load_from(tmp.path()).unwrap().language, "ko");
    }

    #[test]
    fn test_set_field() {
        let tmp = tempdir().unwrap();
        let mut config = Config::load_from(tmp.path()).unwrap();
        config.set_field("default_ssh_port", "2022").unwrap();
        assert_eq!(config.default_ssh_port, 2022);
        assert!(config.set_field("default_ssh_port", "abc").is_err());
        assert!(config.set_field("color", "red").is_err());
    }
}
