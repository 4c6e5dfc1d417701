//! Launcher path configuration.
//!
//! Tells the config layer where the user-writable JSON files live and where
//! the bundled read-only defaults can be found. Loaded from TOML; every field
//! is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LauncherError, Result};

/// Directory name used below the platform config directory.
const APP_DIR_NAME: &str = "homeshell";

/// Where configuration files are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LauncherConfig {
    /// Directory holding the user's config files.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Directory holding the bundled default config files.
    #[serde(default = "default_default_config_dir")]
    pub default_config_dir: PathBuf,
    /// File name of the application menu config.
    #[serde(default = "default_app_menu_file")]
    pub app_menu_file: String,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR_NAME))
}
fn default_default_config_dir() -> PathBuf {
    PathBuf::from("assets/configuration")
}
fn default_app_menu_file() -> String {
    "apps.json".to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            default_config_dir: default_default_config_dir(),
            app_menu_file: default_app_menu_file(),
        }
    }
}

impl LauncherConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LauncherError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded launcher config from {}", path.display());
        Self::from_toml(&text)
    }

    /// Path of the user's application menu file.
    pub fn app_menu_path(&self) -> PathBuf {
        self.config_dir.join(&self.app_menu_file)
    }

    /// Path of the bundled default application menu file.
    pub fn default_app_menu_path(&self) -> PathBuf {
        self.default_config_dir.join(&self.app_menu_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg = LauncherConfig::from_toml("").unwrap();
        assert_eq!(cfg, LauncherConfig::default());
        assert_eq!(cfg.app_menu_file, "apps.json");
        assert!(cfg.config_dir.ends_with("homeshell"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = LauncherConfig::from_toml("config_dir = \"/tmp/shell\"").unwrap();
        assert_eq!(cfg.config_dir, PathBuf::from("/tmp/shell"));
        assert_eq!(cfg.default_config_dir, PathBuf::from("assets/configuration"));
        assert_eq!(cfg.app_menu_path(), PathBuf::from("/tmp/shell/apps.json"));
    }

    #[test]
    fn custom_menu_file_name() {
        let cfg = LauncherConfig::from_toml(
            "default_config_dir = \"/usr/share/shell\"\napp_menu_file = \"menu.json\"",
        )
        .unwrap();
        assert_eq!(
            cfg.default_app_menu_path(),
            PathBuf::from("/usr/share/shell/menu.json")
        );
    }

    #[test]
    fn malformed_toml_is_error() {
        let err = LauncherConfig::from_toml("config_dir = [").unwrap_err();
        assert!(matches!(err, LauncherError::TomlParse(_)));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");
        std::fs::write(&path, "app_menu_file = \"favorites.json\"").unwrap();
        let cfg = LauncherConfig::from_file(&path).unwrap();
        assert_eq!(cfg.app_menu_file, "favorites.json");
    }

    #[test]
    fn from_missing_file_is_config_error() {
        let err = LauncherConfig::from_file(Path::new("/nonexistent/launcher.toml")).unwrap_err();
        assert!(matches!(err, LauncherError::Config(_)));
    }
}
