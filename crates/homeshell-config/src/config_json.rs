//! Config resources backed by a user JSON file plus bundled defaults.
//!
//! A [`ConfigJson`] owns two [`JsonFile`]s: the user's writable file and a
//! read-only copy of the defaults with the same schema. Missing or mistyped
//! user values are healed from the defaults and the heal is persisted. File
//! failures are handed to an [`AlertSink`] and never take the caller down.

use std::path::PathBuf;
use std::sync::Arc;

use homeshell_types::error::{LauncherError, Result};

use crate::json_file::{JsonFile, JsonType};
use crate::resource::Resource;
use crate::storage::ConfigStorage;

/// Basic value type of a declared config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Int,
    Bool,
    Double,
    Array,
}

/// A key a config resource declares, with its expected type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    pub key: &'static str,
    pub data_type: DataType,
}

impl ConfigKey {
    pub const fn new(key: &'static str, data_type: DataType) -> Self {
        Self { key, data_type }
    }
}

/// Receives config errors that should reach the user.
pub trait AlertSink: Send + Sync {
    fn show_error(&self, message: &str);
}

/// Alert sink that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn show_error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// A JSON config file with default-value healing.
pub struct ConfigJson {
    config: JsonFile,
    defaults: JsonFile,
    keys: Vec<ConfigKey>,
    alerts: Arc<dyn AlertSink>,
}

impl std::fmt::Debug for ConfigJson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigJson")
            .field("config", &self.config)
            .field("defaults", &self.defaults)
            .field("keys", &self.keys)
            .finish()
    }
}

impl ConfigJson {
    /// Bind a config resource. Nothing is read until the first access.
    pub fn new(
        storage: Arc<dyn ConfigStorage>,
        config_path: impl Into<PathBuf>,
        default_path: impl Into<PathBuf>,
        keys: Vec<ConfigKey>,
    ) -> Self {
        Self {
            config: JsonFile::new(Arc::clone(&storage), config_path),
            defaults: JsonFile::new(storage, default_path),
            keys,
            alerts: Arc::new(LogAlerts),
        }
    }

    /// Replace the alert sink.
    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn keys(&self) -> &[ConfigKey] {
        &self.keys
    }

    pub fn is_valid_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k.key == key)
    }

    /// The user's config file.
    pub fn config_file(&mut self) -> &mut JsonFile {
        &mut self.config
    }

    /// The loaded user document, if it has been read.
    pub fn document(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.config.document()
    }

    /// Make sure every declared key holds a value of its declared type,
    /// copying defaults where needed, then persist any heals.
    pub fn load_json_data(&mut self) {
        if !self.config.file_exists() {
            log::info!(
                "Creating {} from {}",
                self.config.path().display(),
                self.defaults.path().display()
            );
        }
        let keys = self.keys.clone();
        for key in keys {
            match key.data_type {
                DataType::String => {
                    self.init_property::<String>(key.key);
                },
                DataType::Int => {
                    self.init_property::<i64>(key.key);
                },
                DataType::Bool => {
                    self.init_property::<bool>(key.key);
                },
                DataType::Double => {
                    self.init_property::<f64>(key.key);
                },
                DataType::Array => {
                    self.init_property::<Vec<serde_json::Value>>(key.key);
                },
            }
        }
        let _ = self.write_changes();
    }

    /// Read `key` from the user file, healing it from the defaults when it is
    /// missing or has the wrong type. Failures are reported and yield
    /// `T::default()`.
    pub fn init_property<T: JsonType + Default>(&mut self, key: &str) -> T {
        match self.try_init_property::<T>(key) {
            Ok(value) => value,
            Err(e) => {
                self.report(&e);
                T::default()
            },
        }
    }

    fn try_init_property<T: JsonType>(&mut self, key: &str) -> Result<T> {
        if self.config.exists::<T>(key) {
            return self.config.get::<T>(key);
        }
        log::debug!(
            "Key \"{key}\" missing or invalid in {}, using default",
            self.config.path().display()
        );
        let value = self.defaults.get::<T>(key)?.into_json();
        self.config.replace(key, value)?;
        self.config.get::<T>(key)
    }

    /// Read a declared value.
    ///
    /// Undeclared keys and type mismatches are errors. A file failure is
    /// reported and yields `T::default()`.
    pub fn get_config_value<T: JsonType + Default>(&mut self, key: &str) -> Result<T> {
        if !self.is_valid_key(key) {
            return Err(LauncherError::BadKey(key.to_string()));
        }
        match self.config.get::<T>(key) {
            Ok(value) => Ok(value),
            Err(e) if e.is_file_error() => {
                self.report(&e);
                Ok(T::default())
            },
            Err(e) => Err(e),
        }
    }

    /// Change a declared value, writing immediately if it changed.
    ///
    /// Returns whether the stored value changed; the caller is responsible for
    /// notifying listeners once it has released its lock.
    pub fn set_config_value<T: JsonType>(&mut self, key: &str, value: T) -> Result<bool> {
        if !self.is_valid_key(key) {
            return Err(LauncherError::BadKey(key.to_string()));
        }
        let changed = self.config.set(key, value)?;
        if changed {
            self.write_changes()?;
        }
        Ok(changed)
    }

    /// Set one declared key back to its default value.
    pub fn restore_default_value(&mut self, key: &str) -> Result<bool> {
        let Some(config_key) = self.keys.iter().find(|k| k.key == key).copied() else {
            log::warn!(
                "Key \"{key}\" is not expected in {}",
                self.config.path().display()
            );
            return Err(LauncherError::BadKey(key.to_string()));
        };
        match config_key.data_type {
            DataType::String => self.copy_default::<String>(key),
            DataType::Int => self.copy_default::<i64>(key),
            DataType::Bool => self.copy_default::<bool>(key),
            DataType::Double => self.copy_default::<f64>(key),
            DataType::Array => self.copy_default::<Vec<serde_json::Value>>(key),
        }
    }

    /// Set every declared key back to its default. Returns the keys that
    /// changed.
    pub fn restore_default_values(&mut self) -> Vec<&'static str> {
        let keys = self.keys.clone();
        let mut changed = Vec::new();
        for key in keys {
            match self.restore_default_value(key.key) {
                Ok(true) => changed.push(key.key),
                Ok(false) => {},
                Err(e) => self.report(&e),
            }
        }
        changed
    }

    fn copy_default<T: JsonType>(&mut self, key: &str) -> Result<bool> {
        let value = self.defaults.get::<T>(key)?;
        self.set_config_value(key, value)
    }

    /// Write pending changes to the user file. Failures are reported as well
    /// as returned.
    pub fn write_changes(&mut self) -> Result<()> {
        self.config.write_changes().inspect_err(|e| self.alerts.show_error(&e.to_string()))
    }

    /// Hand an error to the alert sink.
    pub fn report(&self, error: &LauncherError) {
        self.alerts.show_error(&format!(
            "{}: {error}",
            self.config.path().display()
        ));
    }
}

impl Resource for ConfigJson {
    fn release(&mut self) {
        let _ = self.write_changes();
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use super::*;
    use crate::storage::MemoryStorage;

    const USER: &str = "/home/user/.config/main.json";
    const DEFAULTS: &str = "/usr/share/main.json";

    const KEYS: [ConfigKey; 4] = [
        ConfigKey::new("time format", DataType::String),
        ConfigKey::new("max rows", DataType::Int),
        ConfigKey::new("show cursor", DataType::Bool),
        ConfigKey::new("scale", DataType::Double),
    ];

    #[derive(Default)]
    struct RecordingAlerts(Mutex<Vec<String>>);

    impl AlertSink for RecordingAlerts {
        fn show_error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn storage() -> Arc<MemoryStorage> {
        let storage = MemoryStorage::new();
        storage.insert(
            DEFAULTS,
            r#"{"time format": "24h", "max rows": 3, "show cursor": true, "scale": 1.0}"#,
        );
        Arc::new(storage)
    }

    fn resource(storage: &Arc<MemoryStorage>) -> ConfigJson {
        ConfigJson::new(
            Arc::clone(storage) as Arc<dyn ConfigStorage>,
            USER,
            DEFAULTS,
            KEYS.to_vec(),
        )
    }

    #[test]
    fn load_heals_missing_file_from_defaults() {
        let storage = storage();
        let mut config = resource(&storage);
        config.load_json_data();
        assert_eq!(config.get_config_value::<String>("time format").unwrap(), "24h");
        assert_eq!(config.get_config_value::<i64>("max rows").unwrap(), 3);
        let written = storage.contents(Path::new(USER)).unwrap();
        assert!(written.contains("\"show cursor\": true"));
    }

    #[test]
    fn load_keeps_valid_user_values_and_heals_bad_ones() {
        let storage = storage();
        storage.insert(USER, r#"{"time format": "12h", "max rows": "many"}"#);
        let mut config = resource(&storage);
        config.load_json_data();
        assert_eq!(config.get_config_value::<String>("time format").unwrap(), "12h");
        assert_eq!(config.get_config_value::<i64>("max rows").unwrap(), 3);
    }

    #[test]
    fn init_property_without_default_reports_and_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        let alerts = Arc::new(RecordingAlerts::default());
        let mut config = resource(&storage).with_alerts(Arc::clone(&alerts) as Arc<dyn AlertSink>);
        assert_eq!(config.init_property::<String>("time format"), "");
        assert_eq!(alerts.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn undeclared_key_is_rejected() {
        let storage = storage();
        let mut config = resource(&storage);
        assert!(matches!(
            config.get_config_value::<String>("colour"),
            Err(LauncherError::BadKey(_))
        ));
        assert!(matches!(
            config.set_config_value("colour", "red".to_string()),
            Err(LauncherError::BadKey(_))
        ));
        assert!(config.restore_default_value("colour").is_err());
    }

    #[test]
    fn set_writes_only_on_change() {
        let storage = storage();
        let mut config = resource(&storage);
        config.load_json_data();
        let writes = storage.write_count();
        assert!(!config.set_config_value("max rows", 3_i64).unwrap());
        assert_eq!(storage.write_count(), writes);
        assert!(config.set_config_value("max rows", 5_i64).unwrap());
        assert_eq!(storage.write_count(), writes + 1);
    }

    #[test]
    fn set_type_mismatch_is_error() {
        let storage = storage();
        let mut config = resource(&storage);
        config.load_json_data();
        assert!(matches!(
            config.set_config_value("max rows", "five".to_string()),
            Err(LauncherError::Type { .. })
        ));
    }

    #[test]
    fn restore_defaults_reports_changed_keys() {
        let storage = storage();
        let mut config = resource(&storage);
        config.load_json_data();
        config.set_config_value("max rows", 9_i64).unwrap();
        config.set_config_value("show cursor", false).unwrap();
        let changed = config.restore_default_values();
        assert_eq!(changed, vec!["max rows", "show cursor"]);
        assert_eq!(config.get_config_value::<i64>("max rows").unwrap(), 3);
        assert!(config.restore_default_values().is_empty());
    }

    #[test]
    fn failed_write_is_reported_and_state_kept() {
        let storage = storage();
        let alerts = Arc::new(RecordingAlerts::default());
        let mut config = resource(&storage).with_alerts(Arc::clone(&alerts) as Arc<dyn AlertSink>);
        config.load_json_data();
        storage.set_read_only(true);
        let err = config.set_config_value("max rows", 7_i64).unwrap_err();
        assert!(err.is_file_error());
        assert_eq!(config.get_config_value::<i64>("max rows").unwrap(), 7);
        assert!(!alerts.0.lock().unwrap().is_empty());
    }

    #[test]
    fn release_flushes_pending_changes() {
        let storage = storage();
        let mut config = resource(&storage);
        config.load_json_data();
        config.config_file().set("max rows", 11_i64).unwrap();
        config.release();
        assert!(storage.contents(Path::new(USER)).unwrap().contains("11"));
    }
}
