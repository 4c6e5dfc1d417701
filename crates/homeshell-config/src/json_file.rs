//! Typed key/value access to a single JSON object file.
//!
//! The file is read lazily on first access and only written back by an
//! explicit [`JsonFile::write_changes`]. Reads and writes are typed: asking for
//! a key with the wrong type is a [`LauncherError::Type`] error, while any
//! problem reading or writing the file itself is a [`LauncherError::File`]
//! error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use homeshell_types::error::{LauncherError, Result};

use crate::storage::ConfigStorage;

/// Name of a JSON value's type, as used in type errors.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "double",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A Rust type that can be stored under a JSON key.
pub trait JsonType: Sized {
    /// Name used in type errors.
    const TYPE_NAME: &'static str;

    /// Convert a stored value, or `None` if it has another type.
    fn from_json(value: &Value) -> Option<Self>;

    /// Convert into a storable value.
    fn into_json(self) -> Value;
}

impl JsonType for String {
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_json(self) -> Value {
        Value::String(self)
    }
}

impl JsonType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_json(self) -> Value {
        Value::Bool(self)
    }
}

impl JsonType for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn into_json(self) -> Value {
        Value::from(self)
    }
}

impl JsonType for f64 {
    const TYPE_NAME: &'static str = "double";

    // Integers are accepted where a double is expected.
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn into_json(self) -> Value {
        Value::from(self)
    }
}

impl JsonType for Vec<Value> {
    const TYPE_NAME: &'static str = "array";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_array().cloned()
    }

    fn into_json(self) -> Value {
        Value::Array(self)
    }
}

impl JsonType for Vec<String> {
    const TYPE_NAME: &'static str = "string array";

    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    fn into_json(self) -> Value {
        Value::Array(self.into_iter().map(Value::String).collect())
    }
}

impl JsonType for Map<String, Value> {
    const TYPE_NAME: &'static str = "object";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }

    fn into_json(self) -> Value {
        Value::Object(self)
    }
}

impl JsonType for Value {
    const TYPE_NAME: &'static str = "var";

    fn from_json(value: &Value) -> Option<Self> {
        (!value.is_null()).then(|| value.clone())
    }

    fn into_json(self) -> Value {
        self
    }
}

/// One JSON object file, loaded on demand.
pub struct JsonFile {
    path: PathBuf,
    storage: Arc<dyn ConfigStorage>,
    data: Option<Map<String, Value>>,
    unwritten_changes: bool,
}

impl std::fmt::Debug for JsonFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFile")
            .field("path", &self.path)
            .field("loaded", &self.data.is_some())
            .field("unwritten_changes", &self.unwritten_changes)
            .finish()
    }
}

impl JsonFile {
    /// Bind a JSON file at `path` inside `storage`. Nothing is read yet.
    pub fn new(storage: Arc<dyn ConfigStorage>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            storage,
            data: None,
            unwritten_changes: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file is present in storage.
    pub fn file_exists(&self) -> bool {
        self.storage.exists(&self.path)
    }

    /// Whether there are changes not yet written to storage.
    pub fn has_unwritten_changes(&self) -> bool {
        self.unwritten_changes
    }

    /// Read a typed value.
    pub fn get<T: JsonType>(&mut self, key: &str) -> Result<T> {
        let value = self.data()?.get(key);
        match value {
            None => Err(LauncherError::Type {
                key: key.to_string(),
                expected: T::TYPE_NAME,
                found: "void",
            }),
            Some(value) => T::from_json(value).ok_or_else(|| LauncherError::Type {
                key: key.to_string(),
                expected: T::TYPE_NAME,
                found: type_name(value),
            }),
        }
    }

    /// Store a typed value.
    ///
    /// Returns `Ok(false)` if the stored value was already equal. Replacing a
    /// value of a different type is a type error and leaves the file as it was.
    pub fn set<T: JsonType>(&mut self, key: &str, value: T) -> Result<bool> {
        let new_value = value.into_json();
        let data = self.data()?;
        if let Some(old_value) = data.get(key) {
            if *old_value == new_value {
                return Ok(false);
            }
            if T::from_json(old_value).is_none() && !old_value.is_null() {
                return Err(LauncherError::Type {
                    key: key.to_string(),
                    expected: T::TYPE_NAME,
                    found: type_name(old_value),
                });
            }
        }
        data.insert(key.to_string(), new_value);
        self.unwritten_changes = true;
        Ok(true)
    }

    /// Store a raw value, replacing whatever the key held before regardless of
    /// its type. Returns `Ok(false)` if the value was already equal.
    pub fn replace(&mut self, key: &str, value: Value) -> Result<bool> {
        let data = self.data()?;
        if data.get(key) == Some(&value) {
            return Ok(false);
        }
        data.insert(key.to_string(), value);
        self.unwritten_changes = true;
        Ok(true)
    }

    /// Whether `key` holds a value of type `T`. File errors count as absent.
    pub fn exists<T: JsonType>(&mut self, key: &str) -> bool {
        match self.data() {
            Ok(data) => data.get(key).is_some_and(|value| T::from_json(value).is_some()),
            Err(e) => {
                log::warn!("{}: {e}", self.path.display());
                false
            },
        }
    }

    /// Borrow a raw value without type checking.
    pub fn value(&mut self, key: &str) -> Result<Option<&Value>> {
        Ok(self.data()?.get(key))
    }

    /// Mutably borrow a raw value. The file is marked as changed.
    pub fn value_mut(&mut self, key: &str) -> Result<Option<&mut Value>> {
        self.data()?;
        self.unwritten_changes = true;
        Ok(self.data.as_mut().and_then(|data| data.get_mut(key)))
    }

    /// The whole loaded object, or `None` before the first access.
    pub fn document(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// The whole object, loading it if needed. The file is marked as changed.
    pub fn document_mut(&mut self) -> Result<&mut Map<String, Value>> {
        self.data()?;
        self.unwritten_changes = true;
        Ok(self.data.get_or_insert_with(Map::new))
    }

    /// Write pending changes back to storage.
    ///
    /// Does nothing when there is nothing to write. On failure the in-memory
    /// data stays as it is and remains marked as changed.
    pub fn write_changes(&mut self) -> Result<()> {
        if !self.unwritten_changes {
            return Ok(());
        }
        let Some(data) = self.data.as_ref() else {
            return Ok(());
        };
        let mut payload = serde_json::to_vec_pretty(data)?;
        payload.push(b'\n');
        self.storage.write(&self.path, &payload)?;
        self.unwritten_changes = false;
        log::debug!("Wrote {}", self.path.display());
        Ok(())
    }

    /// Drop the loaded data; the next access reads the file again.
    /// Unwritten changes are discarded.
    pub fn unload(&mut self) {
        self.data = None;
        self.unwritten_changes = false;
    }

    fn data(&mut self) -> Result<&mut Map<String, Value>> {
        if self.data.is_none() {
            self.data = Some(self.read_file()?);
        }
        Ok(self.data.get_or_insert_with(Map::new))
    }

    fn read_file(&self) -> Result<Map<String, Value>> {
        let path = self.path.display().to_string();
        let Some(bytes) = self.storage.read(&self.path)? else {
            log::debug!("{path} does not exist, starting empty");
            return Ok(Map::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(LauncherError::file(
                path,
                format!("expected a JSON object, found {}", type_name(&other)),
            )),
            Err(e) => Err(LauncherError::file(path, format!("invalid JSON: {e}"))),
        }
    }
}
