//! JSON-backed configuration resources for homeshell.
//!
//! Every config file the launcher owns goes through the same stack:
//! a [`ConfigStorage`] backend holds the bytes, a [`JsonFile`] gives typed
//! access to one JSON object, a [`ConfigJson`] pairs the user file with its
//! bundled defaults, and a [`SharedResource`] puts the whole thing behind a
//! reader/writer lock with a [`ListenerRegistry`] for change notification.

pub mod config_json;
pub mod json_file;
pub mod listener;
pub mod resource;
pub mod storage;

pub use config_json::{AlertSink, ConfigJson, ConfigKey, DataType, LogAlerts};
pub use json_file::{JsonFile, JsonType};
pub use listener::{ListenerRegistry, Subscription};
pub use resource::{Resource, ResourceHandle, ResourceSlot, SharedResource};
pub use storage::{ConfigStorage, DiskStorage, MemoryStorage};
