//! The homeshell application menu.
//!
//! The menu is a tree of folders and shortcuts stored in one JSON file.
//! Nodes are addressed by [`MenuIndex`] paths and read as [`MenuItemData`]
//! projections through an [`AppConfigFile`] handle, which guards the shared
//! [`AppJson`] tree with a reader/writer lock.

pub mod app_config;
pub mod app_json;
pub mod cache;
pub mod index;
pub mod item;

pub use app_config::{AppConfigFile, AppMenuOptions};
pub use app_json::{AppJson, FOLDER_ITEMS_KEY};
pub use index::MenuIndex;
pub use item::{DataField, ItemState, MenuItemData, NewMenuItem};
