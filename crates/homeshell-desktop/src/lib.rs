//! Installed-application data for the homeshell menu.
//!
//! [`DesktopEntry`] is the data a freedesktop `.desktop` file contributes to
//! the launcher. A [`DesktopEntryCatalog`] answers category queries over the
//! installed entries and persists the user's hide flag. Parsing `.desktop`
//! files is left to whoever fills the catalog.

pub mod catalog;
pub mod entry;

pub use catalog::{ALL_CATEGORIES, DesktopEntryCatalog, MemoryCatalog};
pub use entry::DesktopEntry;
