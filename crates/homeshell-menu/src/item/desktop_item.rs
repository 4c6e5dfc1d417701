use std::sync::Arc;

use serde_json::Value;

use homeshell_desktop::{DesktopEntry, DesktopEntryCatalog};
use homeshell_types::error::Result;

use super::ItemState;
use crate::app_json::{self, AppJsonHandle};
use crate::index::MenuIndex;

/// How a desktop-entry node got into its folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Referenced by id in the folder's item list.
    Literal,
    /// Pulled in by the folder's categories.
    Category,
}

/// A node backed by an installed application's desktop entry. Edits are
/// saved to the entry through the catalog, never to the menu file.
#[derive(Clone)]
pub struct DesktopEntryItemData {
    entry: DesktopEntry,
    index: MenuIndex,
    origin: EntryOrigin,
    state: ItemState,
    catalog: Arc<dyn DesktopEntryCatalog>,
    source: AppJsonHandle,
}

impl std::fmt::Debug for DesktopEntryItemData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopEntryItemData")
            .field("entry", &self.entry.id)
            .field("index", &self.index)
            .field("origin", &self.origin)
            .field("state", &self.state)
            .finish()
    }
}

impl DesktopEntryItemData {
    pub(crate) fn new(
        entry: DesktopEntry,
        index: MenuIndex,
        origin: EntryOrigin,
        catalog: Arc<dyn DesktopEntryCatalog>,
        source: AppJsonHandle,
    ) -> Self {
        Self {
            entry,
            index,
            origin,
            state: ItemState::Unmodified,
            catalog,
            source,
        }
    }

    pub fn entry(&self) -> &DesktopEntry {
        &self.entry
    }

    pub fn index(&self) -> &MenuIndex {
        &self.index
    }

    pub(crate) fn set_index(&mut self, index: MenuIndex) {
        self.index = index;
    }

    pub fn origin(&self) -> EntryOrigin {
        self.origin
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub(crate) fn edit(&mut self, f: impl FnOnce(&mut DesktopEntry) -> bool) -> bool {
        let changed = f(&mut self.entry);
        if changed {
            self.state.edit();
        }
        changed
    }

    /// Save `entry` to the catalog. While the menu is open the save runs
    /// under its write lock, so cached nodes are dropped before anyone else
    /// can read them and listeners hear about the change.
    fn save(&self, entry: &DesktopEntry) -> Result<()> {
        let Some(resource) = self.source.upgrade() else {
            return self.catalog.save_entry(entry);
        };
        app_json::modify(&resource, |app_json| {
            let before = app_json.catalog().entry(&entry.id);
            app_json.catalog().save_entry(entry)?;
            let reshaped = before.is_none_or(|before| {
                before.categories != entry.categories
                    || before.is_displayed() != entry.is_displayed()
            });
            app_json.entry_saved(&self.index, reshaped);
            Ok(())
        })
    }

    pub(crate) fn update_source(&mut self) -> Result<bool> {
        if self.state != ItemState::Edited {
            return Ok(false);
        }
        self.save(&self.entry)?;
        self.state = ItemState::Saved;
        Ok(true)
    }

    /// A literal reference is removed from the menu file. A category entry
    /// is hidden for the current user and rewritten; the entry file itself is
    /// never deleted.
    pub(crate) fn delete_from_source(&mut self) -> Result<bool> {
        if self.state == ItemState::Deleted {
            return Ok(false);
        }
        match self.origin {
            EntryOrigin::Literal => {
                let Some(resource) = self.source.upgrade() else {
                    return Ok(false);
                };
                let id = Value::String(self.entry.id.clone());
                let result = app_json::modify(&resource, |app_json| {
                    if !app_json.holds(&self.index, &id) {
                        log::warn!(
                            "Not removing {} at {}: the menu changed since it was read",
                            self.entry.id,
                            self.index
                        );
                        return Ok(false);
                    }
                    app_json.remove_menu_item(&self.index, true)
                });
                if !matches!(result, Ok(false)) {
                    self.state = ItemState::Deleted;
                }
                result
            },
            EntryOrigin::Category => {
                let mut hidden = self.entry.clone();
                hidden.hidden = true;
                self.save(&hidden)?;
                self.entry = hidden;
                self.state = ItemState::Deleted;
                log::debug!("Hid desktop entry {}", self.entry.id);
                Ok(true)
            },
        }
    }
}
