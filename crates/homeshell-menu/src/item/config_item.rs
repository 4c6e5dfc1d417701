use std::sync::Arc;

use serde_json::{Map, Value};

use homeshell_config::SharedResource;
use homeshell_types::error::Result;

use super::{ItemState, MenuItemData};
use crate::app_json::{
    self, AppJson, AppJsonHandle, CATEGORIES_KEY, COMMAND_KEY, FOLDER_ITEMS_KEY, ICON_KEY,
    LAUNCH_IN_TERM_KEY, TITLE_KEY,
};
use crate::index::MenuIndex;

/// A node stored as a JSON object in the menu file.
///
/// Keeps the whole object, unknown keys included, so writing it back loses
/// nothing. Also keeps the object as last read or written, so writes are
/// refused once the node at `index` is no longer this one.
#[derive(Debug, Clone)]
pub struct ConfigItemData {
    json: Map<String, Value>,
    stored: Value,
    index: MenuIndex,
    state: ItemState,
    source: AppJsonHandle,
}

impl ConfigItemData {
    pub(crate) fn new(json: Map<String, Value>, index: MenuIndex, source: AppJsonHandle) -> Self {
        Self {
            stored: Value::Object(json.clone()),
            json,
            index,
            state: ItemState::Unmodified,
            source,
        }
    }

    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    pub fn index(&self) -> &MenuIndex {
        &self.index
    }

    pub(crate) fn set_index(&mut self, index: MenuIndex) {
        self.index = index;
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    fn string(&self, key: &str) -> String {
        self.json
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn has_entries(&self, key: &str) -> bool {
        self.json
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|items| !items.is_empty())
    }

    pub fn title(&self) -> String {
        self.string(TITLE_KEY)
    }

    pub fn icon_name(&self) -> String {
        self.string(ICON_KEY)
    }

    pub fn command(&self) -> String {
        self.string(COMMAND_KEY)
    }

    pub fn categories(&self) -> Vec<String> {
        app_json::string_array(self.json.get(CATEGORIES_KEY))
    }

    pub fn launched_in_term(&self) -> bool {
        self.json
            .get(LAUNCH_IN_TERM_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// A folder has child items or categories to pull entries from.
    pub fn is_folder(&self) -> bool {
        self.has_entries(FOLDER_ITEMS_KEY) || self.has_entries(CATEGORIES_KEY)
    }

    pub(crate) fn set_field(&mut self, key: &str, value: Value) -> bool {
        if self.json.get(key) == Some(&value) {
            return false;
        }
        self.json.insert(key.to_string(), value);
        self.state.edit();
        true
    }

    fn resource(&self) -> Option<Arc<SharedResource<AppJson>>> {
        self.source.upgrade()
    }

    pub(crate) fn folder_size(&self, include_desktop_entries: bool) -> usize {
        let Some(resource) = self.resource() else {
            return 0;
        };
        let size = resource
            .read()
            .get_folder_size(&self.index, include_desktop_entries);
        size.unwrap_or(0)
    }

    pub(crate) fn child(&self, n: usize) -> Option<MenuItemData> {
        let resource = self.resource()?;
        resource.read().get_menu_item(&self.index.child_index(n))
    }

    pub(crate) fn children(&self) -> Vec<MenuItemData> {
        let Some(resource) = self.resource() else {
            return Vec::new();
        };
        resource.read().get_menu_items(&self.index)
    }

    /// Literal position `offset` away from this node, if that stays inside
    /// the folder's reorderable children.
    fn move_target(&self, resource: &SharedResource<AppJson>, offset: isize) -> Option<usize> {
        let position = self.index.folder_index()?;
        let movable = resource
            .read()
            .get_movable_child_count(&self.index.parent_index())?;
        let target = position.checked_add_signed(offset)?;
        (position < movable && target < movable).then_some(target)
    }

    pub(crate) fn can_move_index(&self, offset: isize) -> bool {
        self.resource()
            .is_some_and(|resource| self.move_target(&resource, offset).is_some())
    }

    pub(crate) fn move_index(&mut self, offset: isize) -> Result<bool> {
        if self.state == ItemState::Deleted {
            return Ok(false);
        }
        let Some(resource) = self.resource() else {
            return Ok(false);
        };
        let Some(target) = self.move_target(&resource, offset) else {
            return Ok(false);
        };
        let from = self.index.clone();
        let moved = app_json::modify(&resource, |app_json| {
            if !app_json.holds(&from, &self.stored) {
                log::warn!("Not moving {from}: the menu changed since it was read");
                return Ok(false);
            }
            app_json.move_menu_item(&from, target, true)
        });
        if !matches!(moved, Ok(false)) {
            self.index = from.parent_index().child_index(target);
        }
        moved
    }

    pub(crate) fn update_source(&mut self) -> Result<bool> {
        if self.state != ItemState::Edited {
            return Ok(false);
        }
        let Some(resource) = self.resource() else {
            return Ok(false);
        };
        let json = Value::Object(self.json.clone());
        let result = app_json::modify(&resource, |app_json| {
            if !app_json.holds(&self.index, &self.stored) {
                return None;
            }
            Some(app_json.replace_menu_item(&self.index, json.clone(), true))
        });
        match result {
            None => {
                log::warn!(
                    "Not saving \"{}\" at {}: the menu changed since it was read",
                    self.title(),
                    self.index
                );
                Ok(false)
            },
            Some(result) => {
                // The tree holds the new value even when writing it failed.
                self.stored = json;
                if result.is_ok() {
                    self.state = ItemState::Saved;
                }
                result
            },
        }
    }

    pub(crate) fn delete_from_source(&mut self) -> Result<bool> {
        if self.state == ItemState::Deleted {
            return Ok(false);
        }
        let Some(resource) = self.resource() else {
            return Ok(false);
        };
        let result = app_json::modify(&resource, |app_json| {
            if !app_json.holds(&self.index, &self.stored) {
                log::warn!("Not deleting {}: the menu changed since it was read", self.index);
                return Ok(false);
            }
            app_json.remove_menu_item(&self.index, true)
        });
        if !matches!(result, Ok(false)) {
            self.state = ItemState::Deleted;
        }
        result
    }
}
