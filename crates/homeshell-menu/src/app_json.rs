//! The menu tree resource.
//!
//! [`AppJson`] owns the menu document loaded from the user's `apps.json`
//! (healed from the bundled default copy) and resolves [`MenuIndex`] paths
//! against it. The document looks like
//!
//! ```json
//! {"folder items": [
//!     {"name": "Terminal", "icon": "terminal", "command": "xterm"},
//!     {"name": "Games", "categories": ["Game"], "folder items": []},
//!     "org.gnome.Chess.desktop"
//! ]}
//! ```
//!
//! Objects are config nodes and strings are references to desktop entries.
//! A folder's `categories` are expanded at read time into extra desktop-entry
//! children after the literal ones; those are never written back.
//!
//! `AppJson` is only ever used through a [`SharedResource`]; see
//! [`AppConfigFile`](crate::AppConfigFile) for the locked facade.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use serde_json::{Map, Value};

use homeshell_config::{ConfigJson, ConfigKey, DataType, Resource, SharedResource};
use homeshell_desktop::{DesktopEntry, DesktopEntryCatalog};
use homeshell_types::error::Result;

use crate::cache::MenuItemCache;
use crate::index::MenuIndex;
use crate::item::{ConfigItemData, DesktopEntryItemData, EntryOrigin, MenuItemData};

/// Child list of a folder node.
pub const FOLDER_ITEMS_KEY: &str = "folder items";
/// Displayed title.
pub const TITLE_KEY: &str = "name";
/// Icon name or path.
pub const ICON_KEY: &str = "icon";
/// Launch command of a shortcut.
pub const COMMAND_KEY: &str = "command";
/// Whether the command runs in a terminal.
pub const LAUNCH_IN_TERM_KEY: &str = "launch in terminal";
/// Desktop-entry categories a folder pulls in.
pub const CATEGORIES_KEY: &str = "categories";

/// Weak handle node projections keep to the resource they came from.
pub type AppJsonHandle = Weak<SharedResource<AppJson>>;

/// The menu tree plus its node cache.
pub struct AppJson {
    config: ConfigJson,
    catalog: Arc<dyn DesktopEntryCatalog>,
    cache: MenuItemCache<MenuItemData>,
    handle: AppJsonHandle,
    changed_keys: BTreeSet<String>,
}

impl std::fmt::Debug for AppJson {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppJson")
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl AppJson {
    /// Keys the menu file declares.
    pub fn config_keys() -> Vec<ConfigKey> {
        vec![ConfigKey::new(FOLDER_ITEMS_KEY, DataType::Array)]
    }

    /// Load the menu from `config`, healing a missing or broken
    /// `"folder items"` list from the defaults.
    pub fn new(
        config: ConfigJson,
        catalog: Arc<dyn DesktopEntryCatalog>,
        handle: AppJsonHandle,
    ) -> Self {
        let mut app_json = Self {
            config,
            catalog,
            cache: MenuItemCache::new(),
            handle,
            changed_keys: BTreeSet::new(),
        };
        app_json.config.load_json_data();
        app_json
    }

    pub fn catalog(&self) -> &Arc<dyn DesktopEntryCatalog> {
        &self.catalog
    }

    // -- Resolution ---------------------------------------------------------

    /// The JSON object at `index`, or `None` if the path leaves the tree or
    /// lands on something that is not an object.
    fn object_at(&self, index: &MenuIndex) -> Option<&Map<String, Value>> {
        let mut object = self.config.document()?;
        for &i in index.as_slice() {
            object = object
                .get(FOLDER_ITEMS_KEY)?
                .as_array()?
                .get(i)?
                .as_object()?;
        }
        Some(object)
    }

    /// Mutable access to the object at `index`. Only call this for paths
    /// already checked with [`Self::object_at`]; it marks the file as changed.
    fn object_at_mut(&mut self, index: &MenuIndex) -> Option<&mut Map<String, Value>> {
        let mut object = self.config.config_file().document_mut().ok()?;
        for &i in index.as_slice() {
            object = object
                .get_mut(FOLDER_ITEMS_KEY)?
                .as_array_mut()?
                .get_mut(i)?
                .as_object_mut()?;
        }
        Some(object)
    }

    /// The literal children of a folder object. A missing list is empty; a
    /// list of the wrong type is logged and treated as empty.
    fn literal_items<'a>(folder: &'a Map<String, Value>, index: &MenuIndex) -> &'a [Value] {
        match folder.get(FOLDER_ITEMS_KEY) {
            None => &[],
            Some(Value::Array(items)) => items,
            Some(other) => {
                log::warn!(
                    "Ignoring \"{FOLDER_ITEMS_KEY}\" at {index}: expected array, found {}",
                    homeshell_config::json_file::type_name(other)
                );
                &[]
            },
        }
    }

    fn desktop_entries(&self, folder: &Map<String, Value>) -> Vec<DesktopEntry> {
        let categories = string_array(folder.get(CATEGORIES_KEY));
        if categories.is_empty() {
            return Vec::new();
        }
        self.catalog.entries_in_categories(&categories)
    }

    fn referenced_entry(&self, id: &str) -> DesktopEntry {
        self.catalog.entry(id).unwrap_or_else(|| {
            log::warn!("Menu references unknown desktop entry {id}");
            DesktopEntry::new(id, id)
        })
    }

    /// Build the projection of one literal child value.
    fn project(&self, index: MenuIndex, value: &Value) -> Option<MenuItemData> {
        match value {
            Value::Object(object) => Some(MenuItemData::Config(ConfigItemData::new(
                object.clone(),
                index,
                Weak::clone(&self.handle),
            ))),
            Value::String(id) => Some(MenuItemData::DesktopEntry(DesktopEntryItemData::new(
                self.referenced_entry(id),
                index,
                EntryOrigin::Literal,
                Arc::clone(&self.catalog),
                Weak::clone(&self.handle),
            ))),
            other => {
                log::warn!(
                    "Skipping menu item at {index}: expected object or string, found {}",
                    homeshell_config::json_file::type_name(other)
                );
                None
            },
        }
    }

    fn project_entry(&self, index: MenuIndex, entry: DesktopEntry) -> MenuItemData {
        MenuItemData::DesktopEntry(DesktopEntryItemData::new(
            entry,
            index,
            EntryOrigin::Category,
            Arc::clone(&self.catalog),
            Weak::clone(&self.handle),
        ))
    }

    // -- Queries ------------------------------------------------------------

    /// The root folder node.
    pub fn get_root_menu_item(&self) -> MenuItemData {
        let document = self.config.document().cloned().unwrap_or_default();
        MenuItemData::Config(ConfigItemData::new(
            document,
            MenuIndex::root(),
            Weak::clone(&self.handle),
        ))
    }

    /// The node at `index`, literal or category-derived.
    pub fn get_menu_item(&self, index: &MenuIndex) -> Option<MenuItemData> {
        let Some(position) = index.folder_index() else {
            return Some(self.get_root_menu_item());
        };
        let folder_index = index.parent_index();
        let folder = self.object_at(&folder_index)?;
        let literal = Self::literal_items(folder, &folder_index);
        if let Some(value) = literal.get(position) {
            return self.project(index.clone(), value);
        }
        let entry = self
            .desktop_entries(folder)
            .into_iter()
            .nth(position - literal.len())?;
        Some(self.project_entry(index.clone(), entry))
    }

    /// Children of the folder at `folder_index`: literal items first, then
    /// the folder's category expansion in catalog order. Invalid indices give
    /// an empty list.
    pub fn get_menu_items(&self, folder_index: &MenuIndex) -> Vec<MenuItemData> {
        let Some(folder) = self.object_at(folder_index) else {
            return Vec::new();
        };
        let literal = Self::literal_items(folder, folder_index);
        let mut items: Vec<MenuItemData> = literal
            .iter()
            .enumerate()
            .filter_map(|(i, value)| self.project(folder_index.child_index(i), value))
            .collect();
        let first_synthetic = literal.len();
        items.extend(
            self.desktop_entries(folder)
                .into_iter()
                .enumerate()
                .map(|(j, entry)| {
                    self.project_entry(folder_index.child_index(first_synthetic + j), entry)
                }),
        );
        items
    }

    /// Number of children of the folder at `folder_index`, counting the
    /// category expansion only when `include_desktop_entries` is set.
    ///
    /// `None` if `folder_index` does not name a config node. A config node
    /// with no children or categories (a shortcut) gives `Some(0)`, not
    /// `None`.
    pub fn get_folder_size(
        &self,
        folder_index: &MenuIndex,
        include_desktop_entries: bool,
    ) -> Option<usize> {
        let folder = self.object_at(folder_index)?;
        let literal = Self::literal_items(folder, folder_index).len();
        if include_desktop_entries {
            Some(literal + self.desktop_entries(folder).len())
        } else {
            Some(literal)
        }
    }

    /// Whether the literal child at `index` is still `expected`, the value a
    /// projection was built from. Child lists are not compared.
    pub fn holds(&self, index: &MenuIndex, expected: &Value) -> bool {
        let Some(position) = index.folder_index() else {
            return false;
        };
        let folder_index = index.parent_index();
        self.object_at(&folder_index)
            .and_then(|folder| Self::literal_items(folder, &folder_index).get(position))
            .is_some_and(|current| same_node(current, expected))
    }

    /// Number of leading children that may be reordered: the literal ones.
    pub fn get_movable_child_count(&self, folder_index: &MenuIndex) -> Option<usize> {
        self.get_folder_size(folder_index, false)
    }

    // -- Mutations ----------------------------------------------------------

    /// Insert `item` (an object or a desktop entry id) as a literal child.
    ///
    /// The position is clamped to the folder's literal item count. Returns
    /// `Ok(false)` if the parent folder does not exist or `item` is neither an
    /// object nor a string. An error means the change was made but could not
    /// be written.
    pub fn add_menu_item(
        &mut self,
        item: Value,
        index: &MenuIndex,
        write_changes_now: bool,
    ) -> Result<bool> {
        let Some(position) = index.folder_index() else {
            log::warn!("Cannot insert a menu item at the root index");
            return Ok(false);
        };
        if !(item.is_object() || item.is_string()) {
            log::warn!("Refusing to insert non-item JSON at {index}");
            return Ok(false);
        }
        let folder_index = index.parent_index();
        let Some(folder) = self.object_at(&folder_index) else {
            log::warn!("Cannot insert at {index}: no folder at {folder_index}");
            return Ok(false);
        };
        match folder.get(FOLDER_ITEMS_KEY) {
            None | Some(Value::Array(_)) => {},
            Some(_) => {
                log::warn!("Cannot insert at {index}: \"{FOLDER_ITEMS_KEY}\" is not an array");
                return Ok(false);
            },
        }
        let Some(folder) = self.object_at_mut(&folder_index) else {
            return Ok(false);
        };
        let Some(items) = folder
            .entry(FOLDER_ITEMS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
        else {
            return Ok(false);
        };
        let position = position.min(items.len());
        items.insert(position, item);
        let inserted = folder_index.child_index(position);
        self.cache.shift(&inserted, 1);
        log::debug!("Inserted menu item at {inserted}");
        self.finish_change(&folder_index, write_changes_now)
    }

    /// Remove the literal child at `index`. Cached projections of the node and
    /// its descendants are dropped and later siblings shift down.
    pub fn remove_menu_item(&mut self, index: &MenuIndex, write_changes_now: bool) -> Result<bool> {
        let Some(position) = index.folder_index() else {
            return Ok(false);
        };
        let folder_index = index.parent_index();
        let literal_count = self
            .object_at(&folder_index)
            .map(|folder| Self::literal_items(folder, &folder_index).len())
            .unwrap_or(0);
        if position >= literal_count {
            log::debug!("No literal menu item at {index} to remove");
            return Ok(false);
        }
        let Some(items) = self
            .object_at_mut(&folder_index)
            .and_then(|folder| folder.get_mut(FOLDER_ITEMS_KEY))
            .and_then(Value::as_array_mut)
        else {
            return Ok(false);
        };
        items.remove(position);
        self.cache.evict_subtree(index);
        self.cache.shift(index, -1);
        log::debug!("Removed menu item at {index}");
        self.finish_change(&folder_index, write_changes_now)
    }

    /// Replace the literal child at `index` with `item`, keeping the stored
    /// node's child list. Returns `Ok(false)` if there is no literal node
    /// there or nothing would change.
    pub fn replace_menu_item(
        &mut self,
        index: &MenuIndex,
        item: Value,
        write_changes_now: bool,
    ) -> Result<bool> {
        let Some(position) = index.folder_index() else {
            return Ok(false);
        };
        let folder_index = index.parent_index();
        let Some(current) = self
            .object_at(&folder_index)
            .and_then(|folder| Self::literal_items(folder, &folder_index).get(position))
        else {
            return Ok(false);
        };
        let mut item = item;
        if let (Some(children), Some(object)) = (
            current.get(FOLDER_ITEMS_KEY).cloned(),
            item.as_object_mut(),
        ) {
            object.insert(FOLDER_ITEMS_KEY.to_string(), children);
        }
        if *current == item {
            return Ok(false);
        }
        let categories_changed = current.get(CATEGORIES_KEY) != item.get(CATEGORIES_KEY);
        let literal_count = current
            .get(FOLDER_ITEMS_KEY)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let Some(slot) = self
            .object_at_mut(&folder_index)
            .and_then(|folder| folder.get_mut(FOLDER_ITEMS_KEY))
            .and_then(Value::as_array_mut)
            .and_then(|items| items.get_mut(position))
        else {
            return Ok(false);
        };
        *slot = item;
        self.cache.remove(index);
        if categories_changed {
            self.cache.evict_children_from(index, literal_count);
            self.changed_keys.insert(index.listener_key());
        }
        self.finish_change(&folder_index, write_changes_now)
    }

    /// Move the literal child at `from` to literal position `to` in the same
    /// folder. Cached projections of the moved node travel with it.
    pub fn move_menu_item(
        &mut self,
        from: &MenuIndex,
        to: usize,
        write_changes_now: bool,
    ) -> Result<bool> {
        let Some(position) = from.folder_index() else {
            return Ok(false);
        };
        let folder_index = from.parent_index();
        let literal_count = self
            .get_folder_size(&folder_index, false)
            .unwrap_or(0);
        if position >= literal_count || to >= literal_count {
            return Ok(false);
        }
        if position == to {
            return Ok(false);
        }
        let Some(items) = self
            .object_at_mut(&folder_index)
            .and_then(|folder| folder.get_mut(FOLDER_ITEMS_KEY))
            .and_then(Value::as_array_mut)
        else {
            return Ok(false);
        };
        let item = items.remove(position);
        items.insert(to, item);

        let moved = self.cache.detach_subtree(from);
        self.cache.shift(from, -1);
        let target = folder_index.child_index(to);
        self.cache.shift(&target, 1);
        self.cache.attach_subtree(&target, moved);
        log::debug!("Moved menu item {from} to {target}");
        self.finish_change(&folder_index, write_changes_now)
    }

    fn finish_change(&mut self, folder_index: &MenuIndex, write_changes_now: bool) -> Result<bool> {
        self.changed_keys.insert(FOLDER_ITEMS_KEY.to_string());
        self.changed_keys.insert(folder_index.listener_key());
        if write_changes_now {
            self.write_changes()?;
        }
        Ok(true)
    }

    /// Record that a desktop entry shown at `index` was saved to the catalog.
    /// When the save changed which folders list the entry, every cached
    /// category-derived node is dropped, since any folder's expansion may
    /// have shifted.
    pub(crate) fn entry_saved(&mut self, index: &MenuIndex, reshaped: bool) {
        self.cache.remove(index);
        if reshaped {
            self.cache.retain(|item| !item.is_category_entry());
        }
        self.changed_keys.insert(FOLDER_ITEMS_KEY.to_string());
        self.changed_keys.insert(index.parent_index().listener_key());
    }

    /// Write pending changes to the user's menu file.
    pub fn write_changes(&mut self) -> Result<()> {
        self.config.write_changes()
    }

    /// Keys changed since the last call, for notifying listeners once the
    /// write lock is released.
    pub fn take_changed_keys(&mut self) -> Vec<String> {
        std::mem::take(&mut self.changed_keys).into_iter().collect()
    }

    // -- Cache --------------------------------------------------------------

    /// Cache a projection under its own index.
    pub fn add_cached_menu_item(&mut self, item: MenuItemData) {
        let index = item.index().clone();
        self.cache.insert(index, item);
    }

    pub fn get_cached_menu_item(&self, index: &MenuIndex) -> Option<MenuItemData> {
        self.cache.get(index).cloned()
    }

    pub fn clear_menu_item_cache(&mut self) {
        self.cache.clear();
    }
}

impl Resource for AppJson {
    fn release(&mut self) {
        log::debug!("Releasing menu resource");
        self.config.release();
    }
}

/// Run `f` under the write lock, then notify listeners of whatever it changed
/// after the lock is gone.
pub(crate) fn modify<R>(
    resource: &SharedResource<AppJson>,
    f: impl FnOnce(&mut AppJson) -> R,
) -> R {
    let (result, keys) = {
        let mut app_json = resource.write();
        let result = f(&mut *app_json);
        (result, app_json.take_changed_keys())
    };
    resource.listeners().notify_all(keys.iter().map(String::as_str));
    result
}

/// Node equality ignoring the child lists, which may grow or shrink while a
/// projection of the node is held.
fn same_node(current: &Value, expected: &Value) -> bool {
    match (current, expected) {
        (Value::Object(current), Value::Object(expected)) => {
            let fields = |object: &'_ Map<String, Value>| {
                object
                    .iter()
                    .filter(|(key, _)| key.as_str() != FOLDER_ITEMS_KEY)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<std::collections::BTreeMap<_, _>>()
            };
            fields(current) == fields(expected)
        },
        _ => current == expected,
    }
}

/// Read a JSON array of strings, skipping non-string elements.
pub(crate) fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
