//! Locked access to the shared menu tree.
//!
//! Every [`AppConfigFile`] made with [`AppConfigFile::new`] shares one
//! [`AppJson`] for the whole process. It is loaded when the first handle is
//! created and released, with a final write, when the last handle drops.
//! A handle opened while that write runs waits for it to finish.
//! Queries take the read lock, mutations the write lock, and listeners are
//! notified only after the lock is released.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use homeshell_config::{
    AlertSink, ConfigJson, ConfigStorage, ListenerRegistry, ResourceHandle, ResourceSlot,
    SharedResource, Subscription,
};
use homeshell_desktop::DesktopEntryCatalog;
use homeshell_types::config::LauncherConfig;
use homeshell_types::error::Result;

use crate::app_json::{self, AppJson};
use crate::index::MenuIndex;
use crate::item::{MenuItemData, NewMenuItem};

static APP_JSON: ResourceSlot<AppJson> = ResourceSlot::new();

/// What the menu resource needs when it is first created.
#[derive(Clone)]
pub struct AppMenuOptions {
    storage: Arc<dyn ConfigStorage>,
    config_path: PathBuf,
    default_path: PathBuf,
    catalog: Arc<dyn DesktopEntryCatalog>,
    alerts: Option<Arc<dyn AlertSink>>,
}

impl AppMenuOptions {
    pub fn new(
        storage: Arc<dyn ConfigStorage>,
        config_path: impl Into<PathBuf>,
        default_path: impl Into<PathBuf>,
        catalog: Arc<dyn DesktopEntryCatalog>,
    ) -> Self {
        Self {
            storage,
            config_path: config_path.into(),
            default_path: default_path.into(),
            catalog,
            alerts: None,
        }
    }

    /// Options for the menu file named by a launcher configuration.
    pub fn from_config(
        config: &LauncherConfig,
        storage: Arc<dyn ConfigStorage>,
        catalog: Arc<dyn DesktopEntryCatalog>,
    ) -> Self {
        Self::new(
            storage,
            config.app_menu_path(),
            config.default_app_menu_path(),
            catalog,
        )
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    fn build(self, handle: Weak<SharedResource<AppJson>>) -> AppJson {
        log::info!("Loading application menu from {}", self.config_path.display());
        let mut config = ConfigJson::new(
            self.storage,
            self.config_path,
            self.default_path,
            AppJson::config_keys(),
        );
        if let Some(alerts) = self.alerts {
            config = config.with_alerts(alerts);
        }
        AppJson::new(config, self.catalog, handle)
    }
}

/// Handle to the application menu.
#[derive(Clone)]
pub struct AppConfigFile {
    resource: ResourceHandle<AppJson>,
}

impl std::fmt::Debug for AppConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfigFile")
            .field("handles", &self.resource.handle_count())
            .finish()
    }
}

impl AppConfigFile {
    /// Open the process-wide menu. `options` are only used if the menu is not
    /// already loaded.
    pub fn new(options: AppMenuOptions) -> Self {
        Self::from_slot(&APP_JSON, options)
    }

    /// Open the menu held in `slot` instead of the process-wide one.
    pub fn from_slot(slot: &ResourceSlot<AppJson>, options: AppMenuOptions) -> Self {
        Self {
            resource: slot.acquire_with(|handle| options.build(handle)),
        }
    }

    // -- Queries ------------------------------------------------------------

    pub fn get_root_menu_item(&self) -> MenuItemData {
        self.resource.read().get_root_menu_item()
    }

    pub fn get_menu_item(&self, index: &MenuIndex) -> Option<MenuItemData> {
        self.resource.read().get_menu_item(index)
    }

    /// Children of a folder, literal items first. Empty for invalid indices.
    pub fn get_menu_items(&self, folder_index: &MenuIndex) -> Vec<MenuItemData> {
        self.resource.read().get_menu_items(folder_index)
    }

    /// Child count of a folder, or `None` if there is no folder there.
    pub fn get_folder_size(
        &self,
        folder_index: &MenuIndex,
        include_desktop_entries: bool,
    ) -> Option<usize> {
        self.resource
            .read()
            .get_folder_size(folder_index, include_desktop_entries)
    }

    // -- Mutations ----------------------------------------------------------

    /// Create a node at `index`. See [`AppJson::add_menu_item`].
    pub fn add_menu_item(
        &self,
        item: &NewMenuItem,
        index: &MenuIndex,
        write_changes_now: bool,
    ) -> Result<bool> {
        let json = item.to_json();
        app_json::modify(&self.resource, |app_json| {
            app_json.add_menu_item(json, index, write_changes_now)
        })
    }

    /// Insert a copy of an existing projection at `index`.
    pub fn insert_menu_item_data(
        &self,
        item: &MenuItemData,
        index: &MenuIndex,
        write_changes_now: bool,
    ) -> Result<bool> {
        let json = item.to_json();
        app_json::modify(&self.resource, |app_json| {
            app_json.add_menu_item(json, index, write_changes_now)
        })
    }

    pub fn remove_menu_item(&self, index: &MenuIndex, write_changes_now: bool) -> Result<bool> {
        app_json::modify(&self.resource, |app_json| {
            app_json.remove_menu_item(index, write_changes_now)
        })
    }

    /// Write any unsaved menu changes.
    pub fn write_changes(&self) -> Result<()> {
        self.resource.write().write_changes()
    }

    // -- Cache --------------------------------------------------------------

    pub fn add_cached_menu_item(&self, item: MenuItemData) {
        self.resource.write().add_cached_menu_item(item);
    }

    pub fn get_cached_menu_item(&self, index: &MenuIndex) -> Option<MenuItemData> {
        self.resource.read().get_cached_menu_item(index)
    }

    pub fn clear_menu_item_cache(&self) {
        self.resource.write().clear_menu_item_cache();
    }

    // -- Listeners ----------------------------------------------------------

    /// Call `callback` whenever one of `keys` changes. Use
    /// [`FOLDER_ITEMS_KEY`](crate::FOLDER_ITEMS_KEY) for any change to the
    /// tree, or [`MenuIndex::listener_key`] for one folder.
    pub fn subscribe<I, S>(
        &self,
        keys: I,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource.listeners().subscribe(keys, callback)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        self.resource.listeners()
    }
}
