//! Menu node projections.
//!
//! A [`MenuItemData`] is a value-like snapshot of one node, built on demand
//! from the menu document or the desktop-entry catalog. Editing a projection
//! only changes the snapshot; [`MenuItemData::update_source`] writes it back
//! and [`MenuItemData::delete_from_source`] removes the node's data.
//!
//! Do not call the methods that consult the tree (folder size, children,
//! moving, saving) while holding a lock on the menu resource.

mod config_item;
mod desktop_item;

pub use config_item::ConfigItemData;
pub use desktop_item::{DesktopEntryItemData, EntryOrigin};

use serde_json::{Map, Value};

use homeshell_types::error::Result;

use crate::app_json::{
    AppJsonHandle, CATEGORIES_KEY, COMMAND_KEY, FOLDER_ITEMS_KEY, ICON_KEY, LAUNCH_IN_TERM_KEY,
    TITLE_KEY,
};
use crate::cache::Indexed;
use crate::index::MenuIndex;

/// Editable fields of a menu node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataField {
    Title,
    Icon,
    Command,
    Categories,
    TermLaunchOption,
}

/// Where a projection stands relative to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemState {
    #[default]
    Unmodified,
    /// Edited in memory, not yet written back.
    Edited,
    Saved,
    /// Removed from its source. Terminal.
    Deleted,
}

impl ItemState {
    fn edit(&mut self) {
        if *self != Self::Deleted {
            *self = Self::Edited;
        }
    }
}

/// One node of the menu tree.
#[derive(Debug, Clone)]
pub enum MenuItemData {
    /// A node stored as a JSON object in the menu file.
    Config(ConfigItemData),
    /// A node backed by a desktop entry, either referenced by id in the menu
    /// file or pulled in by a folder's categories.
    DesktopEntry(DesktopEntryItemData),
}

impl MenuItemData {
    pub fn index(&self) -> &MenuIndex {
        match self {
            Self::Config(item) => item.index(),
            Self::DesktopEntry(item) => item.index(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Config(item) => item.title(),
            Self::DesktopEntry(item) => item.entry().name.clone(),
        }
    }

    pub fn icon_name(&self) -> String {
        match self {
            Self::Config(item) => item.icon_name(),
            Self::DesktopEntry(item) => item.entry().icon.clone(),
        }
    }

    /// Launch command. Empty for folders.
    pub fn command(&self) -> String {
        match self {
            Self::Config(item) => item.command(),
            Self::DesktopEntry(item) => item.entry().launch_command(),
        }
    }

    pub fn categories(&self) -> Vec<String> {
        match self {
            Self::Config(item) => item.categories(),
            Self::DesktopEntry(item) => item.entry().categories.clone(),
        }
    }

    pub fn launched_in_term(&self) -> bool {
        match self {
            Self::Config(item) => item.launched_in_term(),
            Self::DesktopEntry(item) => item.entry().terminal,
        }
    }

    /// Whether the node was pulled in by its folder's categories rather than
    /// stored in the menu file.
    pub(crate) fn is_category_entry(&self) -> bool {
        matches!(self, Self::DesktopEntry(item) if item.origin() == EntryOrigin::Category)
    }

    /// Whether `field` may be changed on this node.
    ///
    /// Config folders take categories but no command or terminal flag;
    /// config shortcuts the reverse. Desktop-entry nodes take everything
    /// since their edits go to the entry, not the menu. The root has nowhere
    /// to be written back to, so nothing on it is editable.
    pub fn is_editable(&self, field: DataField) -> bool {
        if self.index().is_root() {
            return false;
        }
        match self {
            Self::Config(item) => match field {
                DataField::Title | DataField::Icon => true,
                DataField::Categories => item.is_folder(),
                DataField::Command | DataField::TermLaunchOption => !item.is_folder(),
            },
            Self::DesktopEntry(_) => true,
        }
    }

    /// Whether this node opens a folder rather than launching something.
    pub fn is_folder(&self) -> bool {
        match self {
            Self::Config(item) => item.is_folder(),
            Self::DesktopEntry(_) => false,
        }
    }

    // -- Setters ------------------------------------------------------------
    //
    // Each returns whether the projection changed. Fields that are not
    // editable are left alone.

    pub fn set_title(&mut self, title: &str) -> bool {
        if !self.is_editable(DataField::Title) {
            return false;
        }
        match self {
            Self::Config(item) => item.set_field(TITLE_KEY, Value::from(title)),
            Self::DesktopEntry(item) => {
                item.edit(|entry| set_if_changed(&mut entry.name, title.to_string()))
            },
        }
    }

    pub fn set_icon_name(&mut self, icon: &str) -> bool {
        if !self.is_editable(DataField::Icon) {
            return false;
        }
        match self {
            Self::Config(item) => item.set_field(ICON_KEY, Value::from(icon)),
            Self::DesktopEntry(item) => {
                item.edit(|entry| set_if_changed(&mut entry.icon, icon.to_string()))
            },
        }
    }

    pub fn set_command(&mut self, command: &str) -> bool {
        if !self.is_editable(DataField::Command) {
            return false;
        }
        match self {
            Self::Config(item) => item.set_field(COMMAND_KEY, Value::from(command)),
            Self::DesktopEntry(item) => {
                item.edit(|entry| set_if_changed(&mut entry.exec, command.to_string()))
            },
        }
    }

    pub fn set_categories(&mut self, categories: &[String]) -> bool {
        if !self.is_editable(DataField::Categories) {
            return false;
        }
        match self {
            Self::Config(item) => {
                item.set_field(CATEGORIES_KEY, Value::from(categories.to_vec()))
            },
            Self::DesktopEntry(item) => {
                item.edit(|entry| set_if_changed(&mut entry.categories, categories.to_vec()))
            },
        }
    }

    pub fn set_launched_in_term(&mut self, launch_in_terminal: bool) -> bool {
        if !self.is_editable(DataField::TermLaunchOption) {
            return false;
        }
        match self {
            Self::Config(item) => {
                item.set_field(LAUNCH_IN_TERM_KEY, Value::from(launch_in_terminal))
            },
            Self::DesktopEntry(item) => {
                item.edit(|entry| set_if_changed(&mut entry.terminal, launch_in_terminal))
            },
        }
    }

    // -- State --------------------------------------------------------------

    pub fn state(&self) -> ItemState {
        match self {
            Self::Config(item) => item.state(),
            Self::DesktopEntry(item) => item.state(),
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        self.state() == ItemState::Edited
    }

    pub fn is_deleted(&self) -> bool {
        self.state() == ItemState::Deleted
    }

    /// JSON that would be stored for this node if it were inserted into the
    /// menu: the object for config nodes, the desktop file id otherwise.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Config(item) => Value::Object(item.json().clone()),
            Self::DesktopEntry(item) => Value::String(item.entry().id.clone()),
        }
    }

    // -- Source -------------------------------------------------------------

    /// Write pending edits back to where the node came from. Does nothing
    /// without pending edits.
    pub fn update_source(&mut self) -> Result<bool> {
        match self {
            Self::Config(item) => item.update_source(),
            Self::DesktopEntry(item) => item.update_source(),
        }
    }

    /// Remove the node's data from its source.
    pub fn delete_from_source(&mut self) -> Result<bool> {
        match self {
            Self::Config(item) => item.delete_from_source(),
            Self::DesktopEntry(item) => item.delete_from_source(),
        }
    }

    /// Whether the node can move by `offset` within its folder's reorderable
    /// children. Desktop-entry nodes never move.
    pub fn can_move_index(&self, offset: isize) -> bool {
        match self {
            Self::Config(item) => item.can_move_index(offset),
            Self::DesktopEntry(_) => false,
        }
    }

    /// Move the node by `offset` within its folder.
    pub fn move_index(&mut self, offset: isize) -> Result<bool> {
        match self {
            Self::Config(item) => item.move_index(offset),
            Self::DesktopEntry(_) => Ok(false),
        }
    }

    // -- Folder -------------------------------------------------------------

    /// Number of children including category entries. Zero for shortcuts.
    pub fn folder_size(&self) -> usize {
        match self {
            Self::Config(item) => item.folder_size(true),
            Self::DesktopEntry(_) => 0,
        }
    }

    /// Number of leading children that can be reordered.
    pub fn movable_child_count(&self) -> usize {
        match self {
            Self::Config(item) => item.folder_size(false),
            Self::DesktopEntry(_) => 0,
        }
    }

    pub fn child(&self, n: usize) -> Option<MenuItemData> {
        match self {
            Self::Config(item) => item.child(n),
            Self::DesktopEntry(_) => None,
        }
    }

    pub fn children(&self) -> Vec<MenuItemData> {
        match self {
            Self::Config(item) => item.children(),
            Self::DesktopEntry(_) => Vec::new(),
        }
    }
}

impl Indexed for MenuItemData {
    fn set_index(&mut self, index: MenuIndex) {
        match self {
            Self::Config(item) => item.set_index(index),
            Self::DesktopEntry(item) => item.set_index(index),
        }
    }
}

fn set_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A node to create with [`AppConfigFile::add_menu_item`](crate::AppConfigFile::add_menu_item).
#[derive(Debug, Clone, PartialEq)]
pub enum NewMenuItem {
    Shortcut {
        title: String,
        icon: String,
        command: String,
        launch_in_terminal: bool,
    },
    Folder {
        title: String,
        icon: String,
        categories: Vec<String>,
    },
    /// A reference to an installed application by desktop file id.
    DesktopEntry { id: String },
}

impl NewMenuItem {
    pub fn shortcut(
        title: impl Into<String>,
        icon: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self::Shortcut {
            title: title.into(),
            icon: icon.into(),
            command: command.into(),
            launch_in_terminal: false,
        }
    }

    pub fn folder<I, S>(title: impl Into<String>, icon: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Folder {
            title: title.into(),
            icon: icon.into(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// The JSON stored in the menu file for this node.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Shortcut {
                title,
                icon,
                command,
                launch_in_terminal,
            } => {
                let mut object = Map::new();
                object.insert(TITLE_KEY.into(), Value::from(title.as_str()));
                object.insert(ICON_KEY.into(), Value::from(icon.as_str()));
                object.insert(COMMAND_KEY.into(), Value::from(command.as_str()));
                object.insert(LAUNCH_IN_TERM_KEY.into(), Value::from(*launch_in_terminal));
                Value::Object(object)
            },
            Self::Folder {
                title,
                icon,
                categories,
            } => {
                let mut object = Map::new();
                object.insert(TITLE_KEY.into(), Value::from(title.as_str()));
                object.insert(ICON_KEY.into(), Value::from(icon.as_str()));
                object.insert(CATEGORIES_KEY.into(), Value::from(categories.clone()));
                object.insert(FOLDER_ITEMS_KEY.into(), Value::Array(Vec::new()));
                Value::Object(object)
            },
            Self::DesktopEntry { id } => Value::String(id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};

    use homeshell_desktop::{DesktopEntry, MemoryCatalog};
    use serde_json::json;

    use super::*;

    fn config(json: Value) -> MenuItemData {
        let Value::Object(object) = json else {
            panic!("test data must be an object");
        };
        MenuItemData::Config(ConfigItemData::new(object, MenuIndex::new([0]), AppJsonHandle::new()))
    }

    fn desktop() -> MenuItemData {
        let entry = DesktopEntry::new("chess.desktop", "Chess")
            .with_icon("chess")
            .with_exec("gnome-chess %U")
            .with_categories(["Game"]);
        MenuItemData::DesktopEntry(DesktopEntryItemData::new(
            entry,
            MenuIndex::new([1, 0]),
            EntryOrigin::Category,
            Arc::new(MemoryCatalog::new()),
            Weak::new(),
        ))
    }

    #[test]
    fn config_accessors_default_when_missing() {
        let item = config(json!({}));
        assert_eq!(item.title(), "");
        assert_eq!(item.icon_name(), "");
        assert_eq!(item.command(), "");
        assert!(item.categories().is_empty());
        assert!(!item.launched_in_term());
    }

    #[test]
    fn config_accessors_ignore_wrong_types() {
        let item = config(json!({"name": 4, "launch in terminal": "yes", "categories": ["A", 1]}));
        assert_eq!(item.title(), "");
        assert!(!item.launched_in_term());
        assert_eq!(item.categories(), vec!["A"]);
    }

    #[test]
    fn folder_discrimination() {
        assert!(config(json!({"folder items": [{"name": "x"}]})).is_folder());
        assert!(config(json!({"categories": ["Game"]})).is_folder());
        assert!(!config(json!({"command": "xterm"})).is_folder());
        assert!(!config(json!({"categories": [], "folder items": []})).is_folder());
        assert!(!desktop().is_folder());
    }

    #[test]
    fn editability_rules() {
        let folder = config(json!({"categories": ["Game"]}));
        assert!(folder.is_editable(DataField::Categories));
        assert!(!folder.is_editable(DataField::Command));
        assert!(!folder.is_editable(DataField::TermLaunchOption));
        assert!(folder.is_editable(DataField::Title));

        let shortcut = config(json!({"command": "xterm"}));
        assert!(!shortcut.is_editable(DataField::Categories));
        assert!(shortcut.is_editable(DataField::Command));
        assert!(shortcut.is_editable(DataField::Icon));

        let entry = desktop();
        for field in [
            DataField::Title,
            DataField::Icon,
            DataField::Command,
            DataField::Categories,
            DataField::TermLaunchOption,
        ] {
            assert!(entry.is_editable(field));
        }
    }

    #[test]
    fn setters_respect_editability() {
        let mut folder = config(json!({"name": "Games", "categories": ["Game"]}));
        assert!(!folder.set_command("rm -rf /"));
        assert!(!folder.set_launched_in_term(true));
        assert_eq!(folder.state(), ItemState::Unmodified);
        assert!(folder.set_categories(&["Game".to_string(), "Puzzle".to_string()]));
        assert!(folder.has_pending_changes());
        assert_eq!(folder.categories(), vec!["Game", "Puzzle"]);

        let mut shortcut = config(json!({"name": "Term", "command": "xterm"}));
        assert!(!shortcut.set_categories(&["Game".to_string()]));
        assert!(shortcut.set_launched_in_term(true));
        assert!(shortcut.launched_in_term());
    }

    #[test]
    fn setting_same_value_is_not_an_edit() {
        let mut item = config(json!({"name": "Term"}));
        assert!(!item.set_title("Term"));
        assert!(!item.has_pending_changes());
        assert!(item.set_icon_name("utilities-terminal"));
        assert_eq!(item.icon_name(), "utilities-terminal");
        assert!(item.has_pending_changes());
    }

    #[test]
    fn desktop_entry_fields() {
        let mut item = desktop();
        assert_eq!(item.title(), "Chess");
        assert_eq!(item.command(), "gnome-chess");
        assert_eq!(item.to_json(), json!("chess.desktop"));
        assert!(item.set_command("gnome-chess --fullscreen"));
        assert_eq!(item.command(), "gnome-chess --fullscreen");
        assert!(item.has_pending_changes());
    }

    #[test]
    fn desktop_entries_never_move() {
        let mut item = desktop();
        assert!(!item.can_move_index(0));
        assert!(!item.move_index(1).unwrap());
        assert_eq!(item.folder_size(), 0);
        assert!(item.children().is_empty());
    }

    #[test]
    fn detached_projection_degrades_gracefully() {
        let mut item = config(json!({"name": "A", "folder items": [{"name": "B"}]}));
        assert_eq!(item.folder_size(), 0);
        assert!(item.child(0).is_none());
        assert!(!item.can_move_index(1));
        item.set_title("C");
        assert!(!item.update_source().unwrap());
        assert!(!item.delete_from_source().unwrap());
    }

    #[test]
    fn new_menu_item_json() {
        assert_eq!(
            NewMenuItem::shortcut("Terminal", "term", "xterm").to_json(),
            json!({
                "name": "Terminal",
                "icon": "term",
                "command": "xterm",
                "launch in terminal": false,
            })
        );
        assert_eq!(
            NewMenuItem::folder("Games", "games", ["Game"]).to_json(),
            json!({"name": "Games", "icon": "games", "categories": ["Game"], "folder items": []})
        );
        assert_eq!(
            NewMenuItem::DesktopEntry { id: "chess.desktop".into() }.to_json(),
            json!("chess.desktop")
        );
    }
}
