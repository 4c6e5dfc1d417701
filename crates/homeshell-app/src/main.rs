//! homeshell entry point.
//!
//! Loads the launcher configuration, opens the application menu and prints
//! the menu tree. The configuration path is taken from the first argument or
//! the `HOMESHELL_CONFIG` environment variable; without either the platform
//! defaults are used.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use homeshell_config::DiskStorage;
use homeshell_desktop::MemoryCatalog;
use homeshell_menu::{AppConfigFile, AppMenuOptions, MenuItemData};
use homeshell_types::config::LauncherConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HOMESHELL_CONFIG").ok())
        .map(PathBuf::from);
    let config = match config_path {
        Some(path) => LauncherConfig::from_file(&path)
            .with_context(|| format!("loading launcher config {}", path.display()))?,
        None => LauncherConfig::default(),
    };
    log::info!(
        "Starting homeshell (menu {}, defaults {})",
        config.app_menu_path().display(),
        config.default_app_menu_path().display(),
    );

    let menu = AppConfigFile::new(AppMenuOptions::from_config(
        &config,
        Arc::new(DiskStorage::new()),
        Arc::new(MemoryCatalog::new()),
    ));

    let root = menu.get_root_menu_item();
    for item in root.children() {
        print_item(&item, 0);
    }
    menu.write_changes().context("writing application menu")?;
    Ok(())
}

fn print_item(item: &MenuItemData, depth: usize) {
    let indent = "  ".repeat(depth);
    if item.is_folder() {
        println!("{indent}{}/", item.title());
        for child in item.children() {
            print_item(&child, depth + 1);
        }
    } else {
        println!("{indent}{}  [{}]", item.title(), item.command());
    }
}
