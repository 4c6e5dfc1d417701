//! Category lookups over installed desktop entries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use homeshell_types::error::{LauncherError, Result};

use crate::entry::DesktopEntry;

/// Category tag that matches every entry.
pub const ALL_CATEGORIES: &str = "All";

/// Source of installed applications.
pub trait DesktopEntryCatalog: Send + Sync {
    /// Look up one entry by desktop file id.
    fn entry(&self, id: &str) -> Option<DesktopEntry>;

    /// Displayed entries tagged with any of `categories`, in catalog order,
    /// each at most once.
    fn entries_in_categories(&self, categories: &[String]) -> Vec<DesktopEntry>;

    /// Rewrite an entry, e.g. after changing its hide flag.
    fn save_entry(&self, entry: &DesktopEntry) -> Result<()>;
}

/// An ordered, in-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<Vec<DesktopEntry>>,
    saves: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = DesktopEntry>) -> Self {
        let catalog = Self::new();
        for entry in entries {
            catalog.insert(entry);
        }
        catalog
    }

    /// Add an entry, replacing any entry with the same id in place.
    pub fn insert(&self, entry: DesktopEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful [`DesktopEntryCatalog::save_entry`] calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl DesktopEntryCatalog for MemoryCatalog {
    fn entry(&self, id: &str) -> Option<DesktopEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn entries_in_categories(&self, categories: &[String]) -> Vec<DesktopEntry> {
        let match_all = categories.iter().any(|c| c == ALL_CATEGORIES);
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.is_displayed())
            .filter(|e| match_all || categories.iter().any(|c| e.has_category(c)))
            .cloned()
            .collect()
    }

    fn save_entry(&self, entry: &DesktopEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let existing = entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| LauncherError::DesktopEntry(format!("no entry {}", entry.id)))?;
        *existing = entry.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        log::debug!("Saved desktop entry {}", entry.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::from_entries([
            DesktopEntry::new("chess.desktop", "Chess").with_categories(["Game", "BoardGame"]),
            DesktopEntry::new("term.desktop", "Terminal").with_categories(["System"]),
            DesktopEntry::new("solitaire.desktop", "Solitaire")
                .with_categories(["Game", "CardGame"]),
        ])
    }

    fn names(entries: &[DesktopEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn category_query_keeps_catalog_order() {
        let catalog = catalog();
        let games = catalog.entries_in_categories(&tags(&["Game"]));
        assert_eq!(names(&games), vec!["Chess", "Solitaire"]);
    }

    #[test]
    fn overlapping_tags_do_not_duplicate() {
        let catalog = catalog();
        let games = catalog.entries_in_categories(&tags(&["CardGame", "Game", "BoardGame"]));
        assert_eq!(names(&games), vec!["Chess", "Solitaire"]);
    }

    #[test]
    fn all_matches_everything() {
        let catalog = catalog();
        assert_eq!(catalog.entries_in_categories(&tags(&["All"])).len(), 3);
        assert!(catalog.entries_in_categories(&[]).is_empty());
    }

    #[test]
    fn hidden_entries_are_skipped() {
        let catalog = catalog();
        let mut chess = catalog.entry("chess.desktop").unwrap();
        chess.hidden = true;
        catalog.save_entry(&chess).unwrap();
        let games = catalog.entries_in_categories(&tags(&["Game"]));
        assert_eq!(names(&games), vec!["Solitaire"]);
        assert!(catalog.entry("chess.desktop").unwrap().hidden);
        assert_eq!(catalog.save_count(), 1);
    }

    #[test]
    fn saving_unknown_entry_fails() {
        let catalog = catalog();
        let err = catalog.save_entry(&DesktopEntry::new("nope.desktop", "Nope")).unwrap_err();
        assert!(matches!(err, LauncherError::DesktopEntry(_)));
        assert_eq!(catalog.save_count(), 0);
    }

    #[test]
    fn insert_replaces_same_id() {
        let catalog = catalog();
        catalog.insert(DesktopEntry::new("term.desktop", "XTerm"));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entry("term.desktop").unwrap().name, "XTerm");
    }
}
