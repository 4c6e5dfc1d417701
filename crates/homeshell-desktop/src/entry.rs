//! The desktop-entry data contract.

use serde::{Deserialize, Serialize};

/// One installed application, as described by its desktop entry file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopEntry {
    /// Desktop file id, e.g. `org.gnome.Chess.desktop`.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    /// Raw `Exec` value, field codes included.
    #[serde(default)]
    pub exec: String,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub categories: Vec<String>,
    /// `NoDisplay` from the system file.
    #[serde(default)]
    pub no_display: bool,
    /// Hidden for the current user.
    #[serde(default)]
    pub hidden: bool,
}

impl DesktopEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_exec(mut self, exec: impl Into<String>) -> Self {
        self.exec = exec.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// Whether the entry belongs in application menus.
    pub fn is_displayed(&self) -> bool {
        !self.no_display && !self.hidden
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// The command line to run, with field codes expanded.
    ///
    /// File and URL codes and the deprecated codes are dropped, `%i` becomes
    /// `--icon <icon>`, `%c` the name, `%k` the desktop file id and `%%` a
    /// literal `%`. Returns an empty string if `Exec` holds an unknown code.
    pub fn launch_command(&self) -> String {
        let mut expanded = String::with_capacity(self.exec.len());
        let mut chars = self.exec.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                expanded.push(c);
                continue;
            }
            match chars.next() {
                Some('f' | 'F' | 'u' | 'U' | 'd' | 'D' | 'n' | 'N' | 'v' | 'm') => {},
                Some('i') => {
                    if !self.icon.is_empty() {
                        expanded.push_str("--icon ");
                        expanded.push_str(&self.icon);
                    }
                },
                Some('c') => expanded.push_str(&self.name),
                Some('k') => expanded.push_str(&self.id),
                Some('%') => expanded.push('%'),
                Some(code) => {
                    log::warn!("Invalid field code %{code} in {}", self.id);
                    return String::new();
                },
                None => expanded.push('%'),
            }
        }
        expanded.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
