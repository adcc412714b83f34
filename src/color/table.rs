//! A table of colors assigned to set paths.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::color::Color;
use crate::color::Theme;
use crate::path::Path;

/// A single path to color assignment.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Entry {
    /// The path, as it was written when the entry was added.
    pub path: Path,

    /// The assigned color.
    pub color: Color,
}

/// A table of colors keyed by the [normalized](Path::normalized) form of a
/// path.
///
/// Within a session, entries are only ever appended: adding a color for a
/// path that already has one keeps the original color. The single exception
/// is [`Table::assign()`], which is used when a user explicitly recolors a
/// node.
#[derive(Clone, Debug, Default)]
pub struct Table {
    /// The entries in insertion order.
    entries: Vec<Entry>,

    /// A lookup from normalized path to position in `entries`.
    lookup: HashMap<String, usize>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a color for `path` if the path does not already have one.
    ///
    /// Returns `true` if the entry was added.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::color::Color;
    /// use cellsets::color::Table;
    /// use cellsets::path::Path;
    ///
    /// let mut table = Table::new();
    /// let path = Path::try_new(["Leiden", "1"])?;
    ///
    /// assert!(table.insert(path.clone(), Color::new(10, 20, 30)));
    /// assert!(!table.insert(path.clone(), Color::new(0, 0, 0)));
    /// assert_eq!(table.get(&path), Some(Color::new(10, 20, 30)));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn insert(&mut self, path: Path, color: Color) -> bool {
        let key = path.normalized();

        if self.lookup.contains_key(&key) {
            return false;
        }

        self.lookup.insert(key, self.entries.len());
        self.entries.push(Entry { path, color });
        true
    }

    /// Sets the color for `path`, replacing any existing color.
    pub fn assign(&mut self, path: Path, color: Color) {
        match self.lookup.get(&path.normalized()) {
            Some(&i) => self.entries[i].color = color,
            None => {
                self.insert(path, color);
            }
        }
    }

    /// Gets the color explicitly assigned to `path`.
    pub fn get(&self, path: &Path) -> Option<Color> {
        self.get_normalized(&path.normalized())
    }

    /// Gets the color explicitly assigned to an already normalized path.
    pub fn get_normalized(&self, key: &str) -> Option<Color> {
        self.lookup.get(key).map(|&i| self.entries[i].color)
    }

    /// Gets the color for `path`, falling back to the theme's default color.
    pub fn resolve(&self, path: &Path, theme: Theme) -> Color {
        self.get(path).unwrap_or_else(|| theme.default_color())
    }

    /// Gets an iterator over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Gets the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lookup.clear();
    }
}

impl FromIterator<Entry> for Table {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut table = Table::new();

        for entry in iter {
            table.insert(entry.path, entry.color);
        }

        table
    }
}
