//! Search and favorites filtering over the catalog

use crate::core::catalog::Catalog;
use crate::stores::FavoritesStore;

/// Characters stripped from titles and queries before matching
const INVISIBLE_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Result of applying a filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterView {
    /// Catalog indices shown in the list
    pub visible: Vec<usize>,
    /// Queue to install, `None` for the whole catalog
    pub queue: Option<Vec<usize>>,
}

/// Title search plus favorites-only toggle
#[derive(Debug, Clone, Default)]
pub struct LibraryFilter {
    query: String,
    favorites_only: bool,
    ignore_case: bool,
}

impl LibraryFilter {
    pub fn new(ignore_case: bool) -> Self {
        Self {
            ignore_case,
            ..Default::default()
        }
    }

    /// Trim, drop zero-width characters and fold case when enabled
    pub fn normalize(&self, text: &str) -> String {
        let cleaned: String = text
            .trim()
            .chars()
            .filter(|c| !INVISIBLE_CHARS.contains(c))
            .collect();

        if self.ignore_case {
            cleaned.to_lowercase()
        } else {
            cleaned
        }
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = self.normalize(query);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_favorites_only(&mut self, on: bool) {
        self.favorites_only = on;
    }

    pub fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    /// Whether a title passes the search
    pub fn matches(&self, title: &str) -> bool {
        self.query.is_empty() || self.normalize(title).contains(&self.query)
    }

    /// Compute visible rows; the queue follows them only in favorites-only mode
    pub fn apply(&self, catalog: &Catalog, favorites: &FavoritesStore) -> FilterView {
        let visible: Vec<usize> = catalog
            .iter()
            .enumerate()
            .filter(|(_, e)| self.matches(&e.id))
            .filter(|(_, e)| !self.favorites_only || favorites.contains(&e.id))
            .map(|(i, _)| i)
            .collect();

        let queue = if self.favorites_only {
            Some(visible.clone())
        } else {
            None
        };

        FilterView { visible, queue }
    }
}
