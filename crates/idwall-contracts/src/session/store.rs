use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::entries::{FavoriteEntry, GenerationEntry, Theme};
use super::storage::KvStore;

pub const STORAGE_FILE_NAME: &str = "storage.json";
pub const HISTORY_KEY: &str = "wallpaper-history";
pub const FAVORITES_KEY: &str = "wallpaper-favorites";
pub const THEME_KEY: &str = "theme";
pub const HISTORY_LIMIT: usize = 20;

/// History, favorites and theme, rehydrated once on open and written through
/// on every mutation.
#[derive(Debug)]
pub struct SessionStore {
    kv: KvStore,
    history: Vec<GenerationEntry>,
    favorites: Vec<FavoriteEntry>,
    theme: Theme,
    load_warnings: Vec<String>,
}

impl SessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let kv = KvStore::new(path);
        let mut load_warnings = Vec::new();
        let mut recovered = Vec::new();
        let snapshot = match kv.read_all() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                load_warnings.push(format!("{err:#}; starting from empty state"));
                recovered.extend([HISTORY_KEY, FAVORITES_KEY, THEME_KEY]);
                Map::new()
            }
        };

        let history: Vec<GenerationEntry> =
            decode_key(&snapshot, HISTORY_KEY, &mut load_warnings, &mut recovered);
        let favorites = decode_key(&snapshot, FAVORITES_KEY, &mut load_warnings, &mut recovered);
        let theme = decode_key(&snapshot, THEME_KEY, &mut load_warnings, &mut recovered);

        let mut store = Self {
            kv,
            history,
            favorites,
            theme,
            load_warnings,
        };
        if store.history.len() > HISTORY_LIMIT {
            store.history.truncate(HISTORY_LIMIT);
        }
        // Recovered keys are written back so the next open reads clean state.
        for key in recovered {
            if let Err(err) = store.persist(key) {
                store
                    .load_warnings
                    .push(format!("could not rewrite '{key}': {err:#}"));
            }
        }
        store
    }

    pub fn history(&self) -> &[GenerationEntry] {
        &self.history
    }

    pub fn favorites(&self) -> &[FavoriteEntry] {
        &self.favorites
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Problems found while rehydrating; each one fell back to a default.
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    pub fn record_generation(&mut self, entry: GenerationEntry) -> anyhow::Result<()> {
        self.history.insert(0, entry);
        self.history.truncate(HISTORY_LIMIT);
        self.persist(HISTORY_KEY)
    }

    /// No uniqueness check here; callers gate on [`SessionStore::is_favorite`].
    pub fn add_favorite(&mut self, entry: FavoriteEntry) -> anyhow::Result<()> {
        self.favorites.insert(0, entry);
        self.persist(FAVORITES_KEY)
    }

    /// Removes every favorite stamped `timestamp`; returns how many went.
    pub fn remove_favorite(&mut self, timestamp: i64) -> anyhow::Result<usize> {
        let before = self.favorites.len();
        self.favorites.retain(|favorite| favorite.timestamp != timestamp);
        let removed = before - self.favorites.len();
        if removed > 0 {
            self.persist(FAVORITES_KEY)?;
        }
        Ok(removed)
    }

    pub fn clear_history(&mut self) -> anyhow::Result<usize> {
        let removed = self.history.len();
        self.history.clear();
        self.persist(HISTORY_KEY)?;
        Ok(removed)
    }

    pub fn is_favorite(&self, url: &str) -> bool {
        self.favorites.iter().any(|favorite| favorite.url == url)
    }

    pub fn set_theme(&mut self, theme: Theme) -> anyhow::Result<()> {
        self.theme = theme;
        self.persist(THEME_KEY)
    }

    pub fn toggle_theme(&mut self) -> anyhow::Result<Theme> {
        let next = self.theme.toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    fn persist(&mut self, key: &str) -> anyhow::Result<()> {
        let value = match key {
            HISTORY_KEY => serde_json::to_value(&self.history)?,
            FAVORITES_KEY => serde_json::to_value(&self.favorites)?,
            THEME_KEY => serde_json::to_value(self.theme)?,
            other => anyhow::bail!("unknown storage key '{other}'"),
        };
        self.kv.set(key, value)
    }
}

fn decode_key<T: DeserializeOwned + Default>(
    snapshot: &Map<String, Value>,
    key: &'static str,
    warnings: &mut Vec<String>,
    recovered: &mut Vec<&'static str>,
) -> T {
    let Some(value) = snapshot.get(key) else {
        return T::default();
    };
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => decoded,
        Err(err) => {
            warnings.push(format!("stored '{key}' could not be decoded ({err}); using default"));
            recovered.push(key);
            T::default()
        }
    }
}
