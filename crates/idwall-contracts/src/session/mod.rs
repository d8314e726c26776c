mod entries;
mod storage;
mod store;

pub use entries::{FavoriteEntry, GenerationEntry, Theme};
pub use storage::KvStore;
pub use store::{
    SessionStore, FAVORITES_KEY, HISTORY_KEY, HISTORY_LIMIT, STORAGE_FILE_NAME, THEME_KEY,
};
