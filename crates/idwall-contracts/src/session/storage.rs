use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{Map, Value};

/// String-keyed JSON values backed by one JSON object file.
///
/// Writes merge only the keys this handle changed into whatever is on disk,
/// so separate handles on the same file keep each other's keys.
#[derive(Debug, Clone)]
pub struct KvStore {
    path: PathBuf,
    payload: Option<Map<String, Value>>,
    dirty_keys: Vec<String>,
}

impl KvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: None,
            dirty_keys: Vec::new(),
        }
    }

    /// Strict read: a missing file is empty, an unparseable one is an error.
    pub fn read_all(&self) -> anyhow::Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        let parsed: Value = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", self.path.display()))?;
        match parsed {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} does not hold a JSON object", self.path.display()),
        }
    }

    pub fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        let payload = self.ensure_loaded();
        if payload.get(key) == Some(&value) {
            return Ok(());
        }
        payload.insert(key.to_string(), value);
        if !self.dirty_keys.iter().any(|existing| existing == key) {
            self.dirty_keys.push(key.to_string());
        }
        self.flush()
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        if self.dirty_keys.is_empty() {
            return Ok(());
        }
        let Some(payload) = &self.payload else {
            return Ok(());
        };

        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        for key in &self.dirty_keys {
            if let Some(value) = payload.get(key) {
                on_disk.insert(key.clone(), value.clone());
            }
        }
        write_json_object(&self.path, &on_disk)?;
        self.payload = Some(on_disk);
        self.dirty_keys.clear();
        Ok(())
    }

    fn ensure_loaded(&mut self) -> &mut Map<String, Value> {
        let fresh = read_json_object(&self.path).unwrap_or_default();
        self.payload.insert(fresh)
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )
    .with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::KvStore;

    #[test]
    fn kv_store_basic() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut kv = KvStore::new(temp.path().join("storage.json"));
        kv.set("theme", json!("light"))?;
        kv.set("wallpaper-history", json!([{"url": "a"}]))?;
        let stored = kv.read_all()?;
        assert_eq!(stored.get("theme"), Some(&json!("light")));
        assert_eq!(stored.get("wallpaper-history"), Some(&json!([{"url": "a"}])));
        assert_eq!(stored.get("missing"), None);
        Ok(())
    }

    #[test]
    fn kv_store_merges_with_second_handle() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("storage.json");
        let mut kv_a = KvStore::new(&path);
        let mut kv_b = KvStore::new(&path);

        kv_a.set("a", json!(1))?;
        kv_b.set("b", json!(2))?;
        kv_a.set("c", json!(3))?;

        let reloaded = KvStore::new(&path).read_all()?;
        assert_eq!(reloaded.get("a"), Some(&json!(1)));
        assert_eq!(reloaded.get("b"), Some(&json!(2)));
        assert_eq!(reloaded.get("c"), Some(&json!(3)));
        Ok(())
    }

    #[test]
    fn kv_store_set_does_not_noop_on_stale_snapshot() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("storage.json");
        let mut kv_a = KvStore::new(&path);
        let mut kv_b = KvStore::new(&path);

        kv_a.set("theme", json!("dark"))?;
        kv_b.set("theme", json!("light"))?;
        kv_a.set("theme", json!("dark"))?;

        assert_eq!(KvStore::new(&path).read_all()?.get("theme"), Some(&json!("dark")));
        Ok(())
    }

    #[test]
    fn read_all_reports_corrupt_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("storage.json");
        std::fs::write(&path, "{not json")?;
        assert!(KvStore::new(&path).read_all().is_err());

        std::fs::write(&path, "[1, 2]")?;
        assert!(KvStore::new(&path).read_all().is_err());

        assert!(KvStore::new(temp.path().join("absent.json"))
            .read_all()?
            .is_empty());
        Ok(())
    }
}
