use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

/// Key under which the minimal cart is persisted.
pub const CART_KEY: &str = "grantcart/cart";

/// Opaque string store. The cart never interprets anything beyond its own key.
pub trait CartPersistence: Send + Sync + 'static {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    kv: parking_lot::RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw value, bypassing the cart (useful to simulate stale data).
    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let store = Self::default();
        store.kv.write().insert(key.to_string(), value.into());
        store
    }
}

impl CartPersistence for InMemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.kv.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.kv.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk mapping keys to blobs. Writes go through a temp file
/// and a rename so a crash never leaves a half-written document.
pub struct FileStore {
    path: PathBuf,
    lock: parking_lot::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: parking_lot::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).with_context(|| format!("parse {}", self.path.display()))
    }
}

impl CartPersistence for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock();
        // A corrupt document is replaced rather than blocking every write.
        let mut all = self.read_all().unwrap_or_default();
        all.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut file =
                fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            file.write_all(serde_json::to_string_pretty(&all)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}
