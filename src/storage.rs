use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

// Slot names
pub const TASKS_KEY: &str = "tasks";
pub const THEME_KEY: &str = "theme";

/// Overrides the data directory (used to isolate tests).
pub const DATA_DIR_ENV: &str = "TASKFEED_DATA_DIR";

/// Raw string slots. Implementations may fail; `Store` absorbs the failure.
pub trait Backend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, raw: &str) -> Result<()>;
}

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform data directory.
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "taskfeed", "taskfeed").map(|proj| proj.data_dir().to_path_buf())
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Runs `f` while holding an exclusive advisory lock next to `path`.
    pub fn with_lock<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("open lock file {}", lock_path.display()))?;
        lock_file.lock_exclusive()?;
        let result = f();
        let _ = FileExt::unlock(&lock_file);
        result
    }
}

impl Backend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        // Readers never create the lock file, so a read-only directory stays
        // readable. Without one there is no writer to wait for.
        let lock_file = OpenOptions::new()
            .read(true)
            .open(path.with_extension("lock"))
            .ok();
        if let Some(lock) = &lock_file
            && let Err(e) = lock.lock_shared()
        {
            debug!(key, error = %e, "shared lock unavailable, reading unlocked");
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()));
        if let Some(lock) = &lock_file {
            let _ = FileExt::unlock(lock);
        }
        Ok(Some(raw?))
    }

    fn save(&self, key: &str, raw: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("create data dir {}", self.dir.display()))?;
        }
        let path = self.slot_path(key);
        Self::with_lock(&path, || Self::atomic_write(&path, raw))
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.lock().ok()?.get(key).cloned()
    }

    pub fn put_raw(&self, key: &str, raw: &str) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(key.to_string(), raw.to_string());
        }
    }
}

impl Backend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn save(&self, key: &str, raw: &str) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        slots.insert(key.to_string(), raw.to_string());
        Ok(())
    }
}

/// Typed JSON slots over a `Backend`.
///
/// Reads never fail: a missing, unreadable or mis-shaped slot yields the
/// caller's default. Writes never fail either; the in-memory state stays
/// authoritative for the session and the error is only logged.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_shared(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.backend.load(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key, error = %e, "stored slot is malformed, using default");
                    default
                }
            },
            Ok(None) => {
                debug!(key, "slot is empty, using default");
                default
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read slot, using default");
                default
            }
        }
    }

    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize slot");
                return;
            }
        };
        if let Err(e) = self.backend.save(key, &raw) {
            warn!(key, error = %e, "failed to persist slot");
        }
    }
}
