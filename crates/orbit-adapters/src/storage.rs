//! Key-value storage with two areas: keys prefixed `session:` live for the
//! current process only, everything else is durable.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use orbit_core::{KeyValuePort, PortError};
use serde::{Deserialize, Serialize};

const SESSION_PREFIX: &str = "session:";
const STORAGE_FILE_VERSION: u32 = 1;

fn is_session_key(key: &str) -> bool {
    key.starts_with(SESSION_PREFIX)
}

#[derive(Debug, Default)]
struct Areas {
    durable: BTreeMap<String, String>,
    session: BTreeMap<String, String>,
}

impl Areas {
    fn area(&mut self, key: &str) -> &mut BTreeMap<String, String> {
        if is_session_key(key) {
            &mut self.session
        } else {
            &mut self.durable
        }
    }
}

fn lock_areas(areas: &Mutex<Areas>) -> Result<MutexGuard<'_, Areas>, PortError> {
    areas
        .lock()
        .map_err(|e| PortError::Transport(format!("storage lock poisoned: {e}")))
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorageAdapter {
    areas: Arc<Mutex<Areas>>,
}

impl MemoryStorageAdapter {
    /// Simulates a browser restart: the session area is wiped.
    pub fn restart(&self) -> Result<(), PortError> {
        lock_areas(&self.areas)?.session.clear();
        Ok(())
    }
}

impl KeyValuePort for MemoryStorageAdapter {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(lock_areas(&self.areas)?.area(key).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        lock_areas(&self.areas)?
            .area(key)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), PortError> {
        lock_areas(&self.areas)?.area(key).remove(key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    items: BTreeMap<String, String>,
}

/// Durable area persisted as one JSON file, rewritten on every mutation.
/// The session area is held in memory and starts empty on every open.
#[derive(Debug, Clone)]
pub struct FileStorageAdapter {
    path: PathBuf,
    areas: Arc<Mutex<Areas>>,
}

impl FileStorageAdapter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PortError> {
        let path = path.into();
        let durable = match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: StorageFile = serde_json::from_str(&raw).map_err(|e| {
                    PortError::Storage(format!("{} is not a storage file: {e}", path.display()))
                })?;
                if file.version != STORAGE_FILE_VERSION {
                    return Err(PortError::Storage(format!(
                        "unsupported storage file version {}",
                        file.version
                    )));
                }
                file.items
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(PortError::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        tracing::info!(path = %path.display(), keys = durable.len(), "opened storage");
        Ok(Self {
            path,
            areas: Arc::new(Mutex::new(Areas {
                durable,
                session: BTreeMap::new(),
            })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, durable: &BTreeMap<String, String>) -> Result<(), PortError> {
        let file = StorageFile {
            version: STORAGE_FILE_VERSION,
            items: durable.clone(),
        };
        let raw = serde_json::to_string_pretty(&file)
            .map_err(|e| PortError::Validation(format!("storage serialization failed: {e}")))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, raw)
            .and_then(|_| fs::rename(&staging, &self.path))
            .map_err(|e| {
                PortError::Storage(format!("failed to write {}: {e}", self.path.display()))
            })
    }

    fn mutate(
        &self,
        key: &str,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), PortError> {
        let mut areas = lock_areas(&self.areas)?;
        if is_session_key(key) {
            apply(&mut areas.session);
            return Ok(());
        }
        let mut next = areas.durable.clone();
        apply(&mut next);
        self.persist(&next)?;
        areas.durable = next;
        Ok(())
    }
}

impl KeyValuePort for FileStorageAdapter {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(lock_areas(&self.areas)?.area(key).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError> {
        self.mutate(key, |area| {
            area.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), PortError> {
        self.mutate(key, |area| {
            area.remove(key);
        })
    }
}
