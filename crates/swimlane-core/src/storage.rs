//! Key-value text slots used for session recovery.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

/// The well-known slots the session reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Last compiled, imported or saved BPMN XML
    Diagram,
    /// RFC 3339 time of the last explicit save
    DiagramTimestamp,
    /// Raw AI process JSON waiting to be compiled; consumed once
    PendingProcess,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Slot::Diagram => "bpmn-diagram",
            Slot::DiagramTimestamp => "bpmn-diagram-timestamp",
            Slot::PendingProcess => "bpmn-current-diagram",
        }
    }
}

pub trait SlotStore: Send + Sync {
    /// Read a slot. Absent slots are `Ok(None)`.
    fn get(&self, slot: Slot) -> Result<Option<String>>;
    fn set(&self, slot: Slot, value: &str) -> Result<()>;
    /// Clear a slot. No-op if absent.
    fn remove(&self, slot: Slot) -> Result<()>;
}

/// Resolve the global data directory (~/.swimlane/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".swimlane")
}

/// One file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    /// Store rooted at [`data_dir`].
    pub fn open_default() -> Self {
        FileStore::new(data_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.key())
    }
}

impl SlotStore for FileStore {
    fn get(&self, slot: Slot) -> Result<Option<String>> {
        match fs::read_to_string(self.path(slot)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write (temp file + rename) so a reader never sees a half-written slot.
    fn set(&self, slot: Slot, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{}.tmp", slot.key()));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(slot))?;
        Ok(())
    }

    fn remove(&self, slot: Slot) -> Result<()> {
        match fs::remove_file(self.path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<Slot, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, slot: Slot) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(&slot).cloned())
    }

    fn set(&self, slot: Slot, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(slot, value.to_string());
        Ok(())
    }

    fn remove(&self, slot: Slot) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(&slot);
        Ok(())
    }
}

impl<T: SlotStore + ?Sized> SlotStore for std::sync::Arc<T> {
    fn get(&self, slot: Slot) -> Result<Option<String>> {
        (**self).get(slot)
    }

    fn set(&self, slot: Slot, value: &str) -> Result<()> {
        (**self).set(slot, value)
    }

    fn remove(&self, slot: Slot) -> Result<()> {
        (**self).remove(slot)
    }
}
