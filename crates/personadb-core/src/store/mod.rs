mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::serialize::{deserialize, serialize};
use serde::{Serialize, de::DeserializeOwned};
use std::cell::RefCell;
use thiserror::Error as ThisError;
use tracing::{error, warn};

///
/// BackendError
///

#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("backend io error on '{key}': {message}")]
    Io { key: String, message: String },

    #[error("invalid storage key: '{key}'")]
    InvalidKey { key: String },
}

///
/// StorageBackend
///
/// Host-provided durable key-value substrate: raw bytes under a string
/// key. No structure, no transactions, no iteration.
///

pub trait StorageBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), BackendError>;

    fn remove(&mut self, key: &str) -> Result<(), BackendError>;
}

///
/// Store
///
/// Defensive wrapper over a backend. Collection reads degrade to the
/// empty default on any failure; collection writes log and swallow
/// failures. Neither path propagates a storage error to callers.
///

pub struct Store {
    backend: RefCell<Box<dyn StorageBackend>>,
}

impl Store {
    #[must_use]
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend: RefCell::new(backend),
        }
    }

    /// Load a collection. Absent, unreadable, or corrupt data yields the
    /// empty collection.
    pub fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let bytes = match self.backend.borrow().read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key, %err, "collection read failed, using empty default");
                return Vec::new();
            }
        };

        match deserialize::<Vec<T>>(&bytes) {
            Ok(items) => items,
            Err(err) => {
                warn!(key, %err, "collection payload corrupt, using empty default");
                Vec::new()
            }
        }
    }

    /// Persist a collection. A failed write leaves the previously
    /// persisted state in place; the in-memory attempt does not survive
    /// the session.
    pub fn save_collection<T: Serialize>(&self, key: &str, items: &[T]) {
        let bytes = match serialize(&items) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(key, %err, "collection serialize failed, state will not persist");
                return;
            }
        };

        if let Err(err) = self.backend.borrow_mut().write(key, &bytes) {
            error!(key, %err, "collection write failed, state will not persist");
        }
    }

    /// Drop a persisted collection outright.
    pub(crate) fn remove(&self, key: &str) {
        if let Err(err) = self.backend.borrow_mut().remove(key) {
            warn!(key, %err, "collection remove failed");
        }
    }
}
