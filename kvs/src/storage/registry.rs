use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use tokio::sync::Mutex;

use crate::codec::Codec;
use crate::crypto::Encryptor;
use crate::error::{Error, KvResult};
use crate::storage::PersistentCell;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Process-wide map from store file path to its one [`PersistentCell`].
///
/// Every caller asking for the same path is served the same cell, so a file
/// has exactly one owner within the process and all handles share one
/// snapshot stream. Lookups take only a read lock; construction is
/// serialized by a build mutex with a re-check, so concurrent first opens of
/// the same store build the cell once.
pub struct Registry {
    /// Cells are heterogeneous over their state type, so they are stored
    /// type-erased and downcast on lookup.
    cells: RwLock<HashMap<PathBuf, Arc<dyn Any + Send + Sync>>>,

    build_lock: Mutex<()>,
}

impl Registry {
    fn new() -> Self {
        Registry { cells: RwLock::new(HashMap::new()), build_lock: Mutex::new(()) }
    }

    /// The process-wide registry instance.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Returns the cell for `path`, creating it on first request. The codec
    /// and encryptor are only used when the cell is actually built; later
    /// callers share the original cell regardless of what they pass.
    pub async fn open_cell<T>(
        &self,
        path: PathBuf,
        codec: Box<dyn Codec<T>>,
        encryptor: Arc<dyn Encryptor>,
    ) -> KvResult<Arc<PersistentCell<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(cell) = self.lookup(&path)? {
            return Ok(cell);
        }

        let _build = self.build_lock.lock().await;
        // Double-check: another task may have built the cell while this one
        // waited for the build lock.
        if let Some(cell) = self.lookup(&path)? {
            return Ok(cell);
        }

        let cell = PersistentCell::open(path.clone(), codec, encryptor).await?;
        self.cells
            .write()
            .map_err(|err| Error::Internal(err.to_string()))?
            .insert(path, cell.clone() as Arc<dyn Any + Send + Sync>);
        Ok(cell)
    }

    fn lookup<T>(&self, path: &Path) -> KvResult<Option<Arc<PersistentCell<T>>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let cells = self.cells.read().map_err(|err| Error::Internal(err.to_string()))?;
        match cells.get(path) {
            None => Ok(None),
            Some(any) => match any.clone().downcast::<PersistentCell<T>>() {
                Ok(cell) => Ok(Some(cell)),
                Err(_) => Err(Error::InvalidState(format!(
                    "store {} is already open with a different state type",
                    path.display()
                ))),
            },
        }
    }
}
