use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs4::FileExt;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

use crate::codec::Codec;
use crate::error::{Error, KvResult};
use crate::storage::{StateCell, Transform};

/// A file-backed cell holding one value of type `T`.
///
/// The cell owns the on-disk representation of a single store: the whole
/// state is one serialized document, replaced atomically on every commit via
/// write-to-temp, fsync and rename. Committed snapshots are broadcast
/// through a watch channel which caches the latest state, so readers never
/// touch the file after the initial load.
///
/// An exclusive lock is taken on a `.lock` sidecar for the cell lifetime.
/// This keeps a second process from opening the same store; within one
/// process the registry already serves a single cell per path.
pub struct PersistentCell<T> {
    path: PathBuf,

    codec: Box<dyn Codec<T>>,

    encryptor: Arc<dyn crate::crypto::Encryptor>,

    /// Broadcasts committed snapshots and caches the current state.
    state_tx: Arc<watch::Sender<T>>,

    /// Serializes transforms and the file replacement they trigger.
    write_lock: Arc<Mutex<()>>,

    /// Held for the cell lifetime; released when the cell is dropped.
    _lock_file: std::fs::File,
}

impl<T> PersistentCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Opens the cell, creating parent directories as needed and loading the
    /// current state. A missing or empty file adopts the codec's default
    /// value; an undecodable file adopts the default value and logs, but the
    /// file itself is left untouched until the next commit.
    pub async fn open(
        path: PathBuf,
        codec: Box<dyn Codec<T>>,
        encryptor: Arc<dyn crate::crypto::Encryptor>,
    ) -> KvResult<Arc<Self>> {
        let io_path = path.clone();
        let (lock_file, initial, codec, encryptor) =
            tokio::task::spawn_blocking(move || -> KvResult<_> {
                if let Some(dir) = io_path.parent() {
                    match std::fs::create_dir_all(dir) {
                        Ok(_) => {}
                        Err(err) => {
                            return Err(Error::Internal(format!(
                                "{}:{:?}",
                                err,
                                dir.to_str()
                            )))
                        }
                    }
                }

                let mut lock_path = io_path.clone();
                lock_path.set_extension("lock");
                let lock_file = std::fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .open(&lock_path)?;
                // 锁文件。不允许其他进程篡改同一个存储文件。
                lock_file.try_lock_exclusive()?;

                let initial = load(&io_path, codec.as_ref(), encryptor.as_ref())?;
                Ok((lock_file, initial, codec, encryptor))
            })
            .await??;

        let (state_tx, _) = watch::channel(initial);
        Ok(Arc::new(PersistentCell {
            path,
            codec,
            encryptor,
            state_tx: Arc::new(state_tx),
            write_lock: Arc::new(Mutex::new(())),
            _lock_file: lock_file,
        }))
    }

    /// The hot snapshot stream: every new subscriber immediately receives
    /// the current state, then every subsequent committed state.
    pub fn snapshot(&self) -> WatchStream<T> {
        WatchStream::new(self.state_tx.subscribe())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<T> StateCell<T> for PersistentCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn read(&self) -> T {
        self.state_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<T> {
        self.state_tx.subscribe()
    }

    async fn update_data(&self, transform: Transform<T>) -> KvResult<T> {
        // Owned guard: it travels into the spawned task below, so the next
        // writer is admitted only after the file replacement finished.
        let guard = self.write_lock.clone().lock_owned().await;

        let current = self.state_tx.borrow().clone();
        let next = transform(&current);

        let encoded = self.codec.encode(&next).map_err(Error::into_write)?;
        let bytes = self.encryptor.encrypt(&encoded).map_err(Error::into_write)?;

        // The write and the publish run in a spawned task: once the file
        // replacement has begun it completes even if the caller is cancelled,
        // and the in-memory state is only published for durable commits.
        let path = self.path.clone();
        let state_tx = self.state_tx.clone();
        let published = next.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            let result = match tokio::task::spawn_blocking(move || replace_file(&path, &bytes))
                .await
            {
                Ok(result) => result,
                Err(err) => Err(Error::from(err)),
            };
            match result {
                Ok(()) => {
                    state_tx.send_replace(published);
                    Ok(())
                }
                Err(err) => Err(err.into_write()),
            }
        });

        handle.await??;
        Ok(next)
    }
}

/// Reads and decodes the current file contents, or the codec default for a
/// missing/empty file. Decode failures are non-fatal: the default value is
/// adopted and the file is left in place. A decrypt failure downgrades to a
/// plaintext decode attempt before defaulting, so a store written before
/// encryption was configured stays readable.
fn load<T>(
    path: &Path,
    codec: &dyn Codec<T>,
    encryptor: &dyn crate::crypto::Encryptor,
) -> KvResult<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(codec.default_value())
        }
        Err(err) => return Err(Error::Read(format!("{}: {}", path.display(), err))),
    };
    if bytes.is_empty() {
        return Ok(codec.default_value());
    }

    match encryptor.decrypt(&bytes) {
        Ok(plain) => match codec.decode(&plain) {
            Ok(state) => Ok(state),
            Err(err) => {
                log::error!(
                    "failed to decode store {}: {}; adopting default value",
                    path.display(),
                    err
                );
                Ok(codec.default_value())
            }
        },
        Err(err) => {
            log::error!(
                "failed to decrypt store {}: {}; attempting plaintext decode",
                path.display(),
                err
            );
            match codec.decode(&bytes) {
                Ok(state) => Ok(state),
                Err(_) => Ok(codec.default_value()),
            }
        }
    }
}

/// Atomically replaces the store file: write `<path>.tmp`, flush and fsync,
/// then rename over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> KvResult<()> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)
        .map_err(|err| Error::Write(format!("{}: {}", tmp.display(), err)))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .and_then(|_| file.sync_all())
        .map_err(|err| Error::Write(format!("{}: {}", tmp.display(), err)))?;
    drop(file);

    match std::fs::rename(&tmp, path) {
        Ok(_) => Ok(()),
        Err(err) => Err(Error::Write(format!(
            "db file replace error, from {:?} to {:?}, cause:{}.",
            tmp.to_str(),
            path.to_str(),
            err
        ))),
    }
}
