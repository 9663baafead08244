//! This mod implements the persistence substrate shared by every store
//! flavor: a file-backed cell holding one serialized value, updated through
//! a read-modify-write pipeline and observed through a broadcast of
//! committed snapshots.
//!
//!
//! WRITE PATH
//! ==========
//! Every mutation, no matter which store surface produced it, funnels into
//! one cell-level operation, `update_data(transform)`:
//!
//! 1. Take the cell's write mutex. Transforms are serialized per cell, so
//!    within one cell they are totally ordered.
//! 2. Apply `transform(current)` to the cached in-memory state.
//! 3. Encode the new state and run it through the cell's encryptor.
//! 4. Write the bytes to `<path>.tmp`, flush and fsync, then rename over
//!    `<path>`. The rename is the commit point: a crash before it leaves the
//!    previous state intact, a crash after it leaves the new state intact,
//!    and readers of the file never observe a torn write.
//! 5. Publish the new state on the broadcast channel and release the mutex.
//!
//! The file I/O runs on the blocking worker pool, and steps 4-5 run in a
//! spawned task holding the mutex guard: once a commit has begun writing, it
//! completes its replacement even if the committing caller goes away.
//!
//!
//! READ PATH
//! =========
//! The file is read once, when the cell is opened. A missing or empty file
//! adopts the codec's default value; an undecodable one adopts the default
//! and logs, leaving the file untouched for inspection. From then on every
//! read is served from the cached state, and every committed state flows to
//! subscribers through a watch channel: the latest value is cached, new
//! subscribers observe it immediately, and a subscriber that lags skips
//! intermediate states but always sees the newest one.
//!
//!
//! OWNERSHIP
//! =========
//! A process-wide registry maps each store file path to at most one cell, so
//! every handle to a store shares one state, one mutex and one broadcast.
//! Against other processes an exclusive lock on a `.lock` sidecar is held
//! for the cell lifetime; cross-process sharing is not supported.

pub mod cell;
pub mod memory;
pub mod paths;
pub mod registry;

pub use cell::PersistentCell;
pub use memory::MemoryCell;
pub use paths::{DirPathProvider, PathProvider};
pub use registry::Registry;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::KvResult;

/// A state transform applied atomically by [`StateCell::update_data`].
pub type Transform<T> = Box<dyn FnOnce(&T) -> T + Send>;

/// The cell contract shared by the file-backed and in-memory backends: a
/// current snapshot, a broadcast of committed snapshots, and a serialized
/// read-modify-write mutator. Stores and editors hold cells through this
/// trait so the same store logic runs against either backend.
#[async_trait]
pub trait StateCell<T>: Send + Sync {
    /// Returns the current state. Equivalent to the first emission observed
    /// by a new [`StateCell::subscribe`] receiver.
    fn read(&self) -> T;

    /// Subscribes to committed snapshots. The receiver immediately observes
    /// the current state, then every state committed afterwards, in commit
    /// order. A lagging subscriber skips intermediate states but always sees
    /// the latest.
    fn subscribe(&self) -> watch::Receiver<T>;

    /// Atomically replaces the state with `transform(current)` and returns
    /// the new state. Transforms are serialized per cell: within one cell
    /// they are totally ordered and the snapshot stream reflects that order.
    async fn update_data(&self, transform: Transform<T>) -> KvResult<T>;
}
