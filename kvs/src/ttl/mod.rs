pub mod cleanup;
pub mod entry;
pub mod manager;
pub mod store;

pub use cleanup::CleanupJob;
pub use entry::TtlEntry;
pub use manager::{Clock, SystemClock, TtlManager};
pub use store::{TtlEditor, TtlOptions, TtlStore};

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::KvResult;
use crate::store::Kvs;

/// TTL 存储的内存状态: key → 完整条目。
pub type TtlState = BTreeMap<String, TtlEntry>;

/// The TTL-extended store contract: everything in [`Kvs`] plus explicit
/// expiry maintenance. Single-key getters treat an expired entry as absent
/// without writing; the batch surfaces below are the only paths that
/// physically remove expired entries.
#[async_trait]
pub trait KvsExtended: Kvs {
    /// Removes every entry that has expired by now, in one batched write,
    /// and returns how many were removed. A no-op when nothing expired.
    async fn remove_expired(&self) -> KvResult<usize>;

    /// Creates a handle for the periodic cleanup loop. The loop only runs
    /// once [`CleanupJob::start`] is called and stops when the handle is
    /// stopped or dropped.
    fn cleanup_job(&self, interval: Duration) -> CleanupJob;
}
