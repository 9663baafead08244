//! `kvs` is an embeddable, typed key-value store that persists named stores
//! to the local file system. Each store is one file holding one serialized
//! map, replaced atomically on every commit; readers observe either a
//! point-in-time snapshot or a live stream of committed states, and writers
//! compose a batch of mutations that lands as a single commit. [Author fengyang]
//!
//! Four store flavors share the same substrate:
//!
//! - [`store::PreferenceStore`]: typed scalar preferences (string, i32, i64,
//!   f32, bool), persisted as canonical JSON.
//! - [`ttl::TtlStore`]: the same surface with per-key or default lifetimes;
//!   expired entries read as absent and are removed in batch.
//! - [`document::DocumentStore`]: a single opaque string payload.
//! - [`store::InMemoryStore`]: the preference contract without persistence,
//!   for tests and transient caches.
//!
//! Store files may additionally be encrypted with AES-256-GCM
//! ([`crypto::AesGcmEncryptor`]); the pass-through default stores plain
//! canonical JSON. A process-wide registry guarantees one backing cell per
//! store file, so every handle opened under a name shares state and streams.
//!
//! ## Getting started
//!
//! ```rust,no_run
//! use kvs::error::KvResult;
//! use kvs::storage::DirPathProvider;
//! use kvs::store::{Kvs, PreferenceStore};
//!
//! #[tokio::main]
//! async fn main() -> KvResult<()> {
//!     let paths = DirPathProvider::new("/var/lib/myapp");
//!     let store = PreferenceStore::open("settings", &paths).await?;
//!
//!     store
//!         .edit()
//!         .put_string("name", "Santiago")?
//!         .put_i32("age", 30)?
//!         .put_bool("premium", true)?
//!         .commit()
//!         .await?;
//!
//!     assert_eq!(store.get_string("name", "?").await, "Santiago");
//!     assert_eq!(store.get_i32("age", 0).await, 30);
//!     assert!(store.contains("premium").await);
//!
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod crypto;
pub mod document;
pub mod error;
pub mod storage;
pub mod store;
pub mod stream;
pub mod ttl;
