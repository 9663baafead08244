use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::crypto::{Encryptor, PassThrough};
use crate::codec::MapCodec;
use crate::error::KvResult;
use crate::storage::{PathProvider, PersistentCell, Registry, StateCell};
use crate::store::{
    coerce_bool, coerce_f32, coerce_i32, coerce_i64, coerce_string, Editor, Kvs, KvState,
};

/// The file-backed preference store: a typed map of scalar values persisted
/// as one canonical JSON document.
///
/// Handles are cheap to clone and every handle opened under the same name
/// shares the same underlying cell (and therefore the same snapshot stream),
/// courtesy of the process-wide registry.
#[derive(Clone)]
pub struct PreferenceStore {
    cell: Arc<PersistentCell<KvState>>,
}

impl PreferenceStore {
    /// Opens (or lazily creates) the named store, unencrypted.
    pub async fn open(name: &str, paths: &dyn PathProvider) -> KvResult<Self> {
        Self::open_encrypted(name, paths, Arc::new(PassThrough::new())).await
    }

    /// Opens (or lazily creates) the named store with the serialized bytes
    /// run through `encryptor` on their way to and from disk.
    pub async fn open_encrypted(
        name: &str,
        paths: &dyn PathProvider,
        encryptor: Arc<dyn Encryptor>,
    ) -> KvResult<Self> {
        let path = paths.resolve(name)?;
        let cell = Registry::global()
            .open_cell(path, Box::new(MapCodec::<String>::new()), encryptor)
            .await?;
        Ok(PreferenceStore { cell })
    }

    /// The raw snapshot stream of full states, in commit order.
    pub fn snapshot(&self) -> WatchStream<KvState> {
        self.cell.snapshot()
    }
}

#[async_trait]
impl Kvs for PreferenceStore {
    type Editor = Editor;

    async fn get_string(&self, key: &str, default: &str) -> String {
        coerce_string(self.cell.read().get(key).map(String::as_str), default)
    }

    async fn get_i32(&self, key: &str, default: i32) -> i32 {
        coerce_i32(self.cell.read().get(key).map(String::as_str), default)
    }

    async fn get_i64(&self, key: &str, default: i64) -> i64 {
        coerce_i64(self.cell.read().get(key).map(String::as_str), default)
    }

    async fn get_f32(&self, key: &str, default: f32) -> f32 {
        coerce_f32(self.cell.read().get(key).map(String::as_str), default)
    }

    async fn get_bool(&self, key: &str, default: bool) -> bool {
        coerce_bool(self.cell.read().get(key).map(String::as_str), default)
    }

    async fn get_all(&self) -> KvState {
        self.cell.read()
    }

    async fn contains(&self, key: &str) -> bool {
        self.cell.read().contains_key(key)
    }

    fn edit(&self) -> Editor {
        Editor::new(self.cell.clone())
    }

    fn get_string_as_stream(&self, key: &str, default: &str) -> BoxStream<'static, String> {
        let (key, default) = (key.to_string(), default.to_string());
        crate::stream::derive(self.cell.subscribe(), move |state: &KvState| {
            coerce_string(state.get(&key).map(String::as_str), &default)
        })
        .boxed()
    }

    fn get_i32_as_stream(&self, key: &str, default: i32) -> BoxStream<'static, i32> {
        let key = key.to_string();
        crate::stream::derive(self.cell.subscribe(), move |state: &KvState| {
            coerce_i32(state.get(&key).map(String::as_str), default)
        })
        .boxed()
    }

    fn get_i64_as_stream(&self, key: &str, default: i64) -> BoxStream<'static, i64> {
        let key = key.to_string();
        crate::stream::derive(self.cell.subscribe(), move |state: &KvState| {
            coerce_i64(state.get(&key).map(String::as_str), default)
        })
        .boxed()
    }

    fn get_f32_as_stream(&self, key: &str, default: f32) -> BoxStream<'static, f32> {
        let key = key.to_string();
        crate::stream::derive(self.cell.subscribe(), move |state: &KvState| {
            coerce_f32(state.get(&key).map(String::as_str), default)
        })
        .boxed()
    }

    fn get_bool_as_stream(&self, key: &str, default: bool) -> BoxStream<'static, bool> {
        let key = key.to_string();
        crate::stream::derive(self.cell.subscribe(), move |state: &KvState| {
            coerce_bool(state.get(&key).map(String::as_str), default)
        })
        .boxed()
    }

    fn get_all_as_stream(&self) -> BoxStream<'static, KvState> {
        crate::stream::derive(self.cell.subscribe(), |state: &KvState| state.clone()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DirPathProvider;

    crate::store::tests::test_kvs!({
        let dir = tempdir::TempDir::new("prefs")?;
        let paths = DirPathProvider::new(dir.path());
        let store = PreferenceStore::open("testdb", &paths).await?;
        (store, dir)
    });

    #[tokio::test]
    /// Two handles to the same name share state immediately.
    async fn test_handles_share_state() -> KvResult<()> {
        let dir = tempdir::TempDir::new("prefs").unwrap();
        let paths = DirPathProvider::new(dir.path());

        let a = PreferenceStore::open("shared", &paths).await?;
        let b = PreferenceStore::open("shared", &paths).await?;

        a.edit().put_string("who", "both")?.commit().await?;
        assert_eq!(b.get_string("who", "?").await, "both");
        Ok(())
    }

    #[tokio::test]
    /// The on-disk bytes are canonical JSON with lexicographically sorted
    /// keys and all values rendered as text.
    async fn test_on_disk_schema() -> KvResult<()> {
        let dir = tempdir::TempDir::new("prefs").unwrap();
        let paths = DirPathProvider::new(dir.path());

        let s = PreferenceStore::open("schema", &paths).await?;
        s.edit().put_i32("zeta", 1)?.put_bool("alpha", true)?.commit().await?;

        let raw = std::fs::read(dir.path().join("schema.preferences_pb")).unwrap();
        assert_eq!(
            String::from_utf8(raw).unwrap(),
            r#"{"alpha":"true","zeta":"1"}"#
        );
        Ok(())
    }
}
