use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::storage::{MemoryCell, StateCell};
use crate::store::{
    coerce_bool, coerce_f32, coerce_i32, coerce_i64, coerce_string, Editor, Kvs, KvState,
};

/// The non-persistent preference store: the same contract as
/// [`crate::store::PreferenceStore`], backed by an in-process cell instead of
/// a file. Intended for tests and transient caches. Nothing survives the
/// process, and distinct instances share nothing.
#[derive(Clone)]
pub struct InMemoryStore {
    cell: Arc<MemoryCell<KvState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore { cell: MemoryCell::new(KvState::new()) }
    }

    /// The raw snapshot stream of full states, in commit order.
    pub fn snapshot(&self) -> WatchStream<KvState> {
        self.cell.snapshot()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Kvs for InMemoryStore {
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
