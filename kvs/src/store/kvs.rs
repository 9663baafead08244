use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::store::KvState;

/// The preference-store contract: typed snapshot getters, live streams of
/// interpreted values, and batched mutation through a single-use editor.
///
/// Getters never fail: a missing key, an expired key (TTL stores) or text
/// that does not parse as the requested kind all yield the caller's default.
///
/// Note that `contains` is defined over the raw map for plain stores but
/// requires liveness for TTL stores; callers migrating between variants
/// should not assume the two agree for entries whose lifetime has elapsed.
#[async_trait]
pub trait Kvs: Send + Sync {
    /// The editor type produced by [`Kvs::edit`]; TTL stores use an editor
    /// whose puts may carry a per-key duration.
    type Editor;

    async fn get_string(&self, key: &str, default: &str) -> String;

    async fn get_i32(&self, key: &str, default: i32) -> i32;

    async fn get_i64(&self, key: &str, default: i64) -> i64;

    async fn get_f32(&self, key: &str, default: f32) -> f32;

    async fn get_bool(&self, key: &str, default: bool) -> bool;

    /// A snapshot of the current state as text values.
    async fn get_all(&self) -> KvState;

    async fn contains(&self, key: &str) -> bool;

    /// Starts a batch of mutations. The editor is single-use: it is consumed
    /// by its `commit`, successful or not.
    fn edit(&self) -> Self::Editor;

    /// Emits the interpreted value of `key` for the current state and then
    /// for every committed state, de-duplicated on the interpreted value.
    fn get_string_as_stream(&self, key: &str, default: &str) -> BoxStream<'static, String>;

    fn get_i32_as_stream(&self, key: &str, default: i32) -> BoxStream<'static, i32>;

    fn get_i64_as_stream(&self, key: &str, default: i64) -> BoxStream<'static, i64>;

    fn get_f32_as_stream(&self, key: &str, default: f32) -> BoxStream<'static, f32>;

    fn get_bool_as_stream(&self, key: &str, default: bool) -> BoxStream<'static, bool>;

    /// Emits the full text-valued state map for the current state and every
    /// committed state, de-duplicated on map equality.
    fn get_all_as_stream(&self) -> BoxStream<'static, KvState>;
}
