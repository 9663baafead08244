use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::codec::MapCodec;
use crate::crypto::{Encryptor, PassThrough};
use crate::error::{Error, KvResult};
use crate::storage::{PathProvider, PersistentCell, Registry, StateCell};
use crate::store::editor::EditorState;
use crate::store::{
    coerce_bool, coerce_f32, coerce_i32, coerce_i64, coerce_string, Kvs, KvState, ValueKind,
};
use crate::ttl::{Clock, CleanupJob, KvsExtended, SystemClock, TtlEntry, TtlManager, TtlState};

/// Configuration for a TTL store.
#[derive(Clone, Default)]
pub struct TtlOptions {
    default_ttl: Option<Duration>,
    encryptor: Option<Arc<dyn Encryptor>>,
    value_encryptor: Option<Arc<dyn Encryptor>>,
    clock: Option<Arc<dyn Clock>>,
}

impl TtlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime applied when a put carries no per-key duration. Without it,
    /// such entries never expire.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Encrypts the serialized state on its way to and from disk.
    pub fn encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Encrypts each stored value individually: the entry map stays readable
    /// but values become base64-wrapped ciphertext, marked by the entry's
    /// `encrypted` flag.
    pub fn value_encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.value_encryptor = Some(encryptor);
        self
    }

    /// Clock override, for tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

/// The file-backed TTL store: the preference-store contract where every
/// entry may carry a lifetime.
///
/// Expired entries are treated as absent by every read, but single-key reads
/// never write: physical removal happens in batch, either when `get_all`
/// sweeps the state, when `remove_expired` is called, or from the periodic
/// cleanup job. This keeps read-heavy workloads from amplifying into a
/// read-modify-write per expired hit.
#[derive(Clone)]
pub struct TtlStore {
    cell: Arc<PersistentCell<TtlState>>,
    manager: Arc<TtlManager>,
    value_encryptor: Option<Arc<dyn Encryptor>>,
}

impl TtlStore {
    pub async fn open(
        name: &str,
        paths: &dyn PathProvider,
        options: TtlOptions,
    ) -> KvResult<Self> {
        let path = paths.resolve(name)?;
        let encryptor = options
            .encryptor
            .unwrap_or_else(|| Arc::new(PassThrough::new()) as Arc<dyn Encryptor>);
        let cell = Registry::global()
            .open_cell(path, Box::new(MapCodec::<TtlEntry>::new()), encryptor)
            .await?;
        let clock = options.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        Ok(TtlStore {
            cell,
            manager: Arc::new(TtlManager::with_clock(options.default_ttl, clock)),
            value_encryptor: options.value_encryptor,
        })
    }

    /// The raw snapshot stream of full entry states, in commit order.
    pub fn snapshot(&self) -> WatchStream<TtlState> {
        self.cell.snapshot()
    }

    pub fn manager(&self) -> &TtlManager {
        &self.manager
    }
}

/// Decodes the visible text of an entry. A failed decrypt downgrades to the
/// stored text and logs; it never turns a read into an error.
fn entry_text(entry: &TtlEntry, value_encryptor: Option<&Arc<dyn Encryptor>>) -> String {
    if !entry.encrypted {
        return entry.value.clone();
    }
    match value_encryptor {
        Some(encryptor) => match crate::crypto::open_text(encryptor.as_ref(), &entry.value) {
            Ok(plain) => plain,
            Err(err) => {
                log::error!(
                    "failed to decrypt value for key {:?}: {}; returning stored text",
                    entry.key,
                    err
                );
                entry.value.clone()
            }
        },
        None => {
            log::error!(
                "entry {:?} is encrypted but no value encryptor is configured",
                entry.key
            );
            entry.value.clone()
        }
    }
}

fn live_text(
    state: &TtlState,
    key: &str,
    manager: &TtlManager,
    value_encryptor: Option<&Arc<dyn Encryptor>>,
) -> Option<String> {
    state
        .get(key)
        .filter(|entry| !manager.is_expired(entry.expires_at))
        .map(|entry| entry_text(entry, value_encryptor))
}

/// Single pass over the state: only live entries, as text.
fn live_map(
    state: &TtlState,
    manager: &TtlManager,
    value_encryptor: Option<&Arc<dyn Encryptor>>,
) -> KvState {
    state
        .iter()
        .filter(|(_, entry)| !manager.is_expired(entry.expires_at))
        .map(|(key, entry)| (key.clone(), entry_text(entry, value_encryptor)))
        .collect()
}

fn has_expired(state: &TtlState, manager: &TtlManager) -> bool {
    state.values().any(|entry| manager.is_expired(entry.expires_at))
}

#[async_trait]
impl Kvs for TtlStore {
    type Editor = TtlEditor;

    async fn get_string(&self, key: &str, default: &str) -> String {
        let state = self.cell.read();
        coerce_string(
            live_text(&state, key, &self.manager, self.value_encryptor.as_ref()).as_deref(),
            default,
        )
    }

    async fn get_i32(&self, key: &str, default: i32) -> i32 {
        let state = self.cell.read();
        coerce_i32(
            live_text(&state, key, &self.manager, self.value_encryptor.as_ref()).as_deref(),
            default,
        )
    }

    async fn get_i64(&self, key: &str, default: i64) -> i64 {
        let state = self.cell.read();
        coerce_i64(
            live_text(&state, key, &self.manager, self.value_encryptor.as_ref()).as_deref(),
            default,
        )
    }

    async fn get_f32(&self, key: &str, default: f32) -> f32 {
        let state = self.cell.read();
        coerce_f32(
            live_text(&state, key, &self.manager, self.value_encryptor.as_ref()).as_deref(),
            default,
        )
    }

    async fn get_bool(&self, key: &str, default: bool) -> bool {
        let state = self.cell.read();
        coerce_bool(
            live_text(&state, key, &self.manager, self.value_encryptor.as_ref()).as_deref(),
            default,
        )
    }

    /// Returns only live entries and physically removes every expired entry
    /// it encountered, in one batched write, before returning.
    async fn get_all(&self) -> KvState {
        let state = self.cell.read();
        if has_expired(&state, &self.manager) {
            // Expiry is re-decided inside the transform against the state it
            // is handed: a key that looked expired here may have been
            // rewritten by a concurrent commit before the write lock fell.
            let manager = self.manager.clone();
            let swept = self
                .cell
                .update_data(Box::new(move |state: &TtlState| {
                    let mut next = state.clone();
                    next.retain(|_, entry| !manager.is_expired(entry.expires_at));
                    next
                }))
                .await;
            if let Err(err) = swept {
                log::error!("failed to remove expired entries: {}", err);
            }
        }
        live_map(&state, &self.manager, self.value_encryptor.as_ref())
    }

    /// True iff the entry exists and has not expired.
    async fn contains(&self, key: &str) -> bool {
        self.cell
            .read()
            .get(key)
            .map(|entry| !self.manager.is_expired(entry.expires_at))
            .unwrap_or(false)
    }

    fn edit(&self) -> TtlEditor {
        TtlEditor::new(
            self.cell.clone(),
            self.manager.clone(),
            self.value_encryptor.clone(),
        )
    }

    fn get_string_as_stream(&self, key: &str, default: &str) -> BoxStream<'static, String> {
        let (key, default) = (key.to_string(), default.to_string());
        let manager = self.manager.clone();
        let encryptor = self.value_encryptor.clone();
        crate::stream::derive(self.cell.subscribe(), move |state: &TtlState| {
            coerce_string(live_text(state, &key, &manager, encryptor.as_ref()).as_deref(), &default)
        })
        .boxed()
    }

    fn get_i32_as_stream(&self, key: &str, default: i32) -> BoxStream<'static, i32> {
        let key = key.to_string();
        let manager = self.manager.clone();
        let encryptor = self.value_encryptor.clone();
        crate::stream::derive(self.cell.subscribe(), move |state: &TtlState| {
            coerce_i32(live_text(state, &key, &manager, encryptor.as_ref()).as_deref(), default)
        })
        .boxed()
    }

    fn get_i64_as_stream(&self, key: &str, default: i64) -> BoxStream<'static, i64> {
        let key = key.to_string();
        let manager = self.manager.clone();
        let encryptor = self.value_encryptor.clone();
        crate::stream::derive(self.cell.subscribe(), move |state: &TtlState| {
            coerce_i64(live_text(state, &key, &manager, encryptor.as_ref()).as_deref(), default)
        })
        .boxed()
    }

    fn get_f32_as_stream(&self, key: &str, default: f32) -> BoxStream<'static, f32> {
        let key = key.to_string();
        let manager = self.manager.clone();
        let encryptor = self.value_encryptor.clone();
        crate::stream::derive(self.cell.subscribe(), move |state: &TtlState| {
            coerce_f32(live_text(state, &key, &manager, encryptor.as_ref()).as_deref(), default)
        })
        .boxed()
    }

    fn get_bool_as_stream(&self, key: &str, default: bool) -> BoxStream<'static, bool> {
        let key = key.to_string();
        let manager = self.manager.clone();
        let encryptor = self.value_encryptor.clone();
        crate::stream::derive(self.cell.subscribe(), move |state: &TtlState| {
            coerce_bool(live_text(state, &key, &manager, encryptor.as_ref()).as_deref(), default)
        })
        .boxed()
    }

    /// Emits, for each committed state, the live entries as text, built in a
    /// single pass and de-duplicated on map equality.
    fn get_all_as_stream(&self) -> BoxStream<'static, KvState> {
        let manager = self.manager.clone();
        let encryptor = self.value_encryptor.clone();
        crate::stream::derive(self.cell.subscribe(), move |state: &TtlState| {
            live_map(state, &manager, encryptor.as_ref())
        })
        .boxed()
    }
}

#[async_trait]
impl KvsExtended for TtlStore {
    async fn remove_expired(&self) -> KvResult<usize> {
        if !has_expired(&self.cell.read(), &self.manager) {
            return Ok(0);
        }

        // Expiry is re-decided inside the transform, as in get_all; the
        // counter carries out how many entries it actually dropped.
        let manager = self.manager.clone();
        let removed = Arc::new(AtomicUsize::new(0));
        let counter = removed.clone();
        self.cell
            .update_data(Box::new(move |state: &TtlState| {
                let mut next = state.clone();
                next.retain(|_, entry| !manager.is_expired(entry.expires_at));
                counter.store(state.len() - next.len(), Ordering::SeqCst);
                next
            }))
            .await?;
        Ok(removed.load(Ordering::SeqCst))
    }

    fn cleanup_job(&self, interval: Duration) -> CleanupJob {
        CleanupJob::new(self.clone(), interval)
    }
}

/// Pending TTL mutations.
#[derive(Default)]
struct Accumulators {
    clear_all: bool,
    removals: BTreeSet<String>,
    additions: BTreeMap<String, (ValueKind, Option<Duration>)>,
}

/// The TTL variant of the single-use editor: each put may carry a per-key
/// lifetime, and the absolute deadline is computed at commit time so a
/// long-lived open editor does not eat into the entries' lifetimes.
pub struct TtlEditor {
    cell: Arc<dyn StateCell<TtlState>>,
    manager: Arc<TtlManager>,
    value_encryptor: Option<Arc<dyn Encryptor>>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: EditorState,
    acc: Accumulators,
}

impl TtlEditor {
    fn new(
        cell: Arc<dyn StateCell<TtlState>>,
        manager: Arc<TtlManager>,
        value_encryptor: Option<Arc<dyn Encryptor>>,
    ) -> Self {
        TtlEditor {
            cell,
            manager,
            value_encryptor,
            inner: Mutex::new(Inner { state: EditorState::Open, acc: Accumulators::default() }),
        }
    }

    pub fn put(&self, key: &str, value: ValueKind, ttl: Option<Duration>) -> KvResult<&Self> {
        if key.is_empty() {
            return Err(Error::InvalidState("key must not be empty".to_string()));
        }
        self.mutate(|acc| {
            acc.removals.remove(key);
            acc.additions.insert(key.to_string(), (value, ttl));
        })
    }

    pub fn put_string(&self, key: &str, value: &str) -> KvResult<&Self> {
        self.put(key, ValueKind::String(value.to_string()), None)
    }

    pub fn put_string_ttl(&self, key: &str, value: &str, ttl: Duration) -> KvResult<&Self> {
        self.put(key, ValueKind::String(value.to_string()), Some(ttl))
    }

    pub fn put_i32(&self, key: &str, value: i32) -> KvResult<&Self> {
        self.put(key, ValueKind::Int32(value), None)
    }

    pub fn put_i32_ttl(&self, key: &str, value: i32, ttl: Duration) -> KvResult<&Self> {
        self.put(key, ValueKind::Int32(value), Some(ttl))
    }

    pub fn put_i64(&self, key: &str, value: i64) -> KvResult<&Self> {
        self.put(key, ValueKind::Int64(value), None)
    }

    pub fn put_i64_ttl(&self, key: &str, value: i64, ttl: Duration) -> KvResult<&Self> {
        self.put(key, ValueKind::Int64(value), Some(ttl))
    }

    pub fn put_f32(&self, key: &str, value: f32) -> KvResult<&Self> {
        self.put(key, ValueKind::Float32(value), None)
    }

    pub fn put_f32_ttl(&self, key: &str, value: f32, ttl: Duration) -> KvResult<&Self> {
        self.put(key, ValueKind::Float32(value), Some(ttl))
    }

    pub fn put_bool(&self, key: &str, value: bool) -> KvResult<&Self> {
        self.put(key, ValueKind::Bool(value), None)
    }

    pub fn put_bool_ttl(&self, key: &str, value: bool, ttl: Duration) -> KvResult<&Self> {
        self.put(key, ValueKind::Bool(value), Some(ttl))
    }

    pub fn remove(&self, key: &str) -> KvResult<&Self> {
        self.mutate(|acc| {
            acc.additions.remove(key);
            acc.removals.insert(key.to_string());
        })
    }

    pub fn clear(&self) -> KvResult<&Self> {
        self.mutate(|acc| {
            acc.additions.clear();
            acc.removals.clear();
            acc.clear_all = true;
        })
    }

    pub async fn commit(&self) -> KvResult<()> {
        let acc = {
            let mut inner = self.lock()?;
            match inner.state {
                EditorState::Open => {}
                EditorState::Committing => {
                    return Err(Error::InvalidState("commit already in progress".to_string()))
                }
                EditorState::Committed | EditorState::Failed => {
                    return Err(Error::InvalidState("editor already consumed".to_string()))
                }
            }
            inner.state = EditorState::Committing;
            std::mem::take(&mut inner.acc)
        };

        // Deadlines and value sealing happen now, at commit time.
        let entries = match self.build_entries(acc.additions) {
            Ok(entries) => entries,
            Err(err) => {
                self.lock()?.state = EditorState::Failed;
                return Err(err.into_write());
            }
        };

        let clear_all = acc.clear_all;
        let removals = acc.removals;
        let result = self
            .cell
            .update_data(Box::new(move |state: &TtlState| {
                let mut next = if clear_all { TtlState::new() } else { state.clone() };
                for key in &removals {
                    next.remove(key);
                }
                for (key, entry) in entries {
                    next.insert(key, entry);
                }
                next
            }))
            .await;

        let mut inner = self.lock()?;
        match result {
            Ok(_) => {
                inner.state = EditorState::Committed;
                Ok(())
            }
            Err(err) => {
                inner.state = EditorState::Failed;
                Err(err.into_write())
            }
        }
    }

    fn build_entries(
        &self,
        additions: BTreeMap<String, (ValueKind, Option<Duration>)>,
    ) -> KvResult<BTreeMap<String, TtlEntry>> {
        let mut entries = BTreeMap::new();
        for (key, (value, duration)) in additions {
            let text = value.render();
            let (value, encrypted) = match &self.value_encryptor {
                Some(encryptor) => (crate::crypto::seal_text(encryptor.as_ref(), &text)?, true),
                None => (text, false),
            };
            let expires_at = self.manager.calculate_expiration(duration);
            entries.insert(
                key.clone(),
                TtlEntry { key, value, duration, expires_at, encrypted },
            );
        }
        Ok(entries)
    }

    fn mutate(&self, f: impl FnOnce(&mut Accumulators)) -> KvResult<&Self> {
        let mut inner = self.lock()?;
        match inner.state {
            EditorState::Open => {
                f(&mut inner.acc);
                Ok(self)
            }
            EditorState::Committing => {
                Err(Error::InvalidState("editor is committing".to_string()))
            }
            EditorState::Committed | EditorState::Failed => {
                Err(Error::InvalidState("editor already consumed".to_string()))
            }
        }
    }

    fn lock(&self) -> KvResult<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|err| Error::Internal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesGcmEncryptor;
    use crate::storage::DirPathProvider;
    use crate::ttl::manager::testing::MockClock;

    // With no default TTL and no per-key durations, the TTL store honors the
    // plain store contract verbatim.
    crate::store::tests::test_kvs!({
        let dir = tempdir::TempDir::new("ttl")?;
        let paths = DirPathProvider::new(dir.path());
        let store = TtlStore::open("testdb", &paths, TtlOptions::new()).await?;
        (store, dir)
    });

    async fn open_with_clock(
        dir: &tempdir::TempDir,
        clock: &MockClock,
        options: TtlOptions,
    ) -> TtlStore {
        let paths = DirPathProvider::new(dir.path());
        TtlStore::open("ttldb", &paths, options.clock(Arc::new(clock.clone())))
            .await
            .unwrap()
    }

    fn store_file(dir: &tempdir::TempDir) -> std::path::PathBuf {
        dir.path().join("ttldb.preferences_pb")
    }

    #[tokio::test]
    /// No default TTL and no per-key duration: the entry outlives any delay.
    async fn test_never_expires_without_configuration() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit().put_string("k", "v").unwrap().commit().await.unwrap();
        clock.advance_ms(1_000 * 60 * 60 * 24 * 365);
        assert_eq!(s.get_string("k", "def").await, "v");
        assert!(s.contains("k").await);
    }

    #[tokio::test]
    /// Per-key durations override the default in both directions.
    async fn test_per_key_overrides_default() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(
            &dir,
            &clock,
            TtlOptions::new().default_ttl(Duration::from_secs(10)),
        )
        .await;

        s.edit()
            .put_string_ttl("short", "s", Duration::from_secs(1))
            .unwrap()
            .put_string_ttl("long", "l", Duration::from_secs(100))
            .unwrap()
            .put_string("defaulted", "d")
            .unwrap()
            .commit()
            .await
            .unwrap();

        clock.advance_ms(2_100);
        assert_eq!(s.get_string("short", "def").await, "def");
        assert_eq!(s.get_string("long", "def").await, "l");
        assert_eq!(s.get_string("defaulted", "def").await, "d");
        assert!(!s.contains("short").await);

        // Past the default but short of the long override.
        clock.advance_ms(10_000);
        assert_eq!(s.get_string("defaulted", "def").await, "def");
        assert_eq!(s.get_string("long", "def").await, "l");
    }

    #[tokio::test]
    /// `get_all` returns only live entries and physically removes the
    /// expired ones it encountered.
    async fn test_get_all_batch_cleanup() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit()
            .put_string("live", "1")
            .unwrap()
            .put_string_ttl("expired", "2", Duration::from_secs(1))
            .unwrap()
            .commit()
            .await
            .unwrap();
        clock.advance_ms(2_000);
        s.edit().put_string("live2", "3").unwrap().commit().await.unwrap();

        let all = s.get_all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all.get("live").map(String::as_str), Some("1"));
        assert_eq!(all.get("live2").map(String::as_str), Some("3"));

        // The file now holds exactly the live entries.
        let raw = std::fs::read(store_file(&dir)).unwrap();
        let on_disk: TtlState = serde_json::from_slice(&raw).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert!(!on_disk.contains_key("expired"));
    }

    #[tokio::test]
    /// Repeated single-key reads of an expired entry never write.
    async fn test_expired_reads_do_not_write() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit()
            .put_string_ttl("gone", "v", Duration::from_secs(1))
            .unwrap()
            .commit()
            .await
            .unwrap();
        clock.advance_ms(5_000);

        let before = std::fs::read(store_file(&dir)).unwrap();
        for _ in 0..10 {
            assert_eq!(s.get_string("gone", "def").await, "def");
            assert!(!s.contains("gone").await);
        }
        assert_eq!(std::fs::read(store_file(&dir)).unwrap(), before);
    }

    #[tokio::test]
    /// Streams see only live entries, and a rewrite that changes nothing
    /// visible stays silent.
    async fn test_stream_filters_expired_and_dedups() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit()
            .put_string("a", "1")
            .unwrap()
            .put_string_ttl("b", "2", Duration::from_secs(1))
            .unwrap()
            .commit()
            .await
            .unwrap();
        clock.advance_ms(2_000);

        let mut all = s.get_all_as_stream();
        let first = all.next().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.get("a").map(String::as_str), Some("1"));

        let mut per_key = s.get_string_as_stream("a", "?");
        assert_eq!(per_key.next().await.unwrap(), "1");

        // Rewriting the same visible value: both streams stay silent.
        s.edit().put_string("a", "1").unwrap().commit().await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(50), all.next()).await.is_err()
        );
        assert!(
            tokio::time::timeout(Duration::from_millis(50), per_key.next()).await.is_err()
        );
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit()
            .put_string_ttl("a", "1", Duration::from_secs(1))
            .unwrap()
            .put_string_ttl("b", "2", Duration::from_secs(1))
            .unwrap()
            .put_string("keep", "3")
            .unwrap()
            .commit()
            .await
            .unwrap();

        assert_eq!(s.remove_expired().await.unwrap(), 0);
        clock.advance_ms(1_000);
        assert_eq!(s.remove_expired().await.unwrap(), 2);
        assert_eq!(s.remove_expired().await.unwrap(), 0);
        assert_eq!(s.get_all().await.len(), 1);
    }

    #[tokio::test]
    /// The on-disk entry records the requested duration as ISO-8601 and the
    /// absolute deadline computed at commit time.
    async fn test_on_disk_entry_schema() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(1_000);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit()
            .put_string_ttl("session", "abc", Duration::from_secs(90))
            .unwrap()
            .commit()
            .await
            .unwrap();

        let raw = std::fs::read(store_file(&dir)).unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains(r#""duration":"PT1M30S""#), "{}", text);
        assert!(text.contains(r#""expiresAt":91000"#), "{}", text);
        assert!(text.contains(r#""encrypted":false"#), "{}", text);
    }

    #[tokio::test]
    /// Expiry is inclusive at the deadline: at exactly `expires_at` the
    /// entry is gone.
    async fn test_expiry_boundary() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;

        s.edit()
            .put_string_ttl("k", "v", Duration::from_secs(1))
            .unwrap()
            .commit()
            .await
            .unwrap();

        clock.advance_ms(999);
        assert!(s.contains("k").await);
        clock.advance_ms(1);
        assert!(!s.contains("k").await);
        assert_eq!(s.get_string("k", "def").await, "def");
    }

    #[tokio::test]
    /// Entries put without a per-key duration pick up the default TTL, and
    /// the recorded deadline reflects the commit time.
    async fn test_default_ttl_recorded_on_disk() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(5_000);
        let s = open_with_clock(
            &dir,
            &clock,
            TtlOptions::new().default_ttl(Duration::from_secs(10)),
        )
        .await;

        s.edit().put_string("k", "v").unwrap().commit().await.unwrap();

        let raw = std::fs::read(store_file(&dir)).unwrap();
        let on_disk: TtlState = serde_json::from_slice(&raw).unwrap();
        let entry = on_disk.get("k").unwrap();
        assert_eq!(entry.expires_at, Some(15_000));
        // The requested duration is only recorded for per-key lifetimes.
        assert_eq!(entry.duration, None);
    }

    #[tokio::test]
    /// An entry flagged encrypted in a store with no value encryptor reads
    /// as its stored text.
    async fn test_encrypted_entry_without_encryptor_downgrades() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);

        let mut state = TtlState::new();
        state.insert(
            "k".to_string(),
            TtlEntry {
                key: "k".to_string(),
                value: "b3BhcXVl".to_string(),
                duration: None,
                expires_at: None,
                encrypted: true,
            },
        );
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(store_file(&dir), serde_json::to_vec(&state).unwrap()).unwrap();

        let s = open_with_clock(&dir, &clock, TtlOptions::new()).await;
        assert_eq!(s.get_string("k", "def").await, "b3BhcXVl");
    }

    #[tokio::test]
    /// Value-level encryption: plaintext never reaches disk, reads decrypt,
    /// and a store lacking the key falls back to the stored ciphertext text.
    async fn test_value_encryption_round_trip_and_downgrade() {
        let dir = tempdir::TempDir::new("ttl").unwrap();
        let clock = MockClock::at(0);
        let s = open_with_clock(
            &dir,
            &clock,
            TtlOptions::new().value_encryptor(Arc::new(AesGcmEncryptor::new("right"))),
        )
        .await;

        s.edit().put_string("token", "super-secret").unwrap().commit().await.unwrap();
        assert_eq!(s.get_string("token", "?").await, "super-secret");

        let raw = String::from_utf8(std::fs::read(store_file(&dir)).unwrap()).unwrap();
        assert!(!raw.contains("super-secret"), "{}", raw);
        assert!(raw.contains(r#""encrypted":true"#), "{}", raw);

        // Same cell, wrong value key: the read downgrades to the stored text.
        let paths = DirPathProvider::new(dir.path());
        let wrong = TtlStore::open(
            "ttldb",
            &paths,
            TtlOptions::new()
                .value_encryptor(Arc::new(AesGcmEncryptor::new("wrong")))
                .clock(Arc::new(clock.clone())),
        )
        .await
        .unwrap();
        let stored = wrong.get_string("token", "?").await;
        assert_ne!(stored, "super-secret");
        assert_ne!(stored, "?");
    }
}
