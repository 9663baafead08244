use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crate::error::{Error, KvResult};
use crate::storage::StateCell;
use crate::store::value::ValueKind;
use crate::store::KvState;

/// Editor lifecycle. `Committed` and `Failed` are terminal; an editor is
/// single-use. Shared with the TTL editor, which runs the same state
/// machine over its own accumulators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum EditorState {
    Open,
    Committing,
    Committed,
    Failed,
}

/// Pending mutations. A put wins over an earlier remove of the same key and
/// vice versa; a clear discards everything recorded before it.
#[derive(Default)]
struct Accumulators {
    clear_all: bool,
    removals: BTreeSet<String>,
    additions: BTreeMap<String, String>,
}

/// A single-use builder of one batched commit.
///
/// Mutations are valid only while the editor is open; `commit` snapshots the
/// accumulated mutations and applies them through the cell's atomic
/// `update_data`, so readers observe either none or all of them. After a
/// commit, successful or not, every further call fails with `InvalidState`.
///
/// An editor is not meant to be shared across tasks; the internal lock only
/// exists so concurrent misuse fails deterministically instead of racing.
pub struct Editor {
    cell: Arc<dyn StateCell<KvState>>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: EditorState,
    acc: Accumulators,
}

impl Editor {
    pub(crate) fn new(cell: Arc<dyn StateCell<KvState>>) -> Self {
        Editor {
            cell,
            inner: Mutex::new(Inner { state: EditorState::Open, acc: Accumulators::default() }),
        }
    }

    pub fn put(&self, key: &str, value: ValueKind) -> KvResult<&Self> {
        if key.is_empty() {
            return Err(Error::InvalidState("key must not be empty".to_string()));
        }
        self.mutate(|acc| {
            acc.removals.remove(key);
            acc.additions.insert(key.to_string(), value.render());
        })
    }

    pub fn put_string(&self, key: &str, value: &str) -> KvResult<&Self> {
        self.put(key, ValueKind::String(value.to_string()))
    }

    pub fn put_i32(&self, key: &str, value: i32) -> KvResult<&Self> {
        self.put(key, ValueKind::Int32(value))
    }

    pub fn put_i64(&self, key: &str, value: i64) -> KvResult<&Self> {
        self.put(key, ValueKind::Int64(value))
    }

    pub fn put_f32(&self, key: &str, value: f32) -> KvResult<&Self> {
        self.put(key, ValueKind::Float32(value))
    }

    pub fn put_bool(&self, key: &str, value: bool) -> KvResult<&Self> {
        self.put(key, ValueKind::Bool(value))
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

    /// Applies the accumulated mutations as one atomic commit. Exactly one
    /// state replacement and one snapshot emission result from a successful
    /// commit; on failure nothing persists and the editor is dead.
    pub async fn commit(&self) -> KvResult<()> {
        let snapshot = {
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

        let result = self
            .cell
            .update_data(Box::new(move |state| apply(state, &snapshot)))
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

/// Builds the next state from the current one and a mutation snapshot:
/// start empty on clear, apply removals, then apply additions.
fn apply(state: &KvState, snapshot: &Accumulators) -> KvState {
    let mut next = if snapshot.clear_all { KvState::new() } else { state.clone() };
    for key in &snapshot.removals {
        next.remove(key);
    }
    for (key, value) in &snapshot.additions {
        next.insert(key.clone(), value.clone());
    }
    next
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::watch;

    use super::*;
    use crate::storage::{MemoryCell, Transform};

    fn editor() -> (Arc<MemoryCell<KvState>>, Editor) {
        let cell = MemoryCell::new(KvState::new());
        let editor = Editor::new(cell.clone());
        (cell, editor)
    }

    #[tokio::test]
    async fn test_batched_mutations() -> KvResult<()> {
        let (cell, editor) = editor();
        editor
            .put_string("name", "Santiago")?
            .put_i32("age", 30)?
            .put_bool("premium", true)?
            .commit()
            .await?;

        let state = cell.read();
        assert_eq!(state.get("name").map(String::as_str), Some("Santiago"));
        assert_eq!(state.get("age").map(String::as_str), Some("30"));
        assert_eq!(state.get("premium").map(String::as_str), Some("true"));
        Ok(())
    }

    #[tokio::test]
    async fn test_single_use() -> KvResult<()> {
        let (_cell, editor) = editor();
        editor.put_string("x", "y")?.commit().await?;

        assert!(matches!(editor.put_string("a", "b"), Err(Error::InvalidState(_))));
        assert!(matches!(editor.remove("x"), Err(Error::InvalidState(_))));
        assert!(matches!(editor.clear(), Err(Error::InvalidState(_))));
        assert!(matches!(editor.commit().await, Err(Error::InvalidState(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_put_and_remove_cancel_out() -> KvResult<()> {
        let (cell, editor) = editor();
        editor.put_string("a", "1")?.remove("a")?.commit().await?;
        assert!(!cell.read().contains_key("a"));

        let editor = Editor::new(cell.clone());
        editor.remove("b")?.put_string("b", "2")?.commit().await?;
        assert_eq!(cell.read().get("b").map(String::as_str), Some("2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_discards_earlier_mutations() -> KvResult<()> {
        let (cell, _) = editor();
        let seed = Editor::new(cell.clone());
        seed.put_string("old", "1")?.commit().await?;

        let editor = Editor::new(cell.clone());
        editor.put_string("before", "x")?.clear()?.put_string("after", "y")?.commit().await?;

        let state = cell.read();
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("after").map(String::as_str), Some("y"));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_applies_before_additions() -> KvResult<()> {
        let (cell, _) = editor();
        let seed = Editor::new(cell.clone());
        seed.put_string("a", "1")?.put_string("b", "2")?.commit().await?;

        let editor = Editor::new(cell.clone());
        editor.remove("a")?.put_string("c", "3")?.commit().await?;

        let state = cell.read();
        assert!(!state.contains_key("a"));
        assert_eq!(state.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let (_cell, editor) = editor();
        assert!(matches!(editor.put_string("", "v"), Err(Error::InvalidState(_))));
    }

    /// A cell whose update always fails, for exercising the Failed state.
    struct BrokenCell {
        state_tx: watch::Sender<KvState>,
    }

    #[async_trait]
    impl StateCell<KvState> for BrokenCell {
        fn read(&self) -> KvState {
            self.state_tx.borrow().clone()
        }

        fn subscribe(&self) -> watch::Receiver<KvState> {
            self.state_tx.subscribe()
        }

        async fn update_data(&self, _transform: Transform<KvState>) -> KvResult<KvState> {
            Err(Error::Write("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_commit_failure_is_terminal() -> KvResult<()> {
        let (state_tx, _) = watch::channel(KvState::new());
        let editor = Editor::new(Arc::new(BrokenCell { state_tx }));

        editor.put_string("a", "1")?;
        assert!(matches!(editor.commit().await, Err(Error::Write(_))));

        // Failed is terminal: no retry, no further mutation.
        assert!(matches!(editor.put_string("b", "2"), Err(Error::InvalidState(_))));
        assert!(matches!(editor.commit().await, Err(Error::InvalidState(_))));
        Ok(())
    }
}
