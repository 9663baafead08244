//! Stream derivation helpers shared by every `…_as_stream` API.
//!
//! A cell broadcasts committed snapshots through a `tokio::sync::watch`
//! channel: the latest value is cached, new subscribers observe it
//! immediately, and a subscriber that lags skips intermediate states while
//! always seeing the latest one. Per-key streams are derived by mapping an
//! interpretation over the snapshot stream and filtering out consecutive
//! duplicates of the interpreted value.

use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Suppresses consecutive equal items. The comparison runs on the mapped
/// (interpreted) value, not on the underlying snapshot, so an unrelated
/// commit does not wake per-key subscribers.
pub fn distinct_until_changed<S>(stream: S) -> impl Stream<Item = S::Item>
where
    S: Stream,
    S::Item: Clone + PartialEq,
{
    async_stream::stream! {
        tokio::pin!(stream);
        let mut last: Option<S::Item> = None;
        while let Some(item) = stream.next().await {
            if last.as_ref() != Some(&item) {
                last = Some(item.clone());
                yield item;
            }
        }
    }
}

/// Derives a de-duplicated view from a snapshot receiver. The first item is
/// the interpretation of the current state; each committed state after that
/// yields a new item only when the interpretation changes.
pub fn derive<T, V, F>(rx: watch::Receiver<T>, mut interpret: F) -> impl Stream<Item = V>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + PartialEq,
    F: FnMut(&T) -> V,
{
    distinct_until_changed(WatchStream::new(rx).map(move |state| interpret(&state)))
}
