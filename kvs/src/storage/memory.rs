use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

use crate::error::KvResult;
use crate::storage::{StateCell, Transform};

/// The non-persistent twin of [`crate::storage::PersistentCell`]: the same
/// snapshot/broadcast/update contract backed by memory alone. Used by the
/// in-memory store for tests and transient caches.
pub struct MemoryCell<T> {
    state_tx: watch::Sender<T>,

    write_lock: Mutex<()>,
}

impl<T> MemoryCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Arc<Self> {
        let (state_tx, _) = watch::channel(initial);
        Arc::new(MemoryCell { state_tx, write_lock: Mutex::new(()) })
    }

    pub fn snapshot(&self) -> WatchStream<T> {
        WatchStream::new(self.state_tx.subscribe())
    }
}

#[async_trait]
impl<T> StateCell<T> for MemoryCell<T>
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
        let _guard = self.write_lock.lock().await;
        let next = transform(&self.state_tx.borrow().clone());
        self.state_tx.send_replace(next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_and_read() {
        let cell = MemoryCell::new(0i64);
        let new = cell.update_data(Box::new(|v| v + 5)).await.unwrap();
        assert_eq!(new, 5);
        assert_eq!(cell.read(), 5);
    }

    #[tokio::test]
    async fn test_subscribers_observe_commits() {
        let cell = MemoryCell::new(0i64);
        let mut rx = cell.subscribe();
        assert_eq!(*rx.borrow_and_update(), 0);

        cell.update_data(Box::new(|v| v + 1)).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
