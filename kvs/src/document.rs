use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::codec::StringCodec;
use crate::crypto::{Encryptor, PassThrough};
use crate::error::KvResult;
use crate::storage::{PathProvider, PersistentCell, Registry, StateCell};

/// A single-object document store: one opaque string, replaced wholesale.
///
/// The engine does not interpret the payload; callers wanting typed
/// documents serialize externally and wrap `read`/`write` in their own
/// decode/encode pair. On disk the value is its raw UTF-8 bytes, run through
/// the store's encryptor when one is configured. The default value is the
/// empty string.
#[derive(Clone)]
pub struct DocumentStore {
    cell: Arc<PersistentCell<String>>,
}

impl DocumentStore {
    pub async fn open(name: &str, paths: &dyn PathProvider) -> KvResult<Self> {
        Self::open_encrypted(name, paths, Arc::new(PassThrough::new())).await
    }

    pub async fn open_encrypted(
        name: &str,
        paths: &dyn PathProvider,
        encryptor: Arc<dyn Encryptor>,
    ) -> KvResult<Self> {
        let path = paths.resolve(name)?;
        let cell = Registry::global()
            .open_cell(path, Box::new(StringCodec::new()), encryptor)
            .await?;
        Ok(DocumentStore { cell })
    }

    /// The current document.
    pub async fn read(&self) -> String {
        self.cell.read()
    }

    /// Replaces the entire document atomically.
    pub async fn write(&self, text: &str) -> KvResult<()> {
        let text = text.to_string();
        self.cell.update_data(Box::new(move |_: &String| text)).await?;
        Ok(())
    }

    /// Emits the current document and then every committed replacement,
    /// de-duplicated on content.
    pub fn as_stream(&self) -> BoxStream<'static, String> {
        crate::stream::derive(self.cell.subscribe(), |text: &String| text.clone()).boxed()
    }

    /// The raw snapshot stream, in commit order.
    pub fn snapshot(&self) -> WatchStream<String> {
        self.cell.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt as _;

    use super::*;
    use crate::crypto::AesGcmEncryptor;
    use crate::storage::DirPathProvider;

    #[tokio::test]
    async fn test_default_is_empty() {
        let dir = tempdir::TempDir::new("doc").unwrap();
        let paths = DirPathProvider::new(dir.path());
        let doc = DocumentStore::open("empty", &paths).await.unwrap();
        assert_eq!(doc.read().await, "");
    }

    #[tokio::test]
    async fn test_write_read_and_reopen() {
        let dir = tempdir::TempDir::new("doc").unwrap();
        let paths = DirPathProvider::new(dir.path());

        let doc = DocumentStore::open("profile", &paths).await.unwrap();
        doc.write(r#"{"name":"Santiago","premium":true}"#).await.unwrap();
        assert_eq!(doc.read().await, r#"{"name":"Santiago","premium":true}"#);

        // The payload is stored as its raw bytes.
        let raw = std::fs::read(dir.path().join("profile.preferences_pb")).unwrap();
        assert_eq!(raw, br#"{"name":"Santiago","premium":true}"#);

        // A second handle shares the same cell.
        let again = DocumentStore::open("profile", &paths).await.unwrap();
        assert_eq!(again.read().await, r#"{"name":"Santiago","premium":true}"#);
    }

    #[tokio::test]
    async fn test_encrypted_document() {
        let dir = tempdir::TempDir::new("doc").unwrap();
        let paths = DirPathProvider::new(dir.path());

        let doc = DocumentStore::open_encrypted(
            "vault",
            &paths,
            Arc::new(AesGcmEncryptor::new("passphrase")),
        )
        .await
        .unwrap();
        doc.write("attack at dawn").await.unwrap();
        assert_eq!(doc.read().await, "attack at dawn");

        let raw = std::fs::read(dir.path().join("vault.preferences_pb")).unwrap();
        assert!(!raw.windows(14).any(|w| w == b"attack at dawn"));
    }

    #[tokio::test]
    async fn test_stream_dedups_identical_writes() {
        let dir = tempdir::TempDir::new("doc").unwrap();
        let paths = DirPathProvider::new(dir.path());
        let doc = DocumentStore::open("notes", &paths).await.unwrap();

        let mut stream = doc.as_stream();
        assert_eq!(stream.next().await.unwrap(), "");

        doc.write("v1").await.unwrap();
        assert_eq!(stream.next().await.unwrap(), "v1");

        doc.write("v1").await.unwrap();
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), stream.next())
                .await
                .is_err()
        );
    }
}
