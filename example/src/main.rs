use std::time::Duration;

use kvs::error::KvResult;
use kvs::storage::DirPathProvider;
use kvs::store::{Kvs, PreferenceStore};
use kvs::ttl::{KvsExtended, TtlOptions, TtlStore};

#[tokio::main]
async fn main() {
    println!("Hello, kvs!");

    run().await.unwrap();

    println!("Bye~");
}

async fn run() -> KvResult<()> {
    let dir = tempdir::TempDir::new("demo")?;
    let paths = DirPathProvider::new(dir.path());

    // A plain preference store.
    let prefs = PreferenceStore::open("settings", &paths).await?;
    prefs
        .edit()
        .put_string("name", "Santiago")?
        .put_i32("age", 30)?
        .put_bool("premium", true)?
        .commit()
        .await?;

    assert_eq!(prefs.get_string("name", "?").await, "Santiago");
    assert_eq!(prefs.get_i32("age", 0).await, 30);
    assert!(prefs.get_bool("premium", false).await);
    assert_eq!(prefs.get_all().await.len(), 3);

    // A TTL store: the short-lived entry disappears, the plain one stays.
    let session = TtlStore::open("session", &paths, TtlOptions::new()).await?;
    session
        .edit()
        .put_string_ttl("token", "abc123", Duration::from_millis(100))?
        .put_string("user", "santiago")?
        .commit()
        .await?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.get_string("token", "gone").await, "gone");
    assert_eq!(session.get_string("user", "?").await, "santiago");

    let removed = session.remove_expired().await?;
    println!("swept {} expired entries", removed);

    Ok(())
}
