use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use futures_util::StreamExt;
use log::info;

use kvs::crypto::{AesGcmEncryptor, Encryptor, PassThrough};
use kvs::document::DocumentStore;
use kvs::storage::{DirPathProvider, PathProvider};
use kvs::store::{Kvs, PreferenceStore, ValueKind};
use kvs::ttl::{KvsExtended, TtlOptions, TtlStore};

use crate::config::ConfigLoad;

/// The various kinds of commands that `command` can execute.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Read one key from a store.
    Get {
        store: String,
        key: String,
        #[clap(long, default_value = "")]
        /// Value printed when the key is absent (or expired).
        default: String,
        #[clap(long)]
        /// Treat the store as a TTL store.
        ttl: bool,
    },

    /// Write one key into a store.
    Set {
        store: String,
        key: String,
        value: String,
        #[clap(long, default_value = "string")]
        /// Value kind: 'string', 'i32', 'i64', 'f32', 'bool'.
        kind: String,
        #[clap(long)]
        /// Treat the store as a TTL store.
        ttl: bool,
        #[clap(long)]
        /// Per-key lifetime in seconds (implies --ttl).
        expire_secs: Option<u64>,
    },

    /// Remove one key from a store.
    Remove {
        store: String,
        key: String,
        #[clap(long)]
        ttl: bool,
    },

    /// Remove every entry of a store.
    Clear {
        store: String,
        #[clap(long)]
        ttl: bool,
    },

    /// List all live keys of a store.
    Keys {
        store: String,
        #[clap(long)]
        ttl: bool,
    },

    /// Print all live entries of a store.
    Dump {
        store: String,
        #[clap(long)]
        ttl: bool,
    },

    /// Remove expired entries of a TTL store, once.
    Expire { store: String },

    /// Read or replace a document store.
    Doc {
        #[clap(subcommand)]
        action: DocAction,
    },

    /// Follow a store and print every committed state until Ctrl-C.
    Watch {
        store: String,
        #[clap(long)]
        ttl: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum DocAction {
    Get { name: String },
    Set { name: String, text: String },
}

fn encryptor_from(cfg: &ConfigLoad) -> Arc<dyn Encryptor> {
    match cfg.encryption_key() {
        Some(key) => Arc::new(AesGcmEncryptor::new(key)),
        None => Arc::new(PassThrough::new()),
    }
}

async fn open_ttl(
    name: &str,
    paths: &dyn PathProvider,
    cfg: &ConfigLoad,
) -> Result<TtlStore> {
    let mut options = TtlOptions::new().encryptor(encryptor_from(cfg));
    if let Some(ttl) = cfg.default_ttl() {
        options = options.default_ttl(ttl);
    }
    Ok(TtlStore::open(name, paths, options).await?)
}

async fn open_plain(
    name: &str,
    paths: &dyn PathProvider,
    cfg: &ConfigLoad,
) -> Result<PreferenceStore> {
    Ok(PreferenceStore::open_encrypted(name, paths, encryptor_from(cfg)).await?)
}

fn parse_value(kind: &str, value: &str) -> Result<ValueKind> {
    Ok(match kind {
        "string" => ValueKind::String(value.to_string()),
        "i32" => ValueKind::Int32(value.parse()?),
        "i64" => ValueKind::Int64(value.parse()?),
        "f32" => ValueKind::Float32(value.parse()?),
        "bool" => ValueKind::Bool(value.parse()?),
        other => anyhow::bail!("unknown value kind: {}", other),
    })
}

fn print_state(state: &std::collections::BTreeMap<String, String>) {
    for (key, value) in state {
        println!("  {} = {}", key.blue(), value);
    }
}

/// Run a command against the configured store directory.
pub async fn run_pack(command: Command, cfg: &ConfigLoad) -> Result<()> {
    let paths = DirPathProvider::new(cfg.base_dir());

    match command {
        Command::Get { store, key, default, ttl } => {
            info!("Running get command on store {} key {}...", &store, &key);
            let value = if ttl {
                open_ttl(&store, &paths, cfg).await?.get_string(&key, &default).await
            } else {
                open_plain(&store, &paths, cfg).await?.get_string(&key, &default).await
            };
            println!("{}", value);
        }

        Command::Set { store, key, value, kind, ttl, expire_secs } => {
            info!("Running set command on store {} key {}...", &store, &key);
            let value = parse_value(&kind, &value)?;
            if ttl || expire_secs.is_some() {
                let s = open_ttl(&store, &paths, cfg).await?;
                s.edit()
                    .put(&key, value, expire_secs.map(Duration::from_secs))?
                    .commit()
                    .await?;
            } else {
                let s = open_plain(&store, &paths, cfg).await?;
                s.edit().put(&key, value)?.commit().await?;
            }
            println!("{}", "OK".green());
        }

        Command::Remove { store, key, ttl } => {
            info!("Running remove command on store {} key {}...", &store, &key);
            if ttl {
                let s = open_ttl(&store, &paths, cfg).await?;
                s.edit().remove(&key)?.commit().await?;
            } else {
                let s = open_plain(&store, &paths, cfg).await?;
                s.edit().remove(&key)?.commit().await?;
            }
            println!("{}", "OK".green());
        }

        Command::Clear { store, ttl } => {
            info!("Running clear command on store {}...", &store);
            if ttl {
                let s = open_ttl(&store, &paths, cfg).await?;
                s.edit().clear()?.commit().await?;
            } else {
                let s = open_plain(&store, &paths, cfg).await?;
                s.edit().clear()?.commit().await?;
            }
            println!("{}", "OK".green());
        }

        Command::Keys { store, ttl } => {
            let state = if ttl {
                open_ttl(&store, &paths, cfg).await?.get_all().await
            } else {
                open_plain(&store, &paths, cfg).await?.get_all().await
            };
            for key in state.keys() {
                println!("{}", key);
            }
        }

        Command::Dump { store, ttl } => {
            let state = if ttl {
                open_ttl(&store, &paths, cfg).await?.get_all().await
            } else {
                open_plain(&store, &paths, cfg).await?.get_all().await
            };
            println!("{} ({} entries)", store.bold(), state.len());
            print_state(&state);
        }

        Command::Expire { store } => {
            let removed = open_ttl(&store, &paths, cfg).await?.remove_expired().await?;
            println!("{} expired entries removed", removed);
        }

        Command::Doc { action } => match action {
            DocAction::Get { name } => {
                let doc =
                    DocumentStore::open_encrypted(&name, &paths, encryptor_from(cfg)).await?;
                println!("{}", doc.read().await);
            }
            DocAction::Set { name, text } => {
                let doc =
                    DocumentStore::open_encrypted(&name, &paths, encryptor_from(cfg)).await?;
                doc.write(&text).await?;
                println!("{}", "OK".green());
            }
        },

        Command::Watch { store, ttl } => {
            info!("Running watch command on store {}...", &store);
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                r.store(false, Ordering::SeqCst);
            })?;

            let mut stream = if ttl {
                open_ttl(&store, &paths, cfg).await?.get_all_as_stream()
            } else {
                open_plain(&store, &paths, cfg).await?.get_all_as_stream()
            };

            while running.load(Ordering::SeqCst) {
                match tokio::time::timeout(Duration::from_millis(200), stream.next()).await {
                    Ok(Some(state)) => {
                        println!(
                            "{} {} entries",
                            chrono::Local::now().format("%H:%M:%S"),
                            state.len().to_string().green()
                        );
                        print_state(&state);
                    }
                    Ok(None) => break,
                    Err(_) => continue,
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(
            parse_value("string", "hello").unwrap(),
            ValueKind::String("hello".to_string())
        );
        assert_eq!(parse_value("i32", "-3").unwrap(), ValueKind::Int32(-3));
        assert_eq!(parse_value("bool", "true").unwrap(), ValueKind::Bool(true));
        assert!(parse_value("i32", "abc").is_err());
        assert!(parse_value("blob", "x").is_err());
    }
}
