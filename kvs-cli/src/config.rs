use std::path::PathBuf;

use serde_derive::{Deserialize, Serialize};

const DEFAULT_BASE_DIR: &str = "storage/kvsdb";
pub const DEFAULT_CONFIG_PATH: &str = "config/kvscli.toml";

/// load configration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLoad {
    version: u8,

    /// Directory holding the store files, default 'storage/kvsdb'.
    base_dir: Option<PathBuf>,

    /// Default entry lifetime for TTL stores, in seconds. Unset means
    /// entries without a per-key lifetime never expire.
    default_ttl_secs: Option<u64>,

    /// Passphrase for store-file encryption. Unset stores plain bytes.
    encryption_key: Option<String>,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            version: 0,
            base_dir: None,
            default_ttl_secs: None,
            encryption_key: None,
        }
    }
}

impl ConfigLoad {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        Ok(confy::load_path(path)?)
    }

    pub fn base_dir(&self) -> PathBuf {
        match self.base_dir.as_ref() {
            None => PathBuf::from(DEFAULT_BASE_DIR),
            Some(dir) => dir.clone(),
        }
    }

    pub fn set_base_dir(&mut self, dir: PathBuf) {
        self.base_dir = Some(dir);
    }

    pub fn default_ttl(&self) -> Option<std::time::Duration> {
        self.default_ttl_secs.map(std::time::Duration::from_secs)
    }

    pub fn encryption_key(&self) -> Option<&str> {
        self.encryption_key.as_deref()
    }
}
