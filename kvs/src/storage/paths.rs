use std::path::PathBuf;

use crate::error::{Error, KvResult};

/// File extension shared by every store file.
pub const STORE_FILE_EXTENSION: &str = "preferences_pb";

/// Resolves a store name to the absolute file path backing it. The engine
/// never guesses where files live; hosts hand it a provider.
pub trait PathProvider: Send + Sync {
    fn resolve(&self, name: &str) -> KvResult<PathBuf>;
}

/// The default provider: `<base_dir>/<name>.preferences_pb`. The base
/// directory must be absolute and writable; missing intermediate directories
/// are created when the store file is first opened.
#[derive(Clone, Debug)]
pub struct DirPathProvider {
    base_dir: PathBuf,
}

impl DirPathProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        DirPathProvider { base_dir: base_dir.into() }
    }
}

impl PathProvider for DirPathProvider {
    fn resolve(&self, name: &str) -> KvResult<PathBuf> {
        if name.is_empty() {
            return Err(Error::Internal("store name must not be empty".to_string()));
        }
        if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::Internal(format!(
                "store name {:?} must not contain path separators",
                name
            )));
        }
        Ok(self.base_dir.join(format!("{}.{}", name, STORE_FILE_EXTENSION)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve() {
        let provider = DirPathProvider::new("/data/app");
        assert_eq!(
            provider.resolve("settings").unwrap(),
            PathBuf::from("/data/app/settings.preferences_pb")
        );
    }

    #[test]
    fn test_rejects_bad_names() {
        let provider = DirPathProvider::new("/data/app");
        assert!(provider.resolve("").is_err());
        assert!(provider.resolve("../escape").is_err());
    }
}
