//! Secret persistence backends
//!
//! A [`SecretStore`] persists opaque byte records under account tags. Reading
//! an absent tag is `Ok(None)`, never an error. Writes replace the previous
//! record atomically.

use super::VaultError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Contract for secure secret storage
pub trait SecretStore: Send + Sync {
    fn write(&self, tag: &str, bytes: &[u8]) -> Result<(), VaultError>;

    fn read(&self, tag: &str) -> Result<Option<Vec<u8>>, VaultError>;
}

/// Process-local store, for tests and ephemeral sessions
#[derive(Default)]
pub struct MemorySecretStore {
    records: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn write(&self, tag: &str, bytes: &[u8]) -> Result<(), VaultError> {
        self.records.lock().insert(tag.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, tag: &str) -> Result<Option<Vec<u8>>, VaultError> {
        Ok(self.records.lock().get(tag).cloned())
    }
}

impl std::fmt::Debug for MemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySecretStore")
            .field("records", &"[REDACTED]")
            .finish()
    }
}

/// One file per tag inside a private directory.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader sees either the old record or the new one. On unix the directory is
/// 0700 and the files 0600.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, tag: &str) -> Result<PathBuf, VaultError> {
        if !is_valid_tag(tag) {
            return Err(VaultError::StorageFailure {
                code: -1,
                reason: format!("invalid account tag: {:?}", tag),
            });
        }
        Ok(self.dir.join(tag))
    }

    fn ensure_dir(&self) -> Result<(), VaultError> {
        fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn write(&self, tag: &str, bytes: &[u8]) -> Result<(), VaultError> {
        let path = self.path_for(tag)?;
        self.ensure_dir()?;

        let tmp = self.dir.join(format!(".{}.tmp", tag));
        {
            let mut options = fs::OpenOptions::new();
            options.create(true).write(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read(&self, tag: &str) -> Result<Option<Vec<u8>>, VaultError> {
        let path = self.path_for(tag)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && !tag.starts_with('.')
        && tag
            .bytes()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == b'.' || ch == b'-' || ch == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_reads_absent_as_none() {
        let store = MemorySecretStore::new();
        assert!(store.read("account.secret").unwrap().is_none());
        store.write("account.secret", b"abc").unwrap();
        assert_eq!(store.read("account.secret").unwrap(), Some(b"abc".to_vec()));
    }

    #[test]
    fn file_store_overwrites_records() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path().join("vault"));

        assert!(store.read("account.secret").unwrap().is_none());
        store.write("account.secret", b"first").unwrap();
        store.write("account.secret", b"second").unwrap();
        assert_eq!(
            store.read("account.secret").unwrap(),
            Some(b"second".to_vec())
        );
        assert!(!dir.path().join("vault/.account.secret.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path().join("vault"));
        store.write("account.secret", b"key").unwrap();

        let mode = fs::metadata(dir.path().join("vault/account.secret"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn file_store_rejects_path_like_tags() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path());
        assert!(store.write("../escape", b"x").is_err());
        assert!(store.read(".hidden").is_err());
        assert!(!is_valid_tag(""));
    }
}
