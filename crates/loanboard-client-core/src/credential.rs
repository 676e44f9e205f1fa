//! Bearer credential and its durable slot.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

/// Fixed key of the credential slot in the durable key-value state.
pub const CREDENTIAL_SLOT_KEY: &str = "loan_token";

/// Opaque bearer token. `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for blank tokens, which are treated as absent.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("failed to access credential store {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credential store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Durable home of at most one credential.
pub trait CredentialStore: Send + Sync {
    fn load_credential(&self) -> Result<Option<Credential>, CredentialStoreError>;
    fn persist_credential(&self, credential: &Credential) -> Result<(), CredentialStoreError>;
    fn clear_credential(&self) -> Result<(), CredentialStoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_credential(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let slot = self.slot.lock().map_err(|_| CredentialStoreError::Poisoned)?;
        Ok(slot.clone())
    }

    fn persist_credential(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        let mut slot = self.slot.lock().map_err(|_| CredentialStoreError::Poisoned)?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear_credential(&self) -> Result<(), CredentialStoreError> {
        let mut slot = self.slot.lock().map_err(|_| CredentialStoreError::Poisoned)?;
        *slot = None;
        Ok(())
    }
}

/// JSON key-value file; the credential lives under [`CREDENTIAL_SLOT_KEY`].
/// Other keys in the file are preserved.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>, CredentialStoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(CredentialStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|source| CredentialStoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_slots(&self, slots: &BTreeMap<String, String>) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CredentialStoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let encoded =
            serde_json::to_vec_pretty(slots).map_err(|source| CredentialStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        std::fs::write(&self.path, encoded).map_err(|source| CredentialStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_credential(&self) -> Result<Option<Credential>, CredentialStoreError> {
        let slots = self.read_slots()?;
        Ok(slots
            .get(CREDENTIAL_SLOT_KEY)
            .and_then(|token| Credential::new(token.as_str())))
    }

    fn persist_credential(&self, credential: &Credential) -> Result<(), CredentialStoreError> {
        let mut slots = self.read_slots()?;
        slots.insert(
            CREDENTIAL_SLOT_KEY.to_string(),
            credential.expose().to_string(),
        );
        self.write_slots(&slots)?;
        debug!(path = %self.path.display(), "credential persisted");
        Ok(())
    }

    fn clear_credential(&self) -> Result<(), CredentialStoreError> {
        let mut slots = self.read_slots()?;
        if slots.remove(CREDENTIAL_SLOT_KEY).is_none() {
            return Ok(());
        }
        self.write_slots(&slots)?;
        debug!(path = %self.path.display(), "credential cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_absent() {
        assert!(Credential::new("   ").is_none());
        assert_eq!(
            Credential::new(" abc ").map(|credential| credential.expose().to_string()),
            Some("abc".to_string())
        );
    }

    #[test]
    fn debug_output_redacts_token() {
        let credential = Credential::new("secret-token").expect("credential");
        assert!(!format!("{credential:?}").contains("secret-token"));
    }

    #[test]
    fn file_store_round_trips_and_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");
        let store = FileCredentialStore::new(&path);
        assert_eq!(store.load_credential().expect("load"), None);

        let credential = Credential::new("tok-1").expect("credential");
        store.persist_credential(&credential).expect("persist");

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.load_credential().expect("load"), Some(credential));

        reopened.clear_credential().expect("clear");
        assert_eq!(store.load_credential().expect("load"), None);
    }

    #[test]
    fn file_store_preserves_unrelated_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).expect("seed");

        let store = FileCredentialStore::new(&path);
        store
            .persist_credential(&Credential::new("tok-2").expect("credential"))
            .expect("persist");
        store.clear_credential().expect("clear");

        let raw = std::fs::read_to_string(&path).expect("read");
        assert!(raw.contains("theme"));
        assert!(!raw.contains(CREDENTIAL_SLOT_KEY));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").expect("seed");
        let store = FileCredentialStore::new(&path);
        assert!(matches!(
            store.load_credential(),
            Err(CredentialStoreError::Corrupt { .. })
        ));
    }
}
