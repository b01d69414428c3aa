//! Credential persistence and the session context built on top of it.
//!
//! The store is an opaque key-value map. [`SessionContext`] owns the
//! lifecycle: [`SessionContext::init`] reads whatever was persisted,
//! [`SessionContext::establish`] records a successful login, and
//! [`SessionContext::teardown`] forgets everything.

use parking_lot::{Mutex, RwLock};
use ragchat_shared::LoginResponse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";
pub const IS_ADMIN_KEY: &str = "is_admin";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("credential store at {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON map on disk, rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
    pub username: String,
    pub is_admin: bool,
}

pub struct SessionContext {
    store: Box<dyn CredentialStore>,
    current: RwLock<Option<Credentials>>,
}

impl SessionContext {
    pub fn init(store: Box<dyn CredentialStore>) -> Self {
        let token = store.get(TOKEN_KEY);
        let username = store.get(USERNAME_KEY);
        let current = match (token, username) {
            (None, None) => None,
            (token, username) => Some(Credentials {
                token,
                username: username.unwrap_or_else(|| "User".to_string()),
                is_admin: store.get(IS_ADMIN_KEY).as_deref() == Some("true"),
            }),
        };
        tracing::info!(
            authenticated = current.as_ref().is_some_and(|c| c.token.is_some()),
            "session context initialized"
        );
        Self {
            store,
            current: RwLock::new(current),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().and_then(|c| c.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn username(&self) -> String {
        self.current
            .read()
            .as_ref()
            .map(|c| c.username.clone())
            .unwrap_or_else(|| "User".to_string())
    }

    pub fn is_admin(&self) -> bool {
        self.current.read().as_ref().is_some_and(|c| c.is_admin)
    }

    pub fn establish(&self, login: &LoginResponse) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, &login.access_token)?;
        self.store.set(USERNAME_KEY, &login.username)?;
        self.store
            .set(IS_ADMIN_KEY, if login.is_admin { "true" } else { "false" })?;
        *self.current.write() = Some(Credentials {
            token: Some(login.access_token.clone()),
            username: login.username.clone(),
            is_admin: login.is_admin,
        });
        tracing::info!(username = %login.username, is_admin = login.is_admin, "credentials stored");
        Ok(())
    }

    /// Drops the bearer token but keeps the profile until teardown.
    pub fn revoke_token(&self) {
        if let Some(current) = self.current.write().as_mut() {
            current.token = None;
        }
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            tracing::warn!("failed to remove stored token: {e}");
        }
    }

    pub fn teardown(&self) {
        *self.current.write() = None;
        for key in [TOKEN_KEY, USERNAME_KEY, IS_ADMIN_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!("failed to remove stored {key}: {e}");
            }
        }
        tracing::info!("session context torn down");
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }
}
