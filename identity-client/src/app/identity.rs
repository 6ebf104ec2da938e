//! # Identity Persistence
//!
//! The anonymous user id lives in two slots, a cookie and local storage, so
//! that clearing one does not lose the identity. Reads prefer the cookie;
//! whichever slot is missing is rewritten from the other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lib_utils::validate_user_id;
use parking_lot::Mutex;
use shared::UserIdentity;
use uuid::Uuid;

use crate::app::state::SessionAction;
use crate::app::store::SessionStore;
use crate::core::error::{ApiError, StorageError};
use crate::core::service::IdentityApi;

pub const USER_ID_KEY: &str = "user_id";
pub const ORIGINAL_REFERRER_KEY: &str = "original_referrer";

/// Flat string key/value slot: a cookie jar or a local-storage area.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON object on disk. Every write rewrites the whole file.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// New user id: lowercase hyphenated UUID v4.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Redundant persistence of the user id across the cookie and local-storage
/// slots.
#[derive(Clone)]
pub struct IdentityStore {
    cookies: Arc<dyn KeyValueStorage>,
    local: Arc<dyn KeyValueStorage>,
}

impl IdentityStore {
    pub fn new(cookies: Arc<dyn KeyValueStorage>, local: Arc<dyn KeyValueStorage>) -> Self {
        Self { cookies, local }
    }

    /// Both slots in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    /// `cookies.json` and `local_storage.json` under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            Arc::new(FileStorage::new(dir.join("cookies.json"))),
            Arc::new(FileStorage::new(dir.join("local_storage.json"))),
        )
    }

    pub fn cookies(&self) -> &Arc<dyn KeyValueStorage> {
        &self.cookies
    }

    /// Stored id, cookie first. Malformed values count as absent.
    pub fn load(&self) -> Result<Option<String>, StorageError> {
        let from_cookie = valid_id(self.cookies.get(USER_ID_KEY)?);
        let from_local = valid_id(self.local.get(USER_ID_KEY)?);

        let id = match (from_cookie, from_local) {
            (Some(cookie), local) => {
                if local.as_deref() != Some(cookie.as_str()) {
                    tracing::debug!("Restoring local storage user id from cookie");
                    self.local.set(USER_ID_KEY, &cookie)?;
                }
                Some(cookie)
            }
            (None, Some(local)) => {
                tracing::debug!("Restoring cookie user id from local storage");
                self.cookies.set(USER_ID_KEY, &local)?;
                Some(local)
            }
            (None, None) => None,
        };
        Ok(id)
    }

    pub fn persist(&self, user_id: &str) -> Result<(), StorageError> {
        self.cookies.set(USER_ID_KEY, user_id)?;
        self.local.set(USER_ID_KEY, user_id)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.cookies.remove(USER_ID_KEY)?;
        self.local.remove(USER_ID_KEY)?;
        Ok(())
    }

    /// Stored id, or a freshly generated one that is persisted immediately.
    pub fn load_or_create(&self) -> Result<String, StorageError> {
        if let Some(id) = self.load()? {
            return Ok(id);
        }
        let id = generate_user_id();
        tracing::info!(user_id = %id, "Generated new anonymous user id");
        self.persist(&id)?;
        Ok(id)
    }
}

fn valid_id(value: Option<String>) -> Option<String> {
    let value = value?;
    match validate_user_id(&value) {
        Ok(()) => Some(value),
        Err(reason) => {
            tracing::warn!(%reason, "Ignoring malformed stored user id");
            None
        }
    }
}

/// Resolve the user id, make sure the backend has a record for it, and load
/// that record into the store.
#[tracing::instrument(skip_all)]
pub async fn bootstrap_identity(
    identity: &IdentityStore,
    api: &dyn IdentityApi,
    store: &SessionStore,
) -> crate::core::error::Result<UserIdentity> {
    let user_id = identity.load_or_create()?;

    let user = api.fetch_user(&user_id).await.map_err(|err: ApiError| {
        tracing::warn!(user_id = %user_id, error = %err, "Failed to load user record");
        err
    })?;

    if user.id != user_id {
        // Backend answered with a canonical record for another id
        identity.persist(&user.id)?;
    }

    store.dispatch(SessionAction::UserLoaded(user.clone()));
    tracing::info!(user_id = %user.id, wallets = user.wallets.len(), "Identity loaded");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeApi;

    const ID_A: &str = "3f2b8c1e-4d5a-4b6c-8d7e-9f0a1b2c3d4e";
    const ID_B: &str = "a1b2c3d4-e5f6-4a7b-9c8d-0e1f2a3b4c5d";

    fn slots() -> (Arc<MemoryStorage>, Arc<MemoryStorage>, IdentityStore) {
        let cookies = Arc::new(MemoryStorage::new());
        let local = Arc::new(MemoryStorage::new());
        let store = IdentityStore::new(cookies.clone(), local.clone());
        (cookies, local, store)
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let id = generate_user_id();
        assert!(validate_user_id(&id).is_ok());
        assert_ne!(id, generate_user_id());
    }

    #[test]
    fn test_cookie_wins_and_heals_local() {
        let (cookies, local, store) = slots();
        cookies.set(USER_ID_KEY, ID_A).unwrap();
        local.set(USER_ID_KEY, ID_B).unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some(ID_A));
        assert_eq!(local.get(USER_ID_KEY).unwrap().as_deref(), Some(ID_A));
    }

    #[test]
    fn test_local_restores_missing_cookie() {
        let (cookies, local, store) = slots();
        local.set(USER_ID_KEY, ID_B).unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some(ID_B));
        assert_eq!(cookies.get(USER_ID_KEY).unwrap().as_deref(), Some(ID_B));
    }

    #[test]
    fn test_malformed_values_are_ignored() {
        let (cookies, local, store) = slots();
        cookies.set(USER_ID_KEY, "not-a-uuid").unwrap();
        local.set(USER_ID_KEY, &ID_A.to_uppercase()).unwrap();

        assert_eq!(store.load().unwrap(), None);

        let id = store.load_or_create().unwrap();
        assert!(validate_user_id(&id).is_ok());
        assert_eq!(cookies.get(USER_ID_KEY).unwrap(), Some(id.clone()));
        assert_eq!(local.get(USER_ID_KEY).unwrap(), Some(id));
    }

    #[test]
    fn test_clear_removes_both_slots() {
        let (_, _, store) = slots();
        store.persist(ID_A).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = IdentityStore::in_dir(dir.path());
        let id = store.load_or_create().unwrap();

        let reopened = IdentityStore::in_dir(dir.path());
        assert_eq!(reopened.load().unwrap(), Some(id));
    }

    #[test]
    fn test_file_storage_remove_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let storage = FileStorage::new(&path);

        assert_eq!(storage.get("missing").unwrap(), None);
        storage.set(ORIGINAL_REFERRER_KEY, "https://example.com").unwrap();
        storage.set("other", "value").unwrap();
        storage.remove(ORIGINAL_REFERRER_KEY).unwrap();
        assert_eq!(storage.get(ORIGINAL_REFERRER_KEY).unwrap(), None);
        assert_eq!(storage.get("other").unwrap().as_deref(), Some("value"));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(storage.get("other"), Err(StorageError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_bootstrap_creates_and_loads_user() {
        let identity = IdentityStore::in_memory();
        let api = FakeApi::new();
        let store = SessionStore::new();

        let user = bootstrap_identity(&identity, &api, &store).await.unwrap();

        assert_eq!(store.user_id(), Some(user.id.clone()));
        assert_eq!(identity.load().unwrap(), Some(user.id));
        assert_eq!(api.count("fetch_user"), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_reuses_stored_id() {
        let identity = IdentityStore::in_memory();
        identity.persist(ID_A).unwrap();
        let api = FakeApi::new();
        let store = SessionStore::new();

        let user = bootstrap_identity(&identity, &api, &store).await.unwrap();
        assert_eq!(user.id, ID_A);
    }
}
