use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::SessionError;
use super::storage::{DurableStorage, MemoryStorage, StorageError};
use crate::api::ApiError;
use crate::models::UserProfile;

/// Durable key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Durable key holding the JSON-serialized profile
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
}

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<String>,
    profile: Option<UserProfile>,
}

/// Credential and profile shared by the session store and the transport.
///
/// Every mutation updates durable storage and memory under the same lock, so
/// the durable copy never disagrees with memory once a call returns. The
/// lock is never held across an `.await`.
pub struct SessionContext {
    state: Mutex<SessionState>,
    storage: Arc<dyn DurableStorage>,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            storage,
        }
    }

    /// A context backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> Option<String> {
        self.lock().credential.clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.lock().profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock()
            .credential
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    /// Replace the credential. The previous profile belongs to the previous
    /// credential and is dropped.
    pub(crate) fn set_credential(&self, token: String) -> Result<(), StorageError> {
        let mut state = self.lock();
        // Profile first: a failed removal must leave the old token in place
        // on both sides.
        if state.credential.as_deref() != Some(token.as_str()) && state.profile.is_some() {
            self.storage.remove(USER_KEY)?;
            state.profile = None;
        }
        self.storage.set(TOKEN_KEY, &token)?;
        state.credential = Some(token);
        Ok(())
    }

    /// Store a freshly fetched profile, unless the credential it was fetched
    /// with has since been replaced or cleared. Returns whether it was stored.
    pub(crate) fn set_profile_for(
        &self,
        token: &str,
        profile: UserProfile,
    ) -> Result<bool, StorageError> {
        let mut state = self.lock();
        if state.credential.as_deref() != Some(token) {
            debug!("Discarding profile fetched with a stale credential");
            return Ok(false);
        }
        self.storage.set(USER_KEY, &serde_json::to_string(&profile)?)?;
        state.profile = Some(profile);
        Ok(true)
    }

    /// Shallow-merge `fields` into the held profile and persist the result.
    pub(crate) fn merge_profile(
        &self,
        fields: Map<String, Value>,
    ) -> Result<UserProfile, SessionError> {
        let mut state = self.lock();
        if state.credential.is_none() {
            return Err(SessionError::NotAuthenticated);
        }
        let mut profile = state.profile.clone().unwrap_or_default();
        profile
            .merge(fields)
            .map_err(|e| ApiError::InvalidResponse(format!("profile update: {}", e)))?;
        self.storage
            .set(USER_KEY, &serde_json::to_string(&profile).map_err(StorageError::from)?)?;
        state.profile = Some(profile.clone());
        Ok(profile)
    }

    /// Clear credential, profile and their durable copies.
    ///
    /// Always succeeds locally; storage failures are logged. Returns `true`
    /// only for the call that actually ended an authenticated session, so
    /// concurrent callers can tell which of them performed the transition.
    pub(crate) fn expire(&self) -> bool {
        let mut state = self.lock();
        let was_authenticated = state
            .credential
            .take()
            .is_some_and(|token| !token.is_empty());
        state.profile = None;
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear durable session key");
            }
        }
        was_authenticated
    }

    /// Load credential and profile from durable storage. Returns whether a
    /// credential was found.
    pub(crate) fn restore(&self) -> Result<bool, StorageError> {
        let mut state = self.lock();
        let token = self
            .storage
            .get(TOKEN_KEY)?
            .filter(|token| !token.is_empty());

        let profile = match self.storage.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable stored profile");
                    self.storage.remove(USER_KEY)?;
                    None
                }
            },
            None => None,
        };

        let found = token.is_some();
        state.profile = if found { profile } else { None };
        state.credential = token;
        debug!(found, has_profile = state.profile.is_some(), "Session restored");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> (Arc<MemoryStorage>, SessionContext) {
        let storage = Arc::new(MemoryStorage::new());
        let context = SessionContext::new(storage.clone());
        (storage, context)
    }

    fn profile(id: u64) -> UserProfile {
        UserProfile {
            id,
            username: format!("user{}", id),
            ..UserProfile::default()
        }
    }

    #[test]
    fn test_set_credential_writes_through() {
        let (storage, context) = context();
        assert_eq!(context.status(), SessionStatus::Anonymous);

        context.set_credential("tok123".to_string()).unwrap();
        assert!(context.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok123"));
    }

    /// Memory storage whose removals fail once switched on.
    #[derive(Default)]
    struct StuckStorage {
        inner: MemoryStorage,
        fail_removals: std::sync::atomic::AtomicBool,
    }

    impl DurableStorage for StuckStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            if self.fail_removals.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::other("read-only").into());
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_credential_swap_keeps_storage_and_memory_in_sync() {
        let storage = Arc::new(StuckStorage::default());
        let context = SessionContext::new(storage.clone());
        context.set_credential("a".to_string()).unwrap();
        context.set_profile_for("a", profile(1)).unwrap();
        storage
            .fail_removals
            .store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(context.set_credential("b".to_string()).is_err());

        assert_eq!(context.token().as_deref(), Some("a"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), context.token());
        assert_eq!(context.profile().map(|p| p.id), Some(1));
        assert!(storage.get(USER_KEY).unwrap().is_some());
    }

    #[test]
    fn test_empty_credential_is_anonymous() {
        let (_, context) = context();
        context.set_credential(String::new()).unwrap();
        assert_eq!(context.status(), SessionStatus::Anonymous);
        assert!(!context.expire());
    }

    #[test]
    fn test_expire_reports_transition_once() {
        let (storage, context) = context();
        context.set_credential("tok".to_string()).unwrap();
        context.set_profile_for("tok", profile(1)).unwrap();

        assert!(context.expire());
        assert!(!context.expire());
        assert!(context.profile().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_stale_profile_is_discarded() {
        let (_, context) = context();
        context.set_credential("new".to_string()).unwrap();
        assert!(!context.set_profile_for("old", profile(1)).unwrap());
        assert!(context.profile().is_none());
    }

    #[test]
    fn test_new_credential_drops_previous_profile() {
        let (storage, context) = context();
        context.set_credential("a".to_string()).unwrap();
        context.set_profile_for("a", profile(1)).unwrap();

        context.set_credential("b".to_string()).unwrap();
        assert!(context.profile().is_none());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_merge_profile_persists() {
        let (storage, context) = context();
        context.set_credential("tok".to_string()).unwrap();
        context.set_profile_for("tok", profile(5)).unwrap();

        let mut fields = Map::new();
        fields.insert("email".to_string(), json!("x@example.com"));
        let merged = context.merge_profile(fields).unwrap();

        assert_eq!(merged.email, "x@example.com");
        assert_eq!(merged.username, "user5");
        let stored: UserProfile =
            serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, merged);
    }

    #[test]
    fn test_merge_requires_session() {
        let (_, context) = context();
        assert!(matches!(
            context.merge_profile(Map::new()),
            Err(SessionError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_restore_reads_durable_copy() {
        let (storage, context) = context();
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage
            .set(USER_KEY, &serde_json::to_string(&profile(9)).unwrap())
            .unwrap();

        assert!(context.restore().unwrap());
        assert_eq!(context.token().as_deref(), Some("tok"));
        assert_eq!(context.profile().unwrap().id, 9);
    }

    #[test]
    fn test_restore_drops_unreadable_profile() {
        let (storage, context) = context();
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage.set(USER_KEY, "{broken").unwrap();

        assert!(context.restore().unwrap());
        assert!(context.profile().is_none());
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_restore_without_token_is_anonymous() {
        let (storage, context) = context();
        storage
            .set(USER_KEY, &serde_json::to_string(&profile(1)).unwrap())
            .unwrap();
        assert!(!context.restore().unwrap());
        assert!(context.profile().is_none());
    }
}
