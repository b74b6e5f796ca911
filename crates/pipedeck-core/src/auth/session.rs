use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::context::{SessionContext, SessionStatus};
use super::error::SessionError;
use crate::api::{ApiClient, ApiError};
use crate::models::{ProfileUpdate, UserProfile};

/// Shown when the server rejects a login
const BAD_CREDENTIALS: &str = "Invalid username or password";

/// Login, logout and profile operations over the shared session context.
///
/// Clone is cheap; clones share the context and the last recorded error.
#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
    context: Arc<SessionContext>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        let context = api.session().clone();
        Self {
            api,
            context,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn is_authenticated(&self) -> bool {
        self.context.is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.context.status()
    }

    pub fn token(&self) -> Option<String> {
        self.context.token()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.context.profile()
    }

    /// Message of the most recent failed action, cleared when the next
    /// action starts.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_last_error(&self, message: Option<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    fn fail<T>(&self, error: SessionError) -> Result<T, SessionError> {
        self.set_last_error(Some(error.user_message()));
        Err(error)
    }

    /// Log in and load the profile. A rejected login leaves the previous
    /// session exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, SessionError> {
        self.set_last_error(None);
        if username.trim().is_empty() || password.is_empty() {
            return self.fail(SessionError::MissingCredentials);
        }

        let response = match self.api.login(username.trim(), password).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Login rejected");
                if e.is_unauthorized() {
                    self.set_last_error(Some(BAD_CREDENTIALS.to_string()));
                    return Err(e.into());
                }
                return self.fail(e.into());
            }
        };
        if response.token.is_empty() {
            return self.fail(ApiError::InvalidResponse("login returned no token".to_string()).into());
        }

        if let Err(e) = self.context.set_credential(response.token) {
            return self.fail(e.into());
        }
        info!(username = username.trim(), "Logged in");

        self.fetch_profile().await
    }

    /// Load the profile for the held credential. A 401 ends the session.
    pub async fn fetch_profile(&self) -> Result<UserProfile, SessionError> {
        self.set_last_error(None);
        let Some(token) = self.context.token().filter(|t| !t.is_empty()) else {
            return self.fail(SessionError::NotAuthenticated);
        };

        match self.api.current_user().await {
            Ok(profile) => {
                if let Err(e) = self.context.set_profile_for(&token, profile.clone()) {
                    return self.fail(e.into());
                }
                debug!(user_id = profile.id, "Profile loaded");
                Ok(profile)
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Profile fetch unauthorized, ending session");
                self.logout().await;
                self.fail(e.into())
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Send a partial profile update and merge it into the held profile.
    /// Fields absent from the update are kept.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, SessionError> {
        self.set_last_error(None);
        if !self.context.is_authenticated() {
            return self.fail(SessionError::NotAuthenticated);
        }

        let submitted = match update.to_fields() {
            Ok(fields) => fields,
            Err(e) => {
                return self.fail(
                    ApiError::InvalidResponse(format!("could not encode update: {}", e)).into(),
                )
            }
        };

        let echoed = match self.api.update_user(&Value::Object(submitted.clone())).await {
            Ok(value) => value,
            Err(e) => return self.fail(e.into()),
        };
        let fields = match echoed {
            Value::Object(map) if !map.is_empty() => map,
            _ => submitted,
        };

        match self.context.merge_profile(fields) {
            Ok(profile) => Ok(profile),
            Err(e) => self.fail(e),
        }
    }

    /// Change the password. The session itself is unaffected.
    pub async fn change_password(&self, old: &str, new: &str) -> Result<(), SessionError> {
        self.set_last_error(None);
        if let Err(e) = self.api.change_password(old, new).await {
            return self.fail(e.into());
        }
        info!("Password changed");
        Ok(())
    }

    /// End the session. The server is told when possible, but local state is
    /// cleared regardless.
    pub async fn logout(&self) {
        if self.context.is_authenticated() {
            if let Err(e) = self.api.logout().await {
                warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        if self.context.expire() {
            info!("Logged out");
        }
    }

    /// Load the durable session. When a credential is found the session is
    /// authenticated immediately and the profile is re-fetched in the
    /// background; the returned handle resolves with that fetch.
    pub fn restore_session(
        &self,
    ) -> Result<Option<JoinHandle<Result<UserProfile, SessionError>>>, SessionError> {
        self.set_last_error(None);
        match self.context.restore() {
            Ok(true) => {
                let store = self.clone();
                Ok(Some(tokio::spawn(async move { store.fetch_profile().await })))
            }
            Ok(false) => Ok(None),
            Err(e) => self.fail(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{config, ScriptedTransport};
    use crate::auth::{DurableStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
    use crate::config::ApiRevision;
    use reqwest::Method;

    const PROFILE: &str = r#"{"id":7,"username":"alice","email":"a@example.com","name":"Alice"}"#;

    fn store(transport: Arc<ScriptedTransport>) -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let context = Arc::new(SessionContext::new(storage.clone()));
        let api = ApiClient::with_transport(transport, &config(ApiRevision::Classic), context);
        (SessionStore::new(api), storage)
    }

    #[tokio::test]
    async fn test_login_stores_token_and_profile() {
        let transport = ScriptedTransport::new();
        transport.on(Method::POST, "/auth/login", 200, r#"{"token":"tok123"}"#);
        transport.on(Method::GET, "/auth/user", 200, PROFILE);
        let (store, storage) = store(transport.clone());

        let profile = store.login("alice", "secret").await.unwrap();

        assert_eq!(profile.username, "alice");
        assert_eq!(store.status(), SessionStatus::Authenticated);
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok123"));
        assert!(storage.get(USER_KEY).unwrap().is_some());
        assert_eq!(transport.last_request().authorization(), Some("Bearer tok123"));
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let transport = ScriptedTransport::new();
        let (store, _) = store(transport.clone());

        let err = store.login("  ", "secret").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingCredentials));
        assert_eq!(store.last_error().as_deref(), Some("Username and password required"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_without_token_is_invalid() {
        let transport = ScriptedTransport::new();
        transport.on(Method::POST, "/auth/login", 200, r#"{"user":null}"#);
        let (store, storage) = store(transport);

        assert!(store.login("alice", "secret").await.is_err());
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_profile_requires_session() {
        let (store, _) = store(ScriptedTransport::new());
        assert!(matches!(
            store.fetch_profile().await,
            Err(SessionError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_server_error_on_profile_keeps_session() {
        let transport = ScriptedTransport::new();
        transport.on(Method::POST, "/auth/login", 200, r#"{"token":"tok"}"#);
        transport.on(Method::GET, "/auth/user", 500, r#"{"msg":"db down"}"#);
        let (store, storage) = store(transport);

        let err = store.login("alice", "secret").await.unwrap_err();
        assert_eq!(err.kind(), Some(crate::api::ErrorKind::ServerError));
        assert_eq!(store.last_error().as_deref(), Some("db down"));
        assert!(store.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_update_profile_merges_submitted_fields_without_echo() {
        let transport = ScriptedTransport::new();
        transport.on(Method::POST, "/auth/login", 200, r#"{"token":"tok"}"#);
        transport.on(Method::GET, "/auth/user", 200, PROFILE);
        transport.on(Method::PUT, "/auth/user", 200, "");
        let (store, _) = store(transport.clone());
        store.login("alice", "secret").await.unwrap();

        let profile = store
            .update_profile(&ProfileUpdate::new().phone("555-0100"))
            .await
            .unwrap();

        assert_eq!(profile.attribute("phone").unwrap(), "555-0100");
        assert_eq!(profile.attribute("name").unwrap(), "Alice");
        assert_eq!(profile.email, "a@example.com");
        assert_eq!(
            transport.last_request().body,
            Some(serde_json::json!({"phone": "555-0100"}))
        );
    }

    #[tokio::test]
    async fn test_change_password_leaves_session_untouched() {
        let transport = ScriptedTransport::new();
        transport.on(Method::POST, "/auth/login", 200, r#"{"token":"tok"}"#);
        transport.on(Method::GET, "/auth/user", 200, PROFILE);
        transport.on(Method::PUT, "/auth/password", 400, r#"{"msg":"old password is wrong"}"#);
        let (store, _) = store(transport);
        let before = store.login("alice", "secret").await.unwrap();

        let err = store.change_password("bad", "new-secret").await.unwrap_err();

        assert_eq!(err.user_message(), "old password is wrong");
        assert_eq!(store.token().as_deref(), Some("tok"));
        assert_eq!(store.profile(), Some(before));
    }

    #[tokio::test]
    async fn test_logout_without_session_sends_nothing() {
        let transport = ScriptedTransport::new();
        let (store, _) = store(transport.clone());

        store.logout().await;
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_session_revalidates_in_background() {
        let transport = ScriptedTransport::new();
        transport.on(Method::GET, "/auth/user", 200, PROFILE);
        let (store, storage) = store(transport);
        storage.set(TOKEN_KEY, "saved").unwrap();

        let handle = store.restore_session().unwrap().expect("token was stored");
        assert!(store.is_authenticated());

        let profile = handle.await.unwrap().unwrap();
        assert_eq!(profile.id, 7);
        assert_eq!(store.profile().unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_restore_session_without_token() {
        let (store, _) = store(ScriptedTransport::new());
        assert!(store.restore_session().unwrap().is_none());
        assert_eq!(store.status(), SessionStatus::Anonymous);
    }
}
