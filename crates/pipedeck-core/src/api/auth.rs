//! Authentication endpoints.
//!
//! Paths differ between API revisions; the payloads do not.

use serde_json::Value;
use tracing::debug;

use super::{ApiClient, ApiError, ApiRequest};
use crate::config::ApiRevision;
use crate::models::{LoginRequest, LoginResponse, PasswordChange, Registration, UserProfile};

/// Logout is served from the same path on every revision
const LOGOUT_PATH: &str = "/auth/logout";

struct AuthPaths {
    login: &'static str,
    user: &'static str,
    password: &'static str,
    register: &'static str,
}

const CLASSIC_PATHS: AuthPaths = AuthPaths {
    login: "/auth/login",
    user: "/auth/user",
    password: "/auth/password",
    register: "/auth/register",
};

const VERSIONED_PATHS: AuthPaths = AuthPaths {
    login: "/v1/user/login",
    user: "/v1/user/info",
    password: "/v1/user/password",
    register: "/v1/user/register",
};

fn paths(revision: ApiRevision) -> &'static AuthPaths {
    match revision {
        ApiRevision::Classic => &CLASSIC_PATHS,
        ApiRevision::Versioned => &VERSIONED_PATHS,
    }
}

impl ApiClient {
    /// Exchange credentials for a bearer token. Sent without any credential;
    /// a 401 here is a rejected login, not an expired session.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        debug!(username, "Logging in");
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = ApiRequest::post(paths(self.revision()).login)
            .public()
            .json(&body)?;
        self.execute(request).await
    }

    /// Tell the server the session is over. The caller clears local state
    /// whatever the outcome, so a 401 here must not trigger a second logout.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.execute_unit(ApiRequest::post(LOGOUT_PATH).keep_session_on_unauthorized())
            .await
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.execute(ApiRequest::get(paths(self.revision()).user))
            .await
    }

    /// Send a partial profile. Returns whatever the server echoes back,
    /// which may be the full profile, the accepted fields, or nothing.
    pub async fn update_user(&self, fields: &Value) -> Result<Value, ApiError> {
        let request = ApiRequest::put(paths(self.revision()).user).json(fields)?;
        self.dispatch(request).await
    }

    pub async fn change_password(&self, old: &str, new: &str) -> Result<(), ApiError> {
        let body = PasswordChange {
            old_password: old.to_string(),
            new_password: new.to_string(),
        };
        let request = ApiRequest::put(paths(self.revision()).password).json(&body)?;
        self.execute_unit(request).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post(paths(self.revision()).register)
            .public()
            .json(registration)?;
        self.execute_unit(request).await
    }
}
