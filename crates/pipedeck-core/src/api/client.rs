//! API client for the pipeline platform REST API.
//!
//! `ApiClient` is the transport layer: every outbound call goes through
//! [`ApiClient::execute`], which attaches the session's bearer credential,
//! unwraps the configured response envelope, and handles failures centrally
//! (forced logout plus login redirect on 401, a notice for everything else)
//! before handing the error back to the caller.

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::transport::{HttpRequest, HttpTransport, ReqwestTransport, TransportError};
use super::ApiError;
use crate::auth::SessionContext;
use crate::config::{ApiRevision, Config, Envelope};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::router::Navigator;

/// Envelope `code` values that mean success
const SUCCESS_CODES: [i64; 2] = [0, 200];

/// A request relative to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    attach_credential: bool,
    expire_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            attach_credential: true,
            expire_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("could not encode request: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Send without the session credential. A 401 here is an ordinary
    /// failure and leaves the session alone (e.g. a rejected login).
    pub fn public(mut self) -> Self {
        self.attach_credential = false;
        self.expire_on_unauthorized = false;
        self
    }

    /// Send with the credential, but do not expire the session on 401.
    pub fn keep_session_on_unauthorized(mut self) -> Self {
        self.expire_on_unauthorized = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// API client for the pipeline platform.
/// Clone is cheap - all collaborators are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionContext>,
    notifier: Arc<dyn Notifier>,
    navigator: Option<Arc<dyn Navigator>>,
    base_url: String,
    envelope: Envelope,
    revision: ApiRevision,
}

impl ApiClient {
    /// Create a client over reqwest, bounded by the configured deadline.
    pub fn new(config: &Config, session: Arc<SessionContext>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout())
            .map_err(|e| ApiError::Network(format!("could not build HTTP client: {}", e)))?;
        Ok(Self::with_transport(Arc::new(transport), config, session))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        config: &Config,
        session: Arc<SessionContext>,
    ) -> Self {
        Self {
            transport,
            session,
            notifier: Arc::new(TracingNotifier),
            navigator: None,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            envelope: config.effective_envelope(),
            revision: config.revision,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn revision(&self) -> ApiRevision {
        self.revision
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Dispatch and deserialize the payload.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let payload = self.dispatch(request).await?;
        serde_json::from_value(payload).map_err(|e| {
            warn!(path = %path, error = %e, "Unexpected response shape");
            ApiError::InvalidResponse(format!("{}: {}", path, e))
        })
    }

    /// Dispatch and discard the payload.
    pub async fn execute_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.dispatch(request).await.map(|_| ())
    }

    /// Dispatch and return the unwrapped payload as raw JSON.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let expire_on_unauthorized = request.expire_on_unauthorized;
        let http = self.build(request)?;
        debug!(method = %http.method, url = %http.url, "Sending request");

        let response = match self.transport.send(http).await {
            Ok(response) => response,
            Err(e) => {
                let timed_out = matches!(e, TransportError::Timeout);
                warn!(error = %e, "Request failed without a response");
                self.notifier.notify(Notice::network(timed_out));
                return Err(match e {
                    TransportError::Timeout => ApiError::Timeout,
                    TransportError::Connection(message) => ApiError::Network(message),
                });
            }
        };

        if response.is_success() {
            return self.unwrap_payload(&response.body);
        }

        let error = ApiError::from_status(response.status, &response.body);
        debug!(status = response.status, error = %error, "Request rejected");
        self.handle_failure(&error, expire_on_unauthorized);
        Err(error)
    }

    fn build(&self, request: ApiRequest) -> Result<HttpRequest, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        if request.attach_credential {
            if let Some(token) = self.session.token().filter(|t| !t.is_empty()) {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ApiError::InvalidResponse(format!("invalid credential: {}", e)))?;
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        Ok(HttpRequest {
            method: request.method,
            url: format!("{}{}", self.base_url, request.path),
            headers,
            query: request.query,
            body: request.body,
        })
    }

    /// Centralised side effects for a failed response. Runs before the error
    /// reaches the caller.
    fn handle_failure(&self, error: &ApiError, expire_on_unauthorized: bool) {
        match error {
            ApiError::Unauthorized if expire_on_unauthorized => {
                let expired = self.session.expire();
                if expired {
                    warn!("Session rejected by server, logging out");
                }
                // The navigator is the de-duplication point: once it is on the
                // login page, further 401s neither navigate nor notify.
                let redirected = match self.navigator {
                    Some(ref navigator) => navigator.redirect_to_login(),
                    None => {
                        debug!("No navigator attached, skipping login redirect");
                        expired
                    }
                };
                if redirected {
                    self.notifier.notify(Notice::for_status(401));
                }
            }
            ApiError::Unauthorized => {}
            other => {
                if let Some(status) = other.status() {
                    self.notifier.notify(Notice::for_status(status));
                }
            }
        }
    }

    fn unwrap_payload(&self, body: &str) -> Result<Value, ApiError> {
        let value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(body)
                .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {}", e)))?
        };
        match self.envelope {
            Envelope::Bare => Ok(value),
            Envelope::Wrapped => unwrap_envelope(value),
        }
    }
}

/// Strip a `{code, data, msg}` wrapper. Bodies that carry neither `code` nor
/// `data` are passed through unchanged; some endpoints answer bare even on
/// wrapped revisions.
fn unwrap_envelope(value: Value) -> Result<Value, ApiError> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    let code = map.get("code").and_then(Value::as_i64);
    let errored = map.get("status").and_then(Value::as_str) == Some("error");
    if errored || code.is_some_and(|c| !SUCCESS_CODES.contains(&c)) {
        let message = ["msg", "message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        return Err(ApiError::Rejected {
            code: code.unwrap_or(-1),
            message,
        });
    }

    if code.is_some() || map.contains_key("data") {
        Ok(map.remove("data").unwrap_or(Value::Null))
    } else {
        Ok(Value::Object(map))
    }
}
