//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipedeck_core::api::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use pipedeck_core::auth::{MemoryStorage, SessionContext, SessionStore};
use pipedeck_core::notify::CollectingNotifier;
use pipedeck_core::{ApiClient, ApiRevision, Config, Router};

pub const BASE_URL: &str = "http://pipedeck.test/api";

pub const PROFILE: &str =
    r#"{"id":7,"username":"alice","email":"alice@example.com","name":"Alice","role":"admin"}"#;

type Reply = Result<HttpResponse, TransportError>;

#[derive(Default)]
struct Replies {
    queued: VecDeque<Reply>,
    last: Option<Reply>,
}

/// Canned replies keyed by `"METHOD /path"`, served in order. Once a key's
/// queue runs dry its last reply repeats; unknown keys answer 404.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, Replies>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, route: &str, status: u16, body: &str) {
        self.push(route, Ok(HttpResponse::new(status, body)));
    }

    pub fn fail(&self, route: &str, error: TransportError) {
        self.push(route, Err(error));
    }

    fn push(&self, route: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .queued
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to `route`, in order
    pub fn sent(&self, route: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| route_key(r) == route)
            .collect()
    }
}

fn route_key(request: &HttpRequest) -> String {
    let path = request.url.strip_prefix(BASE_URL).unwrap_or(&request.url);
    format!("{} {}", request.method, path)
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let key = route_key(&request);
        self.requests.lock().unwrap().push(request);
        // Let concurrently spawned requests interleave
        tokio::task::yield_now().await;

        let mut replies = self.replies.lock().unwrap();
        let Some(entry) = replies.get_mut(&key) else {
            return Ok(HttpResponse::new(404, ""));
        };
        if let Some(next) = entry.queued.pop_front() {
            entry.last = Some(next);
        }
        entry.last.clone().unwrap()
    }
}

/// Everything a test needs, wired the way the CLI wires it.
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<CollectingNotifier>,
    pub router: Arc<Router>,
    pub api: ApiClient,
    pub session: SessionStore,
}

impl Harness {
    pub fn new(revision: ApiRevision) -> Self {
        Self::with_storage(revision, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(revision: ApiRevision, storage: Arc<MemoryStorage>) -> Self {
        let transport = MockTransport::new();
        let notifier = Arc::new(CollectingNotifier::new());
        let router = Arc::new(Router::new());
        let context = Arc::new(SessionContext::new(storage.clone()));
        let config = Config {
            api_base_url: BASE_URL.to_string(),
            revision,
            ..Config::default()
        };
        let api = ApiClient::with_transport(transport.clone(), &config, context)
            .with_notifier(notifier.clone())
            .with_navigator(router.clone());
        let session = SessionStore::new(api.clone());
        Self {
            transport,
            storage,
            notifier,
            router,
            api,
            session,
        }
    }

    /// Log in as alice with token `tok123` on the classic revision paths.
    pub async fn logged_in() -> Self {
        let harness = Self::new(ApiRevision::Classic);
        harness
            .transport
            .reply("POST /auth/login", 200, r#"{"token":"tok123"}"#);
        harness.transport.reply("GET /auth/user", 200, PROFILE);
        harness
            .session
            .login("alice", "secret")
            .await
            .expect("login succeeds");
        harness
    }
}
