//! Scripted transport shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use super::ApiClient;
use crate::auth::SessionContext;
use crate::config::{ApiRevision, Config};

struct Script {
    method: Method,
    path: String,
    responses: VecDeque<HttpResponse>,
    last: Option<HttpResponse>,
}

/// Answers by method and path. Queued responses are served in order, then
/// the last one repeats. Unscripted requests get a 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on(&self, method: Method, path: &str, status: u16, body: &str) {
        let mut scripts = self.scripts.lock().unwrap();
        let response = HttpResponse::new(status, body);
        match scripts
            .iter_mut()
            .find(|s| s.method == method && s.path == path)
        {
            Some(script) => script.responses.push_back(response),
            None => scripts.push(Script {
                method,
                path: path.to_string(),
                responses: VecDeque::from([response]),
                last: None,
            }),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let method = request.method.clone();
        self.requests.lock().unwrap().push(request);

        let mut scripts = self.scripts.lock().unwrap();
        let response = scripts
            .iter_mut()
            .find(|s| s.method == method && s.path == path)
            .and_then(|script| {
                if let Some(next) = script.responses.pop_front() {
                    script.last = Some(next);
                }
                script.last.clone()
            });
        Ok(response.unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}

pub(crate) const BASE_URL: &str = "http://ci.test/api";

pub(crate) fn config(revision: ApiRevision) -> Config {
    Config {
        api_base_url: BASE_URL.to_string(),
        revision,
        ..Config::default()
    }
}

pub(crate) fn client(transport: Arc<ScriptedTransport>, revision: ApiRevision) -> ApiClient {
    ApiClient::with_transport(
        transport,
        &config(revision),
        Arc::new(SessionContext::in_memory()),
    )
}
