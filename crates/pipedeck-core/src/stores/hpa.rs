use std::sync::{Arc, Mutex};

use tracing::info;

use super::{lock, LoadingGuard};
use crate::api::{ApiClient, ApiError};
use crate::models::{HpaPolicy, NewHpaPolicy, PageQuery};

#[derive(Debug, Clone, Default)]
pub struct HpaState {
    pub policies: Vec<HpaPolicy>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Horizontal pod autoscaler policies.
#[derive(Clone)]
pub struct HpaStore {
    api: ApiClient,
    state: Arc<Mutex<HpaState>>,
}

fn loading(state: &mut HpaState) -> &mut bool {
    &mut state.loading
}

impl HpaStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(HpaState::default())),
        }
    }

    pub fn snapshot(&self) -> HpaState {
        lock(&self.state).clone()
    }

    pub fn policies(&self) -> Vec<HpaPolicy> {
        lock(&self.state).policies.clone()
    }

    fn record<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        let mut state = lock(&self.state);
        state.error = result.as_ref().err().map(ApiError::user_message);
        drop(state);
        result
    }

    pub async fn fetch_policies(&self, query: PageQuery) -> Result<Vec<HpaPolicy>, ApiError> {
        let _loading = LoadingGuard::start(&self.state, loading);
        let page = self.record(self.api.list_hpa_policies(query).await)?;
        lock(&self.state).policies = page.list.clone();
        Ok(page.list)
    }

    /// Create a policy after checking it locally.
    pub async fn create_policy(&self, policy: &NewHpaPolicy) -> Result<HpaPolicy, ApiError> {
        if let Err(message) = policy.validate() {
            return self.record(Err(ApiError::Validation {
                status: 0,
                body: message,
            }));
        }
        let _loading = LoadingGuard::start(&self.state, loading);
        let created = self.record(self.api.create_hpa_policy(policy).await)?;
        info!(name = %created.name, namespace = %created.namespace, "HPA policy created");
        lock(&self.state).policies.push(created.clone());
        Ok(created)
    }
}
