use std::sync::{Arc, Mutex};

use futures::future::try_join;
use tracing::{debug, info};

use super::{lock, LoadingGuard};
use crate::api::{ApiClient, ApiError};
use crate::models::{
    Activity, DashboardStats, NewPipeline, Page, PageQuery, Pipeline, PipelineRun,
    PipelineUpdate, TriggerRequest,
};

#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub pipelines: Vec<Pipeline>,
    /// Server-side total for the last listing
    pub total: i64,
    pub current: Option<Pipeline>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Pipeline listing and the pipeline currently being viewed.
#[derive(Clone)]
pub struct PipelineStore {
    api: ApiClient,
    state: Arc<Mutex<PipelineState>>,
}

fn loading(state: &mut PipelineState) -> &mut bool {
    &mut state.loading
}

impl PipelineStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(PipelineState::default())),
        }
    }

    pub fn snapshot(&self) -> PipelineState {
        lock(&self.state).clone()
    }

    pub fn pipelines(&self) -> Vec<Pipeline> {
        lock(&self.state).pipelines.clone()
    }

    pub fn current(&self) -> Option<Pipeline> {
        lock(&self.state).current.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    fn begin(&self) -> LoadingGuard<'_, PipelineState> {
        lock(&self.state).error = None;
        LoadingGuard::start(&self.state, loading)
    }

    fn record<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ref e) = result {
            debug!(error = %e, "Pipeline action failed");
            lock(&self.state).error = Some(e.user_message());
        }
        result
    }

    pub async fn fetch_pipelines(&self, query: PageQuery) -> Result<Page<Pipeline>, ApiError> {
        let _loading = self.begin();
        let page = self.record(self.api.list_pipelines(query).await)?;
        let mut state = lock(&self.state);
        state.pipelines = page.list.clone();
        state.total = page.total;
        Ok(page)
    }

    pub async fn fetch_pipeline(&self, id: u64) -> Result<Pipeline, ApiError> {
        let _loading = self.begin();
        let pipeline = self.record(self.api.get_pipeline(id).await)?;
        lock(&self.state).current = Some(pipeline.clone());
        Ok(pipeline)
    }

    pub async fn create_pipeline(&self, pipeline: &NewPipeline) -> Result<Pipeline, ApiError> {
        let _loading = self.begin();
        let created = self.record(self.api.create_pipeline(pipeline).await)?;
        info!(id = created.id, name = %created.name, "Pipeline created");
        let mut state = lock(&self.state);
        state.pipelines.push(created.clone());
        state.total += 1;
        Ok(created)
    }

    pub async fn update_pipeline(
        &self,
        id: u64,
        update: &PipelineUpdate,
    ) -> Result<Pipeline, ApiError> {
        let _loading = self.begin();
        let updated = self.record(self.api.update_pipeline(id, update).await)?;
        let mut state = lock(&self.state);
        if let Some(slot) = state.pipelines.iter_mut().find(|p| p.id == id) {
            *slot = updated.clone();
        }
        if state.current.as_ref().is_some_and(|p| p.id == id) {
            state.current = Some(updated.clone());
        }
        Ok(updated)
    }

    pub async fn delete_pipeline(&self, id: u64) -> Result<(), ApiError> {
        let _loading = self.begin();
        self.record(self.api.delete_pipeline(id).await)?;
        info!(id, "Pipeline deleted");
        let mut state = lock(&self.state);
        let before = state.pipelines.len();
        state.pipelines.retain(|p| p.id != id);
        if state.pipelines.len() < before {
            state.total = (state.total - 1).max(0);
        }
        if state.current.as_ref().is_some_and(|p| p.id == id) {
            state.current = None;
        }
        Ok(())
    }

    pub async fn trigger_pipeline(
        &self,
        id: u64,
        trigger: &TriggerRequest,
    ) -> Result<Option<PipelineRun>, ApiError> {
        let _loading = self.begin();
        let run = self.record(self.api.trigger_pipeline(id, trigger).await)?;
        info!(id, run_id = run.as_ref().map(|r| r.id), "Pipeline triggered");
        Ok(run)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let _loading = self.begin();
        self.record(self.api.dashboard_stats().await)
    }

    pub async fn dashboard_activities(&self, limit: u32) -> Result<Vec<Activity>, ApiError> {
        let _loading = self.begin();
        self.record(self.api.dashboard_activities(limit).await)
    }

    /// Stats and recent activity, requested concurrently.
    pub async fn dashboard(&self, limit: u32) -> Result<(DashboardStats, Vec<Activity>), ApiError> {
        let _loading = self.begin();
        let result = try_join(
            self.api.dashboard_stats(),
            self.api.dashboard_activities(limit),
        )
        .await;
        self.record(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{client, ScriptedTransport};
    use crate::api::{HttpRequest, HttpResponse, HttpTransport, TransportError};
    use crate::auth::SessionContext;
    use crate::config::ApiRevision;
    use async_trait::async_trait;
    use reqwest::Method;

    const LISTING: &str = r#"{"list":[{"id":1,"name":"backend"},{"id":2,"name":"frontend"}],"total":2,"page":1,"pageSize":10}"#;

    fn loaded_store(transport: &Arc<ScriptedTransport>) -> PipelineStore {
        transport.on(Method::GET, "/v1/pipeline", 200, LISTING);
        PipelineStore::new(client(transport.clone(), ApiRevision::Classic))
    }

    #[tokio::test]
    async fn test_fetch_pipelines_replaces_listing() {
        let transport = ScriptedTransport::new();
        let store = loaded_store(&transport);

        store.fetch_pipelines(PageQuery::default()).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.pipelines.len(), 2);
        assert_eq!(state.total, 2);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_listing_entry_and_current() {
        let transport = ScriptedTransport::new();
        let store = loaded_store(&transport);
        transport.on(Method::GET, "/v1/pipeline/2", 200, r#"{"id":2,"name":"frontend"}"#);
        transport.on(Method::PUT, "/v1/pipeline/2", 200, r#"{"id":2,"name":"web"}"#);
        store.fetch_pipelines(PageQuery::default()).await.unwrap();
        store.fetch_pipeline(2).await.unwrap();

        let update = PipelineUpdate {
            name: "web".to_string(),
            description: String::new(),
            git_repo: "https://git.example/web.git".to_string(),
            git_branch: "main".to_string(),
            status: None,
        };
        store.update_pipeline(2, &update).await.unwrap();

        assert_eq!(store.pipelines()[1].name, "web");
        assert_eq!(store.current().unwrap().name, "web");
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_clears_current() {
        let transport = ScriptedTransport::new();
        let store = loaded_store(&transport);
        transport.on(Method::GET, "/v1/pipeline/1", 200, r#"{"id":1,"name":"backend"}"#);
        transport.on(Method::DELETE, "/v1/pipeline/1", 200, "");
        store.fetch_pipelines(PageQuery::default()).await.unwrap();
        store.fetch_pipeline(1).await.unwrap();

        store.delete_pipeline(1).await.unwrap();

        let state = store.snapshot();
        assert_eq!(state.pipelines.len(), 1);
        assert_eq!(state.total, 1);
        assert!(state.current.is_none());
    }

    #[tokio::test]
    async fn test_create_appends() {
        let transport = ScriptedTransport::new();
        let store = loaded_store(&transport);
        transport.on(Method::POST, "/v1/pipeline", 200, r#"{"id":3,"name":"infra"}"#);
        store.fetch_pipelines(PageQuery::default()).await.unwrap();

        let new = NewPipeline {
            name: "infra".to_string(),
            description: String::new(),
            git_repo: "https://git.example/infra.git".to_string(),
            git_branch: "main".to_string(),
            stages: Vec::new(),
        };
        store.create_pipeline(&new).await.unwrap();
        assert_eq!(store.pipelines().last().unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_failure_records_error_and_clears_loading() {
        let transport = ScriptedTransport::new();
        transport.on(Method::DELETE, "/v1/pipeline/5", 403, r#"{"message":"not your pipeline"}"#);
        let store = PipelineStore::new(client(transport, ApiRevision::Classic));

        let err = store.delete_pipeline(5).await.unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(store.error().as_deref(), Some("not your pipeline"));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_dashboard_fetches_both_widgets() {
        let transport = ScriptedTransport::new();
        transport.on(
            Method::GET,
            "/v1/dashboard/stats",
            200,
            r#"{"success":3,"running":1,"failed":1,"pending":0}"#,
        );
        transport.on(Method::POST, "/v1/dashboard/activities", 200, "[]");
        let store = PipelineStore::new(client(transport.clone(), ApiRevision::Classic));

        let (stats, activities) = store.dashboard(10).await.unwrap();
        assert_eq!(stats.total(), 5);
        assert!(activities.is_empty());
        assert_eq!(transport.requests().len(), 2);
    }

    /// Records the store's `loading` flag at the moment each request is sent.
    struct LoadingWitness {
        state: Arc<Mutex<PipelineState>>,
        seen: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl HttpTransport for LoadingWitness {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(lock(&self.state).loading);
            let body = if request.url.ends_with("/stats") { "{}" } else { "[]" };
            Ok(HttpResponse::new(200, body))
        }
    }

    #[tokio::test]
    async fn test_dashboard_actions_raise_loading() {
        let state = Arc::new(Mutex::new(PipelineState::default()));
        let transport = Arc::new(LoadingWitness {
            state: state.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let store = PipelineStore {
            api: ApiClient::with_transport(
                transport.clone(),
                &crate::api::test_support::config(ApiRevision::Classic),
                Arc::new(SessionContext::in_memory()),
            ),
            state,
        };

        store.dashboard_stats().await.unwrap();
        store.dashboard_activities(5).await.unwrap();
        store.dashboard(5).await.unwrap();

        assert_eq!(*transport.seen.lock().unwrap(), vec![true; 4]);
        assert!(!store.is_loading());
    }
}
