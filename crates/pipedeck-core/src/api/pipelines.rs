//! Pipeline definitions, triggering and run history.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{ApiClient, ApiError, ApiRequest};
use crate::models::{
    NewPipeline, Page, PageQuery, Pipeline, PipelineRun, PipelineUpdate, RunLogs, TriggerRequest,
};

const PIPELINES_PATH: &str = "/v1/pipeline";

fn pipeline_path(id: u64) -> String {
    format!("{}/{}", PIPELINES_PATH, id)
}

fn run_path(pipeline_id: u64, run_id: u64) -> String {
    format!("{}/runs/{}", pipeline_path(pipeline_id), run_id)
}

/// Parse a listing payload into a page, accepting bare arrays.
pub(crate) fn parse_page<T: DeserializeOwned>(path: &str, value: Value) -> Result<Page<T>, ApiError> {
    Page::from_value(value).map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
}

impl ApiClient {
    pub async fn list_pipelines(&self, query: PageQuery) -> Result<Page<Pipeline>, ApiError> {
        let request = ApiRequest::get(PIPELINES_PATH).query(query.normalized().to_pairs());
        let value = self.dispatch(request).await?;
        parse_page(PIPELINES_PATH, value)
    }

    pub async fn get_pipeline(&self, id: u64) -> Result<Pipeline, ApiError> {
        self.execute(ApiRequest::get(pipeline_path(id))).await
    }

    pub async fn create_pipeline(&self, pipeline: &NewPipeline) -> Result<Pipeline, ApiError> {
        debug!(name = %pipeline.name, "Creating pipeline");
        let request = ApiRequest::post(PIPELINES_PATH).json(pipeline)?;
        self.execute(request).await
    }

    pub async fn update_pipeline(
        &self,
        id: u64,
        update: &PipelineUpdate,
    ) -> Result<Pipeline, ApiError> {
        let request = ApiRequest::put(pipeline_path(id)).json(update)?;
        self.execute(request).await
    }

    pub async fn delete_pipeline(&self, id: u64) -> Result<(), ApiError> {
        self.execute_unit(ApiRequest::delete(pipeline_path(id))).await
    }

    /// Start a run. Returns the run when the server describes it; some
    /// servers only acknowledge the trigger.
    pub async fn trigger_pipeline(
        &self,
        id: u64,
        trigger: &TriggerRequest,
    ) -> Result<Option<PipelineRun>, ApiError> {
        let request = ApiRequest::post(format!("{}/trigger", pipeline_path(id))).json(trigger)?;
        let value = self.dispatch(request).await?;
        Ok(serde_json::from_value(value).ok())
    }

    pub async fn list_runs(
        &self,
        pipeline_id: u64,
        query: PageQuery,
    ) -> Result<Page<PipelineRun>, ApiError> {
        let path = format!("{}/runs", pipeline_path(pipeline_id));
        let request = ApiRequest::get(path.as_str()).query(query.normalized().to_pairs());
        let value = self.dispatch(request).await?;
        parse_page(&path, value)
    }

    pub async fn get_run(&self, pipeline_id: u64, run_id: u64) -> Result<PipelineRun, ApiError> {
        self.execute(ApiRequest::get(run_path(pipeline_id, run_id)))
            .await
    }

    /// Full log text of a run. Accepts `{logs: "..."}` or a bare string.
    pub async fn run_logs(&self, pipeline_id: u64, run_id: u64) -> Result<String, ApiError> {
        let path = format!("{}/logs", run_path(pipeline_id, run_id));
        match self.dispatch(ApiRequest::get(path.as_str())).await? {
            Value::String(logs) => Ok(logs),
            Value::Null => Ok(String::new()),
            other => serde_json::from_value::<RunLogs>(other)
                .map(|l| l.logs)
                .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e))),
        }
    }

    pub async fn cancel_run(&self, pipeline_id: u64, run_id: u64) -> Result<(), ApiError> {
        let path = format!("{}/cancel", run_path(pipeline_id, run_id));
        self.execute_unit(ApiRequest::post(path)).await
    }
}
