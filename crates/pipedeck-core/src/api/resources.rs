//! Artifacts, dashboard widgets, Kubernetes configuration and system status.

use super::pipelines::parse_page;
use super::{ApiClient, ApiError, ApiRequest};
use crate::models::{
    Activity, ActivityQuery, Artifact, ArtifactFilter, Cluster, DashboardStats, HealthStatus,
    HpaPolicy, NewCluster, NewHpaPolicy, Page, PageQuery, SystemConfig,
};

const ARTIFACTS_PATH: &str = "/v1/artifacts";
const HPA_PATH: &str = "/v1/hpa";
const CLUSTERS_PATH: &str = "/v1/clusters";

// ============================================================================
// Artifacts
// ============================================================================

impl ApiClient {
    pub async fn list_artifacts(&self, filter: &ArtifactFilter) -> Result<Page<Artifact>, ApiError> {
        let request = ApiRequest::get(ARTIFACTS_PATH).query(filter.to_pairs());
        let value = self.dispatch(request).await?;
        parse_page(ARTIFACTS_PATH, value)
    }

    pub async fn get_artifact(&self, id: u64) -> Result<Artifact, ApiError> {
        self.execute(ApiRequest::get(format!("{}/{}", ARTIFACTS_PATH, id)))
            .await
    }

    pub async fn delete_artifact(&self, id: u64) -> Result<(), ApiError> {
        self.execute_unit(ApiRequest::delete(format!("{}/{}", ARTIFACTS_PATH, id)))
            .await
    }
}

// ============================================================================
// Dashboard
// ============================================================================

impl ApiClient {
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.execute(ApiRequest::get("/v1/dashboard/stats")).await
    }

    /// Most recent activity entries, newest first.
    pub async fn dashboard_activities(&self, limit: u32) -> Result<Vec<Activity>, ApiError> {
        let request = ApiRequest::post("/v1/dashboard/activities").json(&ActivityQuery { limit })?;
        let value = self.dispatch(request).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("dashboard activities: {}", e)))
    }
}

// ============================================================================
// Kubernetes
// ============================================================================

impl ApiClient {
    pub async fn list_hpa_policies(&self, query: PageQuery) -> Result<Page<HpaPolicy>, ApiError> {
        let request = ApiRequest::get(HPA_PATH).query(query.normalized().to_pairs());
        let value = self.dispatch(request).await?;
        parse_page(HPA_PATH, value)
    }

    pub async fn create_hpa_policy(&self, policy: &NewHpaPolicy) -> Result<HpaPolicy, ApiError> {
        let request = ApiRequest::post(HPA_PATH).json(policy)?;
        self.execute(request).await
    }

    pub async fn list_clusters(&self) -> Result<Vec<Cluster>, ApiError> {
        let value = self.dispatch(ApiRequest::get(CLUSTERS_PATH)).await?;
        Ok(parse_page(CLUSTERS_PATH, value)?.list)
    }

    pub async fn add_cluster(&self, cluster: &NewCluster) -> Result<(), ApiError> {
        let request = ApiRequest::post(CLUSTERS_PATH).json(cluster)?;
        self.execute_unit(request).await
    }
}

// ============================================================================
// System
// ============================================================================

impl ApiClient {
    pub async fn system_config(&self) -> Result<SystemConfig, ApiError> {
        self.execute(ApiRequest::get("/v1/system/config")).await
    }

    /// Liveness probe; needs no session.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.execute(ApiRequest::get("/health").public()).await
    }
}
