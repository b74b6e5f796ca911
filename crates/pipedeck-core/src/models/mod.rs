//! Data models for pipeline platform entities.
//!
//! This module contains the data structures exchanged with the server:
//!
//! - `UserProfile` and the auth request bodies
//! - `Pipeline`, `Stage`, `Job`, `PipelineRun`: pipeline definitions and runs
//! - `Artifact`: build outputs
//! - `DashboardStats`, `Activity`: dashboard widgets
//! - `HpaPolicy`, `Cluster`: Kubernetes-side configuration
//! - `Page`, `PageQuery`: paginated listings

pub mod artifact;
pub mod cluster;
pub mod dashboard;
pub mod hpa;
pub mod page;
pub mod pipeline;
pub mod system;
pub mod user;

pub use artifact::{Artifact, ArtifactFilter};
pub use cluster::{Cluster, NewCluster};
pub use dashboard::{Activity, ActivityQuery, DashboardStats};
pub use hpa::{HpaPolicy, NewHpaPolicy};
pub use page::{Page, PageQuery};
pub use pipeline::{
    Job, NewJob, NewPipeline, NewStage, Pipeline, PipelineRun, PipelineStatus, PipelineUpdate,
    RunLogs, RunStatus, Stage, TriggerRequest,
};
pub use system::{HealthStatus, SystemConfig};
pub use user::{
    LoginRequest, LoginResponse, PasswordChange, ProfileUpdate, Registration, UserProfile,
};
