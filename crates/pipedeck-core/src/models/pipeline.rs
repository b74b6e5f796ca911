use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserProfile;

/// Default job timeout in seconds, matching the server default
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Inactive,
    Active,
    Running,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Inactive => "inactive",
            PipelineStatus::Active => "active",
            PipelineStatus::Running => "running",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub git_repo: String,
    #[serde(default)]
    pub git_branch: String,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub creator_id: u64,
    #[serde(default)]
    pub creator: Option<UserProfile>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }

    pub fn last_run_display(&self) -> String {
        match self.last_run_at {
            Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
            None => "never".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub pipeline_id: u64,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub stage_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed | RunStatus::Canceled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
            RunStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pipeline_id: u64,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub git_branch: String,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub trigger_by: u64,
}

impl PipelineRun {
    pub fn duration_display(&self) -> String {
        let secs = self.duration.max(0);
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
    }

    pub fn short_commit(&self) -> &str {
        let end = self
            .git_commit
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.git_commit.len());
        &self.git_commit[..end]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLogs {
    #[serde(default)]
    pub logs: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_job_timeout")]
    pub timeout: u64,
}

fn default_job_timeout() -> u64 {
    DEFAULT_JOB_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStage {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i32,
    pub jobs: Vec<NewJob>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub git_repo: String,
    #[serde(default = "default_branch")]
    pub git_branch: String,
    pub stages: Vec<NewStage>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl NewPipeline {
    /// Check the constraints the server enforces, so obvious mistakes fail
    /// before a round trip.
    pub fn validate(&self) -> Result<(), String> {
        let name_len = self.name.chars().count();
        if !(2..=100).contains(&name_len) {
            return Err("pipeline name must be 2-100 characters".to_string());
        }
        if self.git_repo.trim().is_empty() {
            return Err("git_repo is required".to_string());
        }
        if self.stages.is_empty() {
            return Err("at least one stage is required".to_string());
        }
        for stage in &self.stages {
            if stage.jobs.is_empty() {
                return Err(format!("stage '{}' has no jobs", stage.name));
            }
            if let Some(job) = stage.jobs.iter().find(|j| j.command.trim().is_empty()) {
                return Err(format!("job '{}' has no command", job.name));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineUpdate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub git_repo: String,
    #[serde(default = "default_branch")]
    pub git_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PipelineStatus>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TriggerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pipeline_with_stages() {
        let pipeline: Pipeline = serde_json::from_value(json!({
            "id": 3,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z",
            "name": "backend",
            "description": "",
            "git_repo": "https://git.example.com/backend.git",
            "git_branch": "main",
            "status": "running",
            "last_run_at": null,
            "creator_id": 1,
            "stages": [
                {"id": 1, "name": "build", "order": 1, "pipeline_id": 3,
                 "jobs": [{"id": 1, "name": "compile", "command": "make", "timeout": 3600, "stage_id": 1}]}
            ]
        }))
        .unwrap();

        assert_eq!(pipeline.status, PipelineStatus::Running);
        assert_eq!(pipeline.job_count(), 1);
        assert_eq!(pipeline.last_run_display(), "never");
    }

    #[test]
    fn test_unknown_status_does_not_fail_parsing() {
        let run: PipelineRun =
            serde_json::from_value(json!({"id": 1, "status": "queued", "duration": 3725})).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert_eq!(run.duration_display(), "1h 2m");
    }

    #[test]
    fn test_short_commit() {
        let run: PipelineRun =
            serde_json::from_value(json!({"id": 1, "git_commit": "0123456789abcdef"})).unwrap();
        assert_eq!(run.short_commit(), "01234567");
    }

    #[test]
    fn test_new_pipeline_defaults_and_validation() {
        let pipeline: NewPipeline = serde_json::from_value(json!({
            "name": "web",
            "git_repo": "https://git.example.com/web.git",
            "stages": [{"name": "test", "jobs": [{"name": "unit", "command": "npm test"}]}]
        }))
        .unwrap();
        assert_eq!(pipeline.git_branch, "main");
        assert_eq!(pipeline.stages[0].jobs[0].timeout, 3600);
        assert!(pipeline.validate().is_ok());

        let mut invalid = pipeline.clone();
        invalid.stages[0].jobs.clear();
        assert_eq!(invalid.validate().unwrap_err(), "stage 'test' has no jobs");

        invalid.name = "x".to_string();
        assert!(invalid.validate().unwrap_err().contains("2-100"));
    }
}
