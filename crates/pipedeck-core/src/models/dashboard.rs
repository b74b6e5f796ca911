use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline counts by state for the dashboard header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub success: i64,
    #[serde(default)]
    pub running: i64,
    #[serde(default)]
    pub failed: i64,
    #[serde(default)]
    pub pending: i64,
}

impl DashboardStats {
    pub fn total(&self) -> i64 {
        self.success + self.running + self.failed + self.pending
    }

    /// Share of finished pipelines that succeeded, as a percentage
    pub fn success_rate(&self) -> Option<f64> {
        let finished = self.success + self.failed;
        (finished > 0).then(|| self.success as f64 * 100.0 / finished as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, alias = "ID")]
    pub id: u64,
    #[serde(rename = "type", alias = "Type", default)]
    pub kind: String,
    #[serde(alias = "Content", default)]
    pub content: String,
    #[serde(alias = "Timestamp", default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(alias = "Hollow", default)]
    pub hollow: bool,
}

/// Body of the activities request
#[derive(Debug, Clone, Serialize)]
pub struct ActivityQuery {
    pub limit: u32,
}
