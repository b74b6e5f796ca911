use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PageQuery;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    /// zip, jar, war, docker, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path: String,
    /// Size in bytes
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pipeline_id: u64,
    #[serde(default)]
    pub pipeline_run_id: u64,
    #[serde(default)]
    pub download_count: i64,
    #[serde(default)]
    pub created_by: u64,
}

impl Artifact {
    pub fn size_display(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.size.max(0) as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", self.size.max(0), UNITS[0])
        } else {
            format!("{:.1} {}", size, UNITS[unit])
        }
    }
}

/// Query for the artifact listing: pagination plus optional filters.
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    pub page: PageQuery,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub pipeline_id: Option<u64>,
}

impl ArtifactFilter {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.page.to_pairs();
        if let Some(ref name) = self.name {
            pairs.push(("name".to_string(), name.clone()));
        }
        if let Some(ref kind) = self.kind {
            pairs.push(("type".to_string(), kind.clone()));
        }
        if let Some(id) = self.pipeline_id {
            pairs.push(("pipeline_id".to_string(), id.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_size_display() {
        let mut artifact: Artifact =
            serde_json::from_value(json!({"id": 1, "name": "app.jar", "type": "jar", "size": 512}))
                .unwrap();
        assert_eq!(artifact.kind, "jar");
        assert_eq!(artifact.size_display(), "512 B");

        artifact.size = 5 * 1024 * 1024 + 512 * 1024;
        assert_eq!(artifact.size_display(), "5.5 MB");
    }

    #[test]
    fn test_filter_pairs() {
        let filter = ArtifactFilter {
            name: Some("app".to_string()),
            pipeline_id: Some(4),
            ..ArtifactFilter::default()
        };
        let pairs = filter.to_pairs();
        assert!(pairs.contains(&("name".to_string(), "app".to_string())));
        assert!(pairs.contains(&("pipeline_id".to_string(), "4".to_string())));
        assert!(pairs.contains(&("pageSize".to_string(), "10".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "type"));
    }
}
