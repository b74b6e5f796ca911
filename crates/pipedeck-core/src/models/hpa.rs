use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HpaPolicy {
    pub id: u64,
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub deployment: String,
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// CPU utilisation threshold, percent
    #[serde(default)]
    pub cpu_threshold: u32,
    /// Memory utilisation threshold, percent
    #[serde(default)]
    pub memory_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHpaPolicy {
    pub name: String,
    pub namespace: String,
    pub deployment: String,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub cpu_threshold: u32,
    pub memory_threshold: u32,
}

impl NewHpaPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() || self.namespace.trim().is_empty() {
            return Err("name and namespace are required".to_string());
        }
        if self.deployment.trim().is_empty() {
            return Err("deployment is required".to_string());
        }
        if self.min_replicas == 0 || self.min_replicas > self.max_replicas {
            return Err(format!(
                "replica bounds must satisfy 1 <= min ({}) <= max ({})",
                self.min_replicas, self.max_replicas
            ));
        }
        for (label, value) in [("cpu", self.cpu_threshold), ("memory", self.memory_threshold)] {
            if !(1..=100).contains(&value) {
                return Err(format!("{} threshold must be between 1 and 100", label));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> NewHpaPolicy {
        NewHpaPolicy {
            name: "web".to_string(),
            namespace: "prod".to_string(),
            deployment: "web".to_string(),
            min_replicas: 2,
            max_replicas: 10,
            cpu_threshold: 70,
            memory_threshold: 80,
        }
    }

    #[test]
    fn test_validate() {
        assert!(policy().validate().is_ok());

        let mut bad = policy();
        bad.min_replicas = 11;
        assert!(bad.validate().unwrap_err().contains("replica bounds"));

        let mut bad = policy();
        bad.memory_threshold = 0;
        assert_eq!(bad.validate().unwrap_err(), "memory threshold must be between 1 and 100");
    }
}
