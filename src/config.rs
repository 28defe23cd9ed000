//! Config fields shared across the four daemons, following the teacher's
//! YAML-first, `serde_yaml`-parsed `SimulationConfig` pattern.

use std::env;

use serde::Deserialize;

use crate::model::VmFlavor;

fn default_scaling_cycle_secs() -> u64 {
    300
}

fn default_zone() -> String {
    "us-central1-a".to_string()
}

fn default_utilization_threshold() -> u32 {
    50
}

fn default_max_node_count() -> u32 {
    100
}

/// Static `workload-class -> node-pool-name` mapping (§4.D step 5), kept
/// configurable rather than hardcoded so a deployment can rename pools.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NodePoolMapping {
    #[serde(default = "default_batch_pool")]
    pub batch: String,
    #[serde(default = "default_longrunning_pool")]
    pub long_running: String,
}

fn default_batch_pool() -> String {
    "batch-pool".to_string()
}

fn default_longrunning_pool() -> String {
    "longrunning-pool".to_string()
}

impl Default for NodePoolMapping {
    fn default() -> Self {
        Self {
            batch: default_batch_pool(),
            long_running: default_longrunning_pool(),
        }
    }
}

/// Top-level control-plane configuration, loaded from a YAML file and
/// overridden by CLI flags / environment variables per the precedence in
/// SPEC_FULL.md §6 ("Configuration layering").
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ControlPlaneConfig {
    /// Cluster name; fatal to start any daemon without one (§6 Exit codes).
    pub cluster_name: Option<String>,
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default = "default_scaling_cycle_secs")]
    pub scaling_cycle_secs: u64,
    #[serde(default = "default_utilization_threshold")]
    pub utilization_threshold_percent: u32,
    #[serde(default = "default_max_node_count")]
    pub max_node_count: u32,
    #[serde(default)]
    pub node_pools: NodePoolMapping,
    #[serde(default)]
    pub vm_flavors: Vec<VmFlavor>,
    /// If not set, logs go to stdout/stderr (teacher's `logs_filepath`
    /// convention in `SimulationConfig`).
    pub logs_filepath: Option<String>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            cluster_name: None,
            zone: default_zone(),
            scaling_cycle_secs: default_scaling_cycle_secs(),
            utilization_threshold_percent: default_utilization_threshold(),
            max_node_count: default_max_node_count(),
            node_pools: NodePoolMapping::default(),
            vm_flavors: Vec::new(),
            logs_filepath: None,
        }
    }
}

impl ControlPlaneConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Applies the environment-variable fallbacks named in §6
    /// (`GKE_CLUSTER_NAME`, `GCP_ZONE`, `UTILIZATION_THRESHOLD`) for any
    /// field the config file left unset, matching the original source's
    /// `os.environ.get(...)` defaulting.
    pub fn apply_env_fallbacks(&mut self) {
        if self.cluster_name.is_none() {
            self.cluster_name = env::var("GKE_CLUSTER_NAME").ok();
        }
        if let Ok(zone) = env::var("GCP_ZONE") {
            self.zone = zone;
        }
        if let Ok(threshold) = env::var("UTILIZATION_THRESHOLD") {
            if let Ok(parsed) = threshold.parse::<u32>() {
                self.utilization_threshold_percent = parsed;
            }
        }
    }
}

#[cfg(test)]
pub fn test_config_yaml() -> &'static str {
    r#"
cluster_name: test-cluster
zone: us-central1-a
scaling_cycle_secs: 300
utilization_threshold_percent: 50
max_node_count: 50
node_pools:
  batch: batch-pool
  long_running: longrunning-pool
vm_flavors:
  - name: e2-micro
    cpu_cores: 2
    memory_gib: 1
    hourly_price: 0.0060
  - name: e2-standard-2
    cpu_cores: 2
    memory_gib: 8
    hourly_price: 0.0686
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_yaml_config() {
        let config = ControlPlaneConfig::from_yaml_str(test_config_yaml()).unwrap();
        assert_eq!(config.cluster_name.as_deref(), Some("test-cluster"));
        assert_eq!(config.vm_flavors.len(), 2);
        assert_eq!(config.node_pools.batch, "batch-pool");
    }

    #[test]
    fn defaults_apply_when_fields_missing() {
        let config = ControlPlaneConfig::from_yaml_str("cluster_name: minimal\n").unwrap();
        assert_eq!(config.scaling_cycle_secs, 300);
        assert_eq!(config.utilization_threshold_percent, 50);
        assert_eq!(config.zone, "us-central1-a");
    }
}
