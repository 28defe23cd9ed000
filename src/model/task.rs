//! Type definition for Task, the unit of work the Packer places.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::Resources;

/// Only tasks carrying this scheduler name are considered by the Packer (§6).
pub const SCHEDULER_NAME: &str = "htas-scheduler";
pub const DEFAULT_RUNTIME_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum WorkloadClass {
    #[serde(rename = "long-running")]
    LongRunning,
    #[serde(rename = "batch")]
    Batch,
}

impl Default for WorkloadClass {
    fn default() -> Self {
        WorkloadClass::Batch
    }
}

impl WorkloadClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadClass::LongRunning => "long-running",
            WorkloadClass::Batch => "batch",
        }
    }

    /// Static workload-class to node-pool-name mapping used by the Autoscaler
    /// (§4.D step 5).
    pub fn node_pool_name(&self) -> &'static str {
        match self {
            WorkloadClass::LongRunning => "longrunning-pool",
            WorkloadClass::Batch => "batch-pool",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TaskMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// Only `Never` is exercised by this crate: the Instance Cleaner's migration
/// replicas are created with it (§4.E migration protocol step 3) so a failed
/// replica is never itself resurrected by the orchestrator mid-migration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum RestartPolicy {
    Always,
    Never,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::Always
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TaskSpec {
    pub scheduler_name: String,
    pub container_name: String,
    pub requests: Resources,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TaskStatus {
    pub phase: TaskPhase,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Task {
    pub metadata: TaskMetadata,
    pub spec: TaskSpec,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(name: impl Into<String>, requests: Resources) -> Self {
        Self {
            metadata: TaskMetadata {
                name: name.into(),
                ..Default::default()
            },
            spec: TaskSpec {
                scheduler_name: SCHEDULER_NAME.to_string(),
                container_name: "main".to_string(),
                requests,
                node_name: None,
                restart_policy: RestartPolicy::default(),
            },
            status: TaskStatus {
                phase: TaskPhase::Pending,
            },
        }
    }

    pub fn is_eligible_for_scheduling(&self) -> bool {
        self.spec.scheduler_name == SCHEDULER_NAME && self.status.phase == TaskPhase::Pending
    }

    /// `labels.workload-type` (default `batch`), per §6.
    pub fn workload_class(&self) -> WorkloadClass {
        match self
            .metadata
            .labels
            .get("workload-type")
            .map(String::as_str)
        {
            Some("long-running") => WorkloadClass::LongRunning,
            _ => WorkloadClass::Batch,
        }
    }

    /// `annotations.runtime` (default 300s), per §6.
    pub fn runtime_secs(&self) -> u64 {
        self.metadata
            .annotations
            .get("runtime")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RUNTIME_SECS)
    }
}
