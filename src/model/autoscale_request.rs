//! AutoScaleRequest: a declarative trigger created by the Packer, consumed
//! and deleted by the Autoscaler.

use serde::{Deserialize, Serialize};

use crate::model::task::WorkloadClass;

fn api_version() -> String {
    "htas.cloud/v1".to_string()
}

fn kind() -> String {
    "AutoScaleRequest".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AutoScaleRequestSpec {
    pub workload_type: WorkloadClass,
    pub pod_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AutoScaleRequestMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AutoScaleRequest {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "kind")]
    pub kind: String,
    pub metadata: AutoScaleRequestMetadata,
    pub spec: AutoScaleRequestSpec,
}

impl AutoScaleRequest {
    /// Name convention `asr-<unix-seconds>-<workloadType>` (§6). A weak
    /// dedup: two Packer cycles within the same second for the same class
    /// collide on purpose, which is the intended at-least-once delivery
    /// (§4.C failure semantics, §9 "At-least-once request delivery").
    pub fn name_for(workload_type: WorkloadClass, unix_secs: u64) -> String {
        format!("asr-{}-{}", unix_secs, workload_type.as_str())
    }

    pub fn new(workload_type: WorkloadClass, task_names: Vec<String>, unix_secs: u64) -> Self {
        Self {
            api_version: api_version(),
            kind: kind(),
            metadata: AutoScaleRequestMetadata {
                name: Self::name_for(workload_type, unix_secs),
            },
            spec: AutoScaleRequestSpec {
                workload_type,
                pod_names: task_names,
            },
        }
    }
}
