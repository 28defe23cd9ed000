//! Type definition for Node, a machine in a pool.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::Resources;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum PoolTag {
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "longrunning")]
    LongRunning,
}

impl PoolTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolTag::Batch => "batch",
            PoolTag::LongRunning => "longrunning",
        }
    }

    pub fn from_label(value: &str) -> Option<PoolTag> {
        match value {
            "batch" => Some(PoolTag::Batch),
            "longrunning" => Some(PoolTag::LongRunning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct NodeMetadata {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Unix timestamp (seconds) the node entered the cluster / current
    /// scaling epoch. The Profiler derives `runtime-age` from this rather
    /// than from a mutable field (see DESIGN.md, "runtime-age ownership").
    pub creation_timestamp: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeSpec {
    pub instance_type: String,
    pub capacity: Resources,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeStatus {
    pub allocatable: Resources,
    #[serde(default)]
    pub unschedulable: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Node {
    pub metadata: NodeMetadata,
    pub spec: NodeSpec,
    pub status: NodeStatus,
}

impl Node {
    /// `labels.workload` assigns pool-tag (§6). Nodes without the label are
    /// not part of this system's pools and are ignored by the Profiler.
    pub fn pool_tag(&self) -> Option<PoolTag> {
        self.metadata
            .labels
            .get("workload")
            .and_then(|v| PoolTag::from_label(v))
    }

    pub fn runtime_age_secs(&self, now_unix_secs: u64) -> u64 {
        now_unix_secs.saturating_sub(self.metadata.creation_timestamp)
    }
}
