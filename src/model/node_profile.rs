//! NodeProfile: the Profiler's externally-visible projection of Node state.

use serde::{Deserialize, Serialize};

use crate::model::node::PoolTag;

fn api_version() -> String {
    "htas.cloud/v1".to_string()
}

fn kind() -> String {
    "NodeProfile".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeProfileSpec {
    pub instance_name: String,
    pub instance_type: String,
    /// `pool_tag` is not part of the minimal wire record in the distilled
    /// spec, but the Packer's partition-by-pool-tag step (§4.C) needs it on
    /// the NodeProfile itself rather than a side channel back to the Node
    /// object; carrying it here is an additive supplement (see DESIGN.md).
    pub pool_tag: PoolTag,
    pub cpu_capacity: u32,    // millicores
    pub memory_capacity: u64, // MiB
    pub cpu_available: u32,
    pub memory_available: u64,
    /// Runtime-age in seconds, owned exclusively by the Profiler.
    pub runtime: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeProfileMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeProfile {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "kind")]
    pub kind: String,
    pub metadata: NodeProfileMetadata,
    pub spec: NodeProfileSpec,
}

impl NodeProfile {
    pub fn new(instance_name: impl Into<String>, spec: NodeProfileSpec) -> Self {
        let instance_name = instance_name.into();
        Self {
            api_version: api_version(),
            kind: kind(),
            metadata: NodeProfileMetadata {
                name: instance_name,
            },
            spec,
        }
    }

    /// Invariant 1 of §8: availability never exceeds capacity, both sides
    /// never negative (enforced by the `u32`/`u64` types themselves; this
    /// checks the ordering half of the invariant).
    pub fn satisfies_capacity_invariant(&self) -> bool {
        self.spec.cpu_available <= self.spec.cpu_capacity
            && self.spec.memory_available <= self.spec.memory_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> NodeProfileSpec {
        NodeProfileSpec {
            instance_name: "n1".to_string(),
            instance_type: "e2-standard-2".to_string(),
            pool_tag: PoolTag::Batch,
            cpu_capacity: 4000,
            memory_capacity: 16384,
            cpu_available: 2000,
            memory_available: 8192,
            runtime: 60,
        }
    }

    #[test]
    fn capacity_invariant_holds_for_sane_profile() {
        let profile = NodeProfile::new("n1", sample_spec());
        assert!(profile.satisfies_capacity_invariant());
    }

    #[test]
    fn capacity_invariant_fails_when_available_exceeds_capacity() {
        let mut spec = sample_spec();
        spec.cpu_available = spec.cpu_capacity + 1;
        let profile = NodeProfile::new("n1", spec);
        assert!(!profile.satisfies_capacity_invariant());
    }
}
