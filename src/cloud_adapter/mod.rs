//! Cloud Adapter: the thin, side-effecting boundary wrapping the orchestrator
//! and the cloud provider's compute/managed-cluster APIs (§4.A).
//!
//! Grounded in `original_source/src/cloud_adaptor/cloud_adapter.py`
//! (`deploy_pod`, `provision_vm`/`_wait_for_operation`, `deprovision_vm`) and
//! `original_source/src/autoscaler/autoscaler.py`'s `scale_gke_node_pool`
//! clamp/no-op logic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use log::warn;

use crate::error::CloudError;
use crate::model::VmFlavor;

/// Exponential backoff parameters for transient `Unavailable` errors (§4.A).
const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: u32 = 2;
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const BACKOFF_MAX_ATTEMPTS: u32 = 5;

/// Retries `op` on transient `CloudError::Unavailable`, backing off
/// exponentially; any other error, or exhaustion of the attempt budget,
/// surfaces immediately.
pub fn with_retry<T>(mut op: impl FnMut() -> Result<T, CloudError>) -> Result<T, CloudError> {
    let mut delay = BACKOFF_INITIAL;
    for attempt in 1..=BACKOFF_MAX_ATTEMPTS {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < BACKOFF_MAX_ATTEMPTS => {
                warn!(
                    "transient cloud error on attempt {}/{}: {}, retrying in {:?}",
                    attempt, BACKOFF_MAX_ATTEMPTS, err, delay
                );
                thread::sleep(delay);
                delay = std::cmp::min(delay * BACKOFF_FACTOR, BACKOFF_CAP);
            }
            Err(err) => return Err(err),
        }
    }
    unreachable!("loop always returns on the final attempt")
}

/// Side-effecting primitives wrapping the orchestrator and cloud APIs (§4.A).
/// Blocking is permitted (§5): each call is expected to poll to completion
/// before returning, as the original's `_wait_for_operation` does.
pub trait CloudAdapter: Send + Sync {
    /// Idempotent when the task is already bound to the same node; fails with
    /// `AlreadyBound` otherwise.
    fn bind(&self, task_name: &str, node_name: &str) -> Result<(), CloudError>;

    /// Blocks until the cloud operation reports DONE.
    fn provision_vm(
        &self,
        flavor: &VmFlavor,
        labels: &HashMap<String, String>,
    ) -> Result<String, CloudError>;

    /// Blocks until DONE; succeeds if the instance did not exist.
    fn deprovision_vm(&self, instance_name: &str) -> Result<(), CloudError>;

    /// Clamped to the pool's `maxNodeCount`; returns the count actually
    /// requested; no-op if `desired_count <= current_count`.
    fn resize_node_pool(&self, pool_name: &str, desired_count: u32) -> Result<u32, CloudError>;

    /// Current node count in `pool_name`, 0 if the pool has never been sized.
    /// Not named directly in §4.A's primitive list, but the Autoscaler's
    /// `ResizeNodePool(pool, current + len(picks))` call needs a "current" to
    /// add to; this is a minimal additive query on the same boundary (see
    /// DESIGN.md).
    fn current_pool_size(&self, pool_name: &str) -> Result<u32, CloudError>;
}

#[derive(Default)]
struct FakeCloudAdapterState {
    bindings: HashMap<String, String>,
    instances: HashMap<String, VmFlavor>,
    pool_sizes: HashMap<String, u32>,
    cordoned_nodes: std::collections::HashSet<String>,
    next_instance_id: u64,
}

/// An in-memory `CloudAdapter` used by tests. Pool sizes default to 0 and
/// grow only via `resize_node_pool`; `max_node_count` is fixed at
/// construction, mirroring a GKE node pool's configured ceiling.
pub struct FakeCloudAdapter {
    state: Mutex<FakeCloudAdapterState>,
    max_node_count: u32,
}

impl FakeCloudAdapter {
    pub fn new(max_node_count: u32) -> Self {
        Self {
            state: Mutex::new(FakeCloudAdapterState::default()),
            max_node_count,
        }
    }

    pub fn cordon(&self, node_name: &str) {
        self.state
            .lock()
            .unwrap()
            .cordoned_nodes
            .insert(node_name.to_string());
    }

    pub fn pool_size(&self, pool_name: &str) -> u32 {
        *self
            .state
            .lock()
            .unwrap()
            .pool_sizes
            .get(pool_name)
            .unwrap_or(&0)
    }

    pub fn binding_of(&self, task_name: &str) -> Option<String> {
        self.state.lock().unwrap().bindings.get(task_name).cloned()
    }
}

impl CloudAdapter for FakeCloudAdapter {
    fn bind(&self, task_name: &str, node_name: &str) -> Result<(), CloudError> {
        let mut state = self.state.lock().unwrap();
        if state.cordoned_nodes.contains(node_name) {
            return Err(CloudError::NodeCordoned);
        }
        match state.bindings.get(task_name) {
            Some(existing) if existing == node_name => Ok(()),
            Some(_) => Err(CloudError::AlreadyBound),
            None => {
                state
                    .bindings
                    .insert(task_name.to_string(), node_name.to_string());
                Ok(())
            }
        }
    }

    fn provision_vm(
        &self,
        flavor: &VmFlavor,
        _labels: &HashMap<String, String>,
    ) -> Result<String, CloudError> {
        let mut state = self.state.lock().unwrap();
        state.next_instance_id += 1;
        let instance_name = format!("vm-{}", state.next_instance_id);
        state.instances.insert(instance_name.clone(), flavor.clone());
        Ok(instance_name)
    }

    fn deprovision_vm(&self, instance_name: &str) -> Result<(), CloudError> {
        self.state.lock().unwrap().instances.remove(instance_name);
        Ok(())
    }

    fn resize_node_pool(&self, pool_name: &str, desired_count: u32) -> Result<u32, CloudError> {
        let mut state = self.state.lock().unwrap();
        let current = *state.pool_sizes.get(pool_name).unwrap_or(&0);
        let clamped = desired_count.min(self.max_node_count);
        if clamped <= current {
            return Ok(current);
        }
        state.pool_sizes.insert(pool_name.to_string(), clamped);
        Ok(clamped)
    }

    fn current_pool_size(&self, pool_name: &str) -> Result<u32, CloudError> {
        Ok(*self.state.lock().unwrap().pool_sizes.get(pool_name).unwrap_or(&0))
    }
}
