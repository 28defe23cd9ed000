//! Abstraction over the orchestrator's object store.
//!
//! The real implementation of this trait talks to the container orchestrator
//! (out of scope per §1); it is reified here as an explicit collaborator so
//! that every component can be driven against an in-memory fake in tests,
//! mirroring the teacher's separation of `PersistentStorage` as an addressable
//! component distinct from scheduler logic.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::model::{AutoScaleRequest, Node, NodeProfile, Task};

pub trait ClusterStore: Send + Sync {
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;
    fn get_task(&self, name: &str) -> Result<Task, StoreError>;
    fn update_task(&self, task: Task) -> Result<(), StoreError>;
    fn delete_task(&self, name: &str) -> Result<(), StoreError>;

    fn list_nodes(&self) -> Result<Vec<Node>, StoreError>;
    fn get_node(&self, name: &str) -> Result<Node, StoreError>;
    fn update_node(&self, node: Node) -> Result<(), StoreError>;
    fn delete_node(&self, name: &str) -> Result<(), StoreError>;

    fn list_node_profiles(&self) -> Result<Vec<NodeProfile>, StoreError>;
    fn upsert_node_profile(&self, profile: NodeProfile) -> Result<(), StoreError>;

    fn list_autoscale_requests(&self) -> Result<Vec<AutoScaleRequest>, StoreError>;
    /// Creating a request that already exists by name is not an error (§7,
    /// §8: re-emitting the same name is a no-op).
    fn create_autoscale_request(&self, request: AutoScaleRequest) -> Result<(), StoreError>;
    /// Deleting an absent request is not an error (someone else handled it,
    /// §5 "Shared-resource policy").
    fn delete_autoscale_request(&self, name: &str) -> Result<(), StoreError>;

    /// Running tasks currently assigned to `node_name`.
    fn list_running_tasks_on_node(&self, node_name: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .list_tasks()?
            .into_iter()
            .filter(|t| {
                t.status.phase == crate::model::TaskPhase::Running
                    && t.spec.node_name.as_deref() == Some(node_name)
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeClusterStoreState {
    tasks: HashMap<String, Task>,
    nodes: HashMap<String, Node>,
    node_profiles: HashMap<String, NodeProfile>,
    autoscale_requests: HashMap<String, AutoScaleRequest>,
}

/// An in-memory `ClusterStore` used by tests and local (non-production) runs.
#[derive(Default)]
pub struct FakeClusterStore {
    state: Mutex<FakeClusterStoreState>,
}

impl FakeClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_task(&self, task: Task) {
        self.state
            .lock()
            .unwrap()
            .tasks
            .insert(task.metadata.name.clone(), task);
    }

    pub fn seed_node(&self, node: Node) {
        self.state
            .lock()
            .unwrap()
            .nodes
            .insert(node.metadata.name.clone(), node);
    }

    pub fn seed_node_profile(&self, profile: NodeProfile) {
        self.state
            .lock()
            .unwrap()
            .node_profiles
            .insert(profile.metadata.name.clone(), profile);
    }
}

impl ClusterStore for FakeClusterStore {
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.lock().unwrap().tasks.values().cloned().collect())
    }

    fn get_task(&self, name: &str) -> Result<Task, StoreError> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(name.to_string()))
    }

    fn update_task(&self, task: Task) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .insert(task.metadata.name.clone(), task);
        Ok(())
    }

    fn delete_task(&self, name: &str) -> Result<(), StoreError> {
        self.state.lock().unwrap().tasks.remove(name);
        Ok(())
    }

    fn list_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.state.lock().unwrap().nodes.values().cloned().collect())
    }

    fn get_node(&self, name: &str) -> Result<Node, StoreError> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NodeNotFound(name.to_string()))
    }

    fn update_node(&self, node: Node) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .nodes
            .insert(node.metadata.name.clone(), node);
        Ok(())
    }

    fn delete_node(&self, name: &str) -> Result<(), StoreError> {
        self.state.lock().unwrap().nodes.remove(name);
        Ok(())
    }

    fn list_node_profiles(&self) -> Result<Vec<NodeProfile>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .node_profiles
            .values()
            .cloned()
            .collect())
    }

    fn upsert_node_profile(&self, profile: NodeProfile) -> Result<(), StoreError> {
        self.state
            .lock()
            .unwrap()
            .node_profiles
            .insert(profile.metadata.name.clone(), profile);
        Ok(())
    }

    fn list_autoscale_requests(&self) -> Result<Vec<AutoScaleRequest>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .autoscale_requests
            .values()
            .cloned()
            .collect())
    }

    fn create_autoscale_request(&self, request: AutoScaleRequest) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .autoscale_requests
            .entry(request.metadata.name.clone())
            .or_insert(request);
        Ok(())
    }

    fn delete_autoscale_request(&self, name: &str) -> Result<(), StoreError> {
        self.state.lock().unwrap().autoscale_requests.remove(name);
        Ok(())
    }
}
