//! Checkpoint/restore migration protocol (§4.E "Migration protocol").
//!
//! Grounded in `original_source/src/instance_cleaner/instance_cleaner.py`'s
//! `migrate_container` (checkpoint -> export -> create replica -> wait ->
//! import -> restore -> delete original), shelling out to the checkpoint/
//! restore tool exactly like the original treats it as an opaque external
//! collaborator (§1 "Out of scope").

use std::process::Command;
use std::time::{Duration, Instant};

use crate::error::CleanerError;
use crate::model::{RestartPolicy, Task, TaskPhase};
use crate::store::ClusterStore;

pub const DEFAULT_READY_WAIT: Duration = Duration::from_secs(30);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// The checkpoint/restore tool's interface, as seen by this control plane
/// (§1: "the checkpoint/restore tool used during live migration" is an
/// external collaborator, specified only at its interface).
pub trait CheckpointRestoreTool: Send + Sync {
    /// Captures the container process tree's memory and file descriptors
    /// into a checkpoint directory; returns its path.
    fn checkpoint(&self, task: &Task) -> Result<String, CleanerError>;
    /// Exports the checkpoint artifacts off the source task.
    fn export(&self, task: &Task, checkpoint_path: &str) -> Result<(), CleanerError>;
    /// Imports the checkpoint into the replica.
    fn import(&self, replica: &Task, checkpoint_path: &str) -> Result<(), CleanerError>;
    /// Restores the process tree in the replica.
    fn restore(&self, replica: &Task) -> Result<(), CleanerError>;
}

/// Shells out to an external checkpoint/restore binary. Out of scope per §1;
/// this wrapper only knows the four subcommands it invokes, not their
/// implementation.
pub struct ProcessCheckpointRestoreTool {
    binary: String,
}

impl ProcessCheckpointRestoreTool {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    fn run(&self, task_name: &str, args: &[&str]) -> Result<String, CleanerError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| CleanerError::MigrationFailed(task_name.to_string(), format!("exec failed: {e}")))?;
        if !output.status.success() {
            return Err(CleanerError::MigrationFailed(
                task_name.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl CheckpointRestoreTool for ProcessCheckpointRestoreTool {
    fn checkpoint(&self, task: &Task) -> Result<String, CleanerError> {
        self.run(
            &task.metadata.name,
            &["checkpoint", &task.metadata.name, &task.spec.container_name],
        )
    }

    fn export(&self, task: &Task, checkpoint_path: &str) -> Result<(), CleanerError> {
        self.run(&task.metadata.name, &["export", &task.metadata.name, checkpoint_path])?;
        Ok(())
    }

    fn import(&self, replica: &Task, checkpoint_path: &str) -> Result<(), CleanerError> {
        self.run(&replica.metadata.name, &["import", &replica.metadata.name, checkpoint_path])?;
        Ok(())
    }

    fn restore(&self, replica: &Task) -> Result<(), CleanerError> {
        self.run(
            &replica.metadata.name,
            &["restore", &replica.metadata.name, &replica.spec.container_name],
        )?;
        Ok(())
    }
}

/// Executes the full seven-step migration protocol for a single task,
/// leaving the original untouched until the very last step (§4.E: "A failure
/// at any step leaves the original task unaffected"). On success, returns
/// the running replica.
pub fn migrate_task<S: ClusterStore, T: CheckpointRestoreTool>(
    store: &S,
    tool: &T,
    task: &Task,
    target_node: &str,
    ready_wait: Duration,
) -> Result<Task, CleanerError> {
    let checkpoint_path = tool.checkpoint(task)?;
    tool.export(task, &checkpoint_path)?;

    let mut replica = task.clone();
    replica.metadata.name = format!("{}-migrated", task.metadata.name);
    replica.spec.node_name = Some(target_node.to_string());
    replica.spec.restart_policy = RestartPolicy::Never;
    replica.status.phase = TaskPhase::Pending;
    store
        .update_task(replica.clone())
        .map_err(|e| CleanerError::MigrationFailed(replica.metadata.name.clone(), e.to_string()))?;

    wait_for_ready(store, &replica, ready_wait)?;

    tool.import(&replica, &checkpoint_path)?;
    tool.restore(&replica)?;

    let mut running = replica.clone();
    running.status.phase = TaskPhase::Running;
    store
        .update_task(running.clone())
        .map_err(|e| CleanerError::MigrationFailed(running.metadata.name.clone(), e.to_string()))?;

    store
        .delete_task(&task.metadata.name)
        .map_err(|e| CleanerError::MigrationFailed(task.metadata.name.clone(), e.to_string()))?;

    Ok(running)
}

/// Bounded-wait poll for the replica's placement to be observable in the
/// store (§4.E step 4). The replica is pinned directly to `target_node`
/// (bypassing the Packer), so readiness here means the orchestrator has
/// recorded that placement; once it has, this control plane considers it
/// ready to receive the checkpoint.
fn wait_for_ready<S: ClusterStore>(store: &S, replica: &Task, timeout: Duration) -> Result<(), CleanerError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(observed) = store.get_task(&replica.metadata.name) {
            if observed.spec.node_name.as_deref() == replica.spec.node_name.as_deref() {
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            return Err(CleanerError::MigrationFailed(
                replica.metadata.name.clone(),
                "replica did not become ready within bounded wait".to_string(),
            ));
        }
        std::thread::sleep(READY_POLL_INTERVAL.min(timeout));
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Step {
        Checkpoint,
        Export,
        Import,
        Restore,
    }

    /// A checkpoint/restore tool fake that records invocations and can be
    /// configured to fail at a specific step, for exercising the "leave the
    /// original task unaffected on failure" invariant (§8 invariant 6).
    #[derive(Default)]
    pub struct FakeCheckpointRestoreTool {
        fail_at: Mutex<Option<Step>>,
        calls: Mutex<Vec<(Step, String)>>,
    }

    impl FakeCheckpointRestoreTool {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_at(self, step: Step) -> Self {
            *self.fail_at.lock().unwrap() = Some(step);
            self
        }

        pub fn calls(&self) -> Vec<(Step, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn maybe_fail(&self, step: Step, task_name: &str) -> Result<(), CleanerError> {
            self.calls.lock().unwrap().push((step, task_name.to_string()));
            if *self.fail_at.lock().unwrap() == Some(step) {
                return Err(CleanerError::MigrationFailed(task_name.to_string(), format!("{:?} failed", step)));
            }
            Ok(())
        }
    }

    impl CheckpointRestoreTool for FakeCheckpointRestoreTool {
        fn checkpoint(&self, task: &Task) -> Result<String, CleanerError> {
            self.maybe_fail(Step::Checkpoint, &task.metadata.name)?;
            Ok(format!("/tmp/checkpoints/{}", task.metadata.name))
        }

        fn export(&self, task: &Task, _checkpoint_path: &str) -> Result<(), CleanerError> {
            self.maybe_fail(Step::Export, &task.metadata.name)
        }

        fn import(&self, replica: &Task, _checkpoint_path: &str) -> Result<(), CleanerError> {
            self.maybe_fail(Step::Import, &replica.metadata.name)
        }

        fn restore(&self, replica: &Task) -> Result<(), CleanerError> {
            self.maybe_fail(Step::Restore, &replica.metadata.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeCheckpointRestoreTool, Step};
    use super::*;
    use crate::common::Resources;
    use crate::model::Task;
    use crate::store::FakeClusterStore;

    fn batch_task(name: &str, node: &str) -> Task {
        let mut task = Task::new(name, Resources::new(500, 2048));
        task.spec.node_name = Some(node.to_string());
        task.status.phase = TaskPhase::Running;
        task
    }

    #[test]
    fn successful_migration_deletes_original_and_creates_running_replica() {
        let store = FakeClusterStore::new();
        let task = batch_task("t1", "bn-1");
        store.seed_task(task.clone());

        let tool = FakeCheckpointRestoreTool::new();
        let replica = migrate_task(&store, &tool, &task, "bn-2", Duration::from_millis(50)).unwrap();

        assert_eq!(replica.metadata.name, "t1-migrated");
        assert_eq!(replica.spec.node_name.as_deref(), Some("bn-2"));
        assert_eq!(replica.status.phase, TaskPhase::Running);
        assert_eq!(replica.spec.restart_policy, RestartPolicy::Never);
        assert!(store.get_task("t1").is_err());
        assert!(store.get_task("t1-migrated").is_ok());
    }

    #[test]
    fn checkpoint_failure_leaves_original_task_running_on_source() {
        let store = FakeClusterStore::new();
        let task = batch_task("t1", "bn-1");
        store.seed_task(task.clone());

        let tool = FakeCheckpointRestoreTool::new().fail_at(Step::Checkpoint);
        let result = migrate_task(&store, &tool, &task, "bn-2", Duration::from_millis(50));

        assert!(result.is_err());
        let original = store.get_task("t1").unwrap();
        assert_eq!(original.status.phase, TaskPhase::Running);
        assert_eq!(original.spec.node_name.as_deref(), Some("bn-1"));
        assert!(store.get_task("t1-migrated").is_err());
    }

    #[test]
    fn restore_failure_leaves_original_task_unaffected() {
        let store = FakeClusterStore::new();
        let task = batch_task("t1", "bn-1");
        store.seed_task(task.clone());

        let tool = FakeCheckpointRestoreTool::new().fail_at(Step::Restore);
        let result = migrate_task(&store, &tool, &task, "bn-2", Duration::from_millis(50));

        assert!(result.is_err());
        let original = store.get_task("t1").unwrap();
        assert_eq!(original.status.phase, TaskPhase::Running);
    }
}
