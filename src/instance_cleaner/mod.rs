//! Instance Cleaner (§4.E): detects underutilized batch nodes, migrates
//! their running batch tasks to peers, then cordons and deprovisions the
//! node.
//!
//! Grounded in the teacher's older `autoscaler/cluster_autoscaler.rs`
//! (`is_under_threshold_utilization`, `all_pods_can_be_moved_to_other_nodes`
//! utilization math and all-or-nothing headroom check) adapted from a
//! hypothetical move to an actual checkpoint/restore migration, and
//! `original_source/src/instance_cleaner/instance_cleaner.py`'s
//! `reschedule_node` (collect batch tasks, candidate nodes, abort on first
//! unmigratable task).

pub mod migration;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use average::Mean;
use log::{info, warn};
use prettytable::{row, Table};

use crate::cloud_adapter::{with_retry, CloudAdapter};
use crate::common::Resources;
use crate::error::CleanerError;
use crate::model::{Node, PoolTag, Task, TaskPhase, WorkloadClass};
use crate::store::ClusterStore;
use migration::CheckpointRestoreTool;

pub const RECONCILE_PERIOD: Duration = Duration::from_secs(300);
pub const DEFAULT_UTILIZATION_THRESHOLD_PERCENT: u32 = 50;

#[derive(Debug, Default)]
pub struct CleanCycleSummary {
    pub reclaimed: usize,
    pub aborted: usize,
}

pub struct Cleaner<S: ClusterStore, C: CloudAdapter, T: CheckpointRestoreTool> {
    store: Arc<S>,
    cloud: Arc<C>,
    tool: Arc<T>,
    utilization_threshold_percent: u32,
    ready_wait: Duration,
    /// Running mean of every sampled node's utilization, across all cycles,
    /// surfaced in the per-cycle summary table for operators watching the
    /// fleet trend toward or away from the threshold.
    utilization_samples: Mutex<Mean>,
}

impl<S: ClusterStore, C: CloudAdapter, T: CheckpointRestoreTool> Cleaner<S, C, T> {
    pub fn new(store: Arc<S>, cloud: Arc<C>, tool: Arc<T>, utilization_threshold_percent: u32) -> Self {
        Self {
            store,
            cloud,
            tool,
            utilization_threshold_percent,
            ready_wait: migration::DEFAULT_READY_WAIT,
            utilization_samples: Mutex::new(Mean::new()),
        }
    }

    /// Running mean utilization across every node sampled so far, 0.0 if no
    /// cycle has run yet.
    pub fn mean_utilization_percent(&self) -> f64 {
        self.utilization_samples.lock().unwrap().mean()
    }

    pub fn with_ready_wait(mut self, ready_wait: Duration) -> Self {
        self.ready_wait = ready_wait;
        self
    }

    pub fn reconcile_once(&self) -> Result<CleanCycleSummary, CleanerError> {
        let mut summary = CleanCycleSummary::default();

        let all_nodes = self.store.list_nodes()?;
        let batch_nodes: Vec<&Node> = all_nodes
            .iter()
            .filter(|n| n.pool_tag() == Some(PoolTag::Batch))
            .collect();

        for node in &batch_nodes {
            let used = self.used_resources(&node.metadata.name)?;
            let utilization = utilization_percent(node, &used);
            self.utilization_samples.lock().unwrap().add(utilization);
            if utilization >= self.utilization_threshold_percent as f64 {
                continue;
            }

            match self.reschedule_node(node, &all_nodes) {
                Ok(()) => {
                    self.reclaim(node)?;
                    summary.reclaimed += 1;
                    info!(
                        "reclaimed node {} (utilization {:.1}% below threshold {}%)",
                        node.metadata.name, utilization, self.utilization_threshold_percent
                    );
                }
                Err(err) => {
                    summary.aborted += 1;
                    warn!(
                        "aborting reclaim of node {}: {}, retrying next cycle",
                        node.metadata.name, err
                    );
                }
            }
        }

        Ok(summary)
    }

    fn used_resources(&self, node_name: &str) -> Result<Resources, CleanerError> {
        Ok(self
            .store
            .list_running_tasks_on_node(node_name)?
            .into_iter()
            .fold(Resources::ZERO, |acc, t| acc.saturating_add(&t.spec.requests)))
    }

    /// Migrates every batch task on `node` to a peer batch node with enough
    /// headroom, tracking headroom incrementally so two tasks in the same
    /// cycle cannot over-pack one candidate (§4.E step 2.c). Aborts on the
    /// first task with no fitting candidate or a migration failure, leaving
    /// already-migrated tasks in place (§8 scenario 6).
    fn reschedule_node(&self, node: &Node, all_nodes: &[Node]) -> Result<(), CleanerError> {
        let tasks: Vec<Task> = self
            .store
            .list_running_tasks_on_node(&node.metadata.name)?
            .into_iter()
            .filter(|t| t.workload_class() == WorkloadClass::Batch)
            .collect();
        if tasks.is_empty() {
            return Ok(());
        }

        let mut candidates: Vec<(String, Resources)> = all_nodes
            .iter()
            .filter(|n| n.pool_tag() == Some(PoolTag::Batch) && n.metadata.name != node.metadata.name)
            .map(|n| (n.metadata.name.clone(), n.status.allocatable))
            .collect();

        for task in &tasks {
            let target_idx = candidates
                .iter()
                .position(|(_, headroom)| task.spec.requests.fits_within(headroom));

            let Some(idx) = target_idx else {
                return Err(CleanerError::MigrationFailed(
                    task.metadata.name.clone(),
                    "no candidate batch node with sufficient headroom".to_string(),
                ));
            };

            let target_name = candidates[idx].0.clone();
            migration::migrate_task(&*self.store, &*self.tool, task, &target_name, self.ready_wait)?;
            candidates[idx].1 = candidates[idx].1.saturating_sub(&task.spec.requests);
        }

        Ok(())
    }

    fn reclaim(&self, node: &Node) -> Result<(), CleanerError> {
        let mut cordoned = node.clone();
        cordoned.status.unschedulable = true;
        self.store.update_node(cordoned)?;
        self.store.delete_node(&node.metadata.name)?;
        with_retry(|| self.cloud.deprovision_vm(&node.metadata.name))?;
        Ok(())
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(RECONCILE_PERIOD);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.reconcile_once() {
                        Ok(summary) => info!(
                            "cleaner cycle summary:\n{}",
                            summary_table(&summary, self.mean_utilization_percent())
                        ),
                        Err(err) => warn!("cleaner cycle failed: {}", err),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("instance cleaner shutting down");
                        return;
                    }
                }
            }
        }
    }
}

/// Renders a cycle's results as a human-readable table for the log line, in
/// place of the bare counters (§6 "Test tooling" ambient logging supplement).
fn summary_table(summary: &CleanCycleSummary, mean_utilization_percent: f64) -> Table {
    let mut table = Table::new();
    table.add_row(row!["reclaimed", summary.reclaimed]);
    table.add_row(row!["aborted", summary.aborted]);
    table.add_row(row!["mean utilization %", format!("{:.1}", mean_utilization_percent)]);
    table
}

/// `(cpu_used/cpu_capacity + mem_used/mem_capacity) / 2 * 100` (§4.E step 1).
/// A zero-capacity dimension (shouldn't occur for a real node) contributes 0
/// rather than dividing by zero.
fn utilization_percent(node: &Node, used: &Resources) -> f64 {
    let cpu_capacity = node.spec.capacity.cpu_millicores as f64;
    let mem_capacity = node.spec.capacity.memory_mib as f64;
    let cpu_ratio = if cpu_capacity > 0.0 { used.cpu_millicores as f64 / cpu_capacity } else { 0.0 };
    let mem_ratio = if mem_capacity > 0.0 { used.memory_mib as f64 / mem_capacity } else { 0.0 };
    (cpu_ratio + mem_ratio) / 2.0 * 100.0
}
