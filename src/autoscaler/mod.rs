//! Autoscaler (§4.D): consumes AutoScaleRequests, applies zero-bin
//! subtraction for batch demand, runs the greedy flavor selector, and
//! resizes the target node pool.
//!
//! Grounded in `original_source/src/autoscaler/autoscaler.py`'s
//! `batch_node_autoscaling`/`greedy_autoscaling`/`autoscale_loop` (single
//! `time.sleep` placed after the per-request `for` loop, not per request)
//! and the teacher's `autoscalers/cluster_autoscaler/cluster_autoscaler.rs`
//! proxy/loop shape.

pub mod selector;

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::cloud_adapter::{with_retry, CloudAdapter};
use crate::common::Resources;
use crate::config::NodePoolMapping;
use crate::error::AutoscalerError;
use crate::model::{AutoScaleRequest, NodeProfile, PoolTag, Task, TaskPhase, VmFlavor, WorkloadClass};
use crate::store::ClusterStore;

pub const RECONCILE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
pub struct AutoscaleCycleSummary {
    pub resized: usize,
    pub zero_bin_satisfied: usize,
    pub left_pending: usize,
}

pub struct Autoscaler<S: ClusterStore, C: CloudAdapter> {
    store: Arc<S>,
    cloud: Arc<C>,
    flavors: Vec<VmFlavor>,
    node_pools: NodePoolMapping,
    scaling_cycle_secs: u64,
    max_node_count: u32,
}

impl<S: ClusterStore, C: CloudAdapter> Autoscaler<S, C> {
    pub fn new(
        store: Arc<S>,
        cloud: Arc<C>,
        flavors: Vec<VmFlavor>,
        node_pools: NodePoolMapping,
        scaling_cycle_secs: u64,
        max_node_count: u32,
    ) -> Self {
        Self {
            store,
            cloud,
            flavors,
            node_pools,
            scaling_cycle_secs,
            max_node_count,
        }
    }

    fn pool_name(&self, workload_type: WorkloadClass) -> &str {
        match workload_type {
            WorkloadClass::Batch => &self.node_pools.batch,
            WorkloadClass::LongRunning => &self.node_pools.long_running,
        }
    }

    /// Processes every currently-pending AutoScaleRequest in sequence within
    /// one wake-up; the loop driver sleeps once after the whole batch (§4.D).
    pub fn reconcile_once(&self) -> Result<AutoscaleCycleSummary, AutoscalerError> {
        let mut summary = AutoscaleCycleSummary::default();

        for request in self.store.list_autoscale_requests()? {
            match self.process_request(&request) {
                Ok(Outcome::Resized) => {
                    summary.resized += 1;
                    self.store.delete_autoscale_request(&request.metadata.name)?;
                }
                Ok(Outcome::ZeroBinSatisfied) => {
                    summary.zero_bin_satisfied += 1;
                    self.store.delete_autoscale_request(&request.metadata.name)?;
                }
                Ok(Outcome::NothingToDo) => {
                    self.store.delete_autoscale_request(&request.metadata.name)?;
                }
                Err(err) => {
                    warn!(
                        "autoscale request {} failed: {}, leaving in place for next cycle",
                        request.metadata.name, err
                    );
                    summary.left_pending += 1;
                }
            }
        }

        Ok(summary)
    }

    fn process_request(&self, request: &AutoScaleRequest) -> Result<Outcome, AutoscalerError> {
        let tasks: Vec<Task> = request
            .spec
            .pod_names
            .iter()
            .filter_map(|name| self.store.get_task(name).ok())
            .filter(|t| t.status.phase == TaskPhase::Pending)
            .collect();
        if tasks.is_empty() {
            return Ok(Outcome::NothingToDo);
        }

        let mut total = tasks
            .iter()
            .fold(Resources::ZERO, |acc, t| acc.saturating_add(&t.spec.requests));

        if request.spec.workload_type == WorkloadClass::Batch {
            let zero_bin = self.zero_bin_capacity()?;
            total = total.saturating_sub(&zero_bin);
            if total.cpu_millicores == 0 && total.memory_mib == 0 {
                return Ok(Outcome::ZeroBinSatisfied);
            }
        }

        let remaining_cpu_cores = total.cpu_millicores as f64 / 1000.0;
        let remaining_mem_gib = total.memory_mib as f64 / 1024.0;
        let picks = selector::select_flavors(&self.flavors, remaining_cpu_cores, remaining_mem_gib);

        let pool = self.pool_name(request.spec.workload_type).to_string();
        let current = with_retry(|| self.cloud.current_pool_size(&pool))?;
        let desired = current + picks.len() as u32;
        let requested = with_retry(|| self.cloud.resize_node_pool(&pool, desired.min(self.max_node_count)))?;
        info!(
            "autoscaler resized pool {} to {} nodes ({} flavor picks for request {})",
            pool,
            requested,
            picks.len(),
            request.metadata.name
        );

        Ok(Outcome::Resized)
    }

    /// Sums capacity of batch-pool NodeProfiles whose `runtime-age < scaling
    /// cycle` (the "zero bin", §4.D step 3).
    fn zero_bin_capacity(&self) -> Result<Resources, AutoscalerError> {
        let profiles = self.store.list_node_profiles()?;
        Ok(profiles
            .into_iter()
            .filter(|p| p.spec.pool_tag == PoolTag::Batch && p.spec.runtime < self.scaling_cycle_secs)
            .fold(Resources::ZERO, |acc, p: NodeProfile| {
                acc.saturating_add(&Resources::new(p.spec.cpu_capacity, p.spec.memory_capacity))
            }))
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(RECONCILE_PERIOD);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.reconcile_once() {
                        Ok(summary) => info!(
                            "autoscale cycle: {} resized, {} zero-bin satisfied, {} left pending",
                            summary.resized, summary.zero_bin_satisfied, summary.left_pending
                        ),
                        Err(err) => warn!("autoscale cycle failed: {}", err),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("autoscaler shutting down");
                        return;
                    }
                }
            }
        }
    }
}

enum Outcome {
    Resized,
    ZeroBinSatisfied,
    NothingToDo,
}
