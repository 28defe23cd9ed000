//! Task Packer (§4.C): places Pending tasks via BFD/Time-Bin BFD, falling
//! back to an AutoScaleRequest when no candidate exists.
//!
//! Grounded in the teacher's `core/scheduler/scheduler.rs` `run_scheduling_cycle`
//! shape (fetch pending, pick algorithm, bind-or-fail) and
//! `original_source/src/task_packer/task_packer.py`'s HTTP-first,
//! object-store-fallback NodeProfile fetch.

pub mod bfd;
pub mod plugin;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::cloud_adapter::{with_retry, CloudAdapter};
use crate::error::{CloudError, PackerError};
use crate::model::{AutoScaleRequest, NodeProfile, PoolTag, Task, WorkloadClass};
use crate::store::ClusterStore;
use crate::time::unix_now_secs;

pub const RECONCILE_PERIOD: Duration = Duration::from_secs(20);
/// `GET /nodes` read timeout before falling back to the object store (§5).
const PROFILER_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
pub struct PackCycleSummary {
    pub bound: usize,
    pub autoscale_requests_emitted: usize,
    pub skipped: usize,
}

pub struct Packer<S: ClusterStore, C: CloudAdapter> {
    store: Arc<S>,
    cloud: Arc<C>,
    profiler_url: Option<String>,
    scaling_cycle_secs: u64,
}

impl<S: ClusterStore, C: CloudAdapter> Packer<S, C> {
    pub fn new(store: Arc<S>, cloud: Arc<C>, profiler_url: Option<String>, scaling_cycle_secs: u64) -> Self {
        Self {
            store,
            cloud,
            profiler_url,
            scaling_cycle_secs,
        }
    }

    /// Prefers the Profiler's HTTP endpoint; falls back to the object store
    /// on any request failure or timeout (§4.C step 2, §7 "NodeProfile fetch
    /// failure").
    fn fetch_node_profiles(&self) -> Result<Vec<NodeProfile>, PackerError> {
        if let Some(url) = &self.profiler_url {
            match fetch_profiles_over_http(url) {
                Ok(profiles) => return Ok(profiles),
                Err(err) => warn!("profiler HTTP fetch failed ({}), falling back to object store", err),
            }
        }
        Ok(self.store.list_node_profiles()?)
    }

    pub fn reconcile_once(&self) -> Result<PackCycleSummary, PackerError> {
        let mut summary = PackCycleSummary::default();

        let tasks: Vec<Task> = self
            .store
            .list_tasks()?
            .into_iter()
            .filter(Task::is_eligible_for_scheduling)
            .collect();
        if tasks.is_empty() {
            return Ok(summary);
        }

        let profiles = self.fetch_node_profiles()?;
        let mut batch_profiles: Vec<NodeProfile> = Vec::new();
        let mut longrunning_profiles: Vec<NodeProfile> = Vec::new();
        for profile in profiles {
            match profile.spec.pool_tag {
                PoolTag::Batch => batch_profiles.push(profile),
                PoolTag::LongRunning => longrunning_profiles.push(profile),
            }
        }

        let mut unplaced: HashMap<WorkloadClass, Vec<String>> = HashMap::new();

        for task in tasks {
            let requests = task.spec.requests;
            let candidate_name = match task.workload_class() {
                WorkloadClass::LongRunning => {
                    bfd::select_bfd(&requests, &longrunning_profiles).map(|p| p.metadata.name.clone())
                }
                WorkloadClass::Batch => bfd::select_time_bin_bfd(
                    &requests,
                    task.runtime_secs(),
                    self.scaling_cycle_secs,
                    &batch_profiles,
                )
                .map(|p| p.metadata.name.clone()),
            };

            match candidate_name {
                Some(node_name) => {
                    match self.commit_binding(&task, &node_name, &mut batch_profiles, &mut longrunning_profiles) {
                        Ok(()) => summary.bound += 1,
                        Err(CloudError::AlreadyBound) => summary.bound += 1,
                        Err(err) => {
                            warn!("binding {} to {} failed: {}, retrying next cycle", task.metadata.name, node_name, err);
                            summary.skipped += 1;
                        }
                    }
                }
                None => {
                    unplaced
                        .entry(task.workload_class())
                        .or_default()
                        .push(task.metadata.name.clone());
                }
            }
        }

        let now = unix_now_secs();
        for (workload_class, names) in unplaced {
            if names.is_empty() {
                continue;
            }
            let request = AutoScaleRequest::new(workload_class, names, now);
            self.store.create_autoscale_request(request)?;
            summary.autoscale_requests_emitted += 1;
        }

        Ok(summary)
    }

    /// Binds the task, persists the updated task, and reduces the matching
    /// in-memory profile's headroom so subsequent tasks this cycle see the
    /// updated availability (the store itself is only refreshed by the
    /// Profiler's next reconcile, per §5 "eventually consistent" reads).
    fn commit_binding(
        &self,
        task: &Task,
        node_name: &str,
        batch_profiles: &mut [NodeProfile],
        longrunning_profiles: &mut [NodeProfile],
    ) -> Result<(), CloudError> {
        with_retry(|| self.cloud.bind(&task.metadata.name, node_name))?;

        let mut updated = task.clone();
        updated.spec.node_name = Some(node_name.to_string());
        if let Err(err) = self.store.update_task(updated) {
            warn!("bound {} but failed to persist binding: {}", task.metadata.name, err);
        }

        for profile in batch_profiles.iter_mut().chain(longrunning_profiles.iter_mut()) {
            if profile.metadata.name == node_name {
                profile.spec.cpu_available = profile.spec.cpu_available.saturating_sub(task.spec.requests.cpu_millicores);
                profile.spec.memory_available = profile.spec.memory_available.saturating_sub(task.spec.requests.memory_mib);
                break;
            }
        }

        Ok(())
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(RECONCILE_PERIOD);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // reconcile_once may shell out to the profiler over
                    // `reqwest::blocking`, which spins its own inner runtime;
                    // block_in_place hands this worker thread's other tasks
                    // off so that doesn't deadlock/panic against the
                    // multi-thread runtime we run under (§5 "blocking I/O ...
                    // is permitted").
                    match tokio::task::block_in_place(|| self.reconcile_once()) {
                        Ok(summary) => info!(
                            "pack cycle: {} bound, {} autoscale requests emitted, {} skipped",
                            summary.bound, summary.autoscale_requests_emitted, summary.skipped
                        ),
                        Err(err) => warn!("pack cycle failed: {}", err),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("task packer shutting down");
                        return;
                    }
                }
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct NodeProfileList {
    items: Vec<NodeProfile>,
}

fn fetch_profiles_over_http(url: &str) -> Result<Vec<NodeProfile>, reqwest::Error> {
    let client = reqwest::blocking::Client::builder()
        .timeout(PROFILER_HTTP_TIMEOUT)
        .build()?;
    let body: NodeProfileList = client.get(url).send()?.error_for_status()?.json()?;
    Ok(body.items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud_adapter::FakeCloudAdapter;
    use crate::common::Resources;
    use crate::model::node_profile::NodeProfileSpec;
    use crate::model::task::WorkloadClass;
    use crate::store::FakeClusterStore;

    fn profile(name: &str, pool: PoolTag, cpu_av: u32, mem_av: u64, runtime: u64) -> NodeProfile {
        NodeProfile::new(
            name,
            NodeProfileSpec {
                instance_name: name.to_string(),
                instance_type: "e2-standard-2".to_string(),
                pool_tag: pool,
                cpu_capacity: cpu_av,
                memory_capacity: mem_av,
                cpu_available: cpu_av,
                memory_available: mem_av,
                runtime,
            },
        )
    }

    fn longrunning_task(name: &str, cpu: u32, mem: u64) -> Task {
        let mut task = Task::new(name, Resources::new(cpu, mem));
        task.metadata
            .labels
            .insert("workload-type".to_string(), "long-running".to_string());
        task
    }

    #[test]
    fn binds_eligible_task_to_bfd_candidate() {
        let store = Arc::new(FakeClusterStore::new());
        store.seed_task(longrunning_task("t1", 1000, 2000));
        store.seed_node_profile(profile("lr-a", PoolTag::LongRunning, 4000, 8000, 0));
        store.seed_node_profile(profile("lr-b", PoolTag::LongRunning, 4000, 4000, 0));

        let cloud = Arc::new(FakeCloudAdapter::new(10));
        let packer = Packer::new(Arc::clone(&store), Arc::clone(&cloud), None, 300);

        let summary = packer.reconcile_once().unwrap();
        assert_eq!(summary.bound, 1);
        assert_eq!(cloud.binding_of("t1").as_deref(), Some("lr-b"));
    }

    #[test]
    fn emits_autoscale_request_when_nothing_fits() {
        let store = Arc::new(FakeClusterStore::new());
        store.seed_task(longrunning_task("t1", 8000, 16000));

        let cloud = Arc::new(FakeCloudAdapter::new(10));
        let packer = Packer::new(Arc::clone(&store), cloud, None, 300);

        let summary = packer.reconcile_once().unwrap();
        assert_eq!(summary.bound, 0);
        assert_eq!(summary.autoscale_requests_emitted, 1);

        let requests = store.list_autoscale_requests().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].spec.workload_type, WorkloadClass::LongRunning);
        assert_eq!(requests[0].spec.pod_names, vec!["t1".to_string()]);
    }

    #[test]
    fn successive_tasks_in_same_cycle_do_not_overpack_one_node() {
        let store = Arc::new(FakeClusterStore::new());
        store.seed_task(longrunning_task("t1", 1000, 3000));
        store.seed_task(longrunning_task("t2", 1000, 3000));
        // Only one node, with just enough for one of the two tasks.
        store.seed_node_profile(profile("lr-a", PoolTag::LongRunning, 4000, 4000, 0));

        let cloud = Arc::new(FakeCloudAdapter::new(10));
        let packer = Packer::new(Arc::clone(&store), Arc::clone(&cloud), None, 300);

        let summary = packer.reconcile_once().unwrap();
        assert_eq!(summary.bound, 1);
        assert_eq!(summary.autoscale_requests_emitted, 1);
    }

    #[test]
    fn ineligible_tasks_are_ignored() {
        let store = Arc::new(FakeClusterStore::new());
        let mut task = longrunning_task("t1", 1000, 2000);
        task.spec.scheduler_name = "other-scheduler".to_string();
        store.seed_task(task);
        store.seed_node_profile(profile("lr-a", PoolTag::LongRunning, 4000, 8000, 0));

        let cloud = Arc::new(FakeCloudAdapter::new(10));
        let packer = Packer::new(Arc::clone(&store), cloud, None, 300);

        let summary = packer.reconcile_once().unwrap();
        assert_eq!(summary.bound, 0);
        assert_eq!(summary.autoscale_requests_emitted, 0);
    }
}
