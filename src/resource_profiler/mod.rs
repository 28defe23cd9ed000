//! Resource Profiler (§4.B): a single-writer reconciler producing NodeProfile
//! records, served read-only over HTTP.
//!
//! Grounded in `original_source/src/resource_profiler/resource_profiler.py`'s
//! `update_node_profiles` reconcile loop and Flask `/nodes` route (there run
//! as two threads sharing process memory; here as two tokio tasks sharing an
//! `Arc<RwLock<...>>` snapshot).

pub mod http;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{error, info};

use crate::common::Resources;
use crate::error::ProfilerError;
use crate::model::node_profile::NodeProfileSpec;
use crate::model::{NodeProfile, TaskPhase};
use crate::store::ClusterStore;
use crate::time::unix_now_secs;

pub const RECONCILE_PERIOD: Duration = Duration::from_secs(20);

/// The last-good snapshot the HTTP layer serves from (§4.B: "on reconcile
/// failure it serves the prior snapshot" — stale-ok reads).
pub type Snapshot = Arc<RwLock<Vec<NodeProfile>>>;

pub struct Profiler<S: ClusterStore> {
    store: Arc<S>,
    snapshot: Snapshot,
}

impl<S: ClusterStore> Profiler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            snapshot: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn snapshot_handle(&self) -> Snapshot {
        Arc::clone(&self.snapshot)
    }

    /// One reconcile pass: enumerate pool-tagged nodes, sum requests of their
    /// Running tasks, upsert a fresh NodeProfile per node. Never touches
    /// `runtime`'s meaning beyond recomputing `now - creation_timestamp`
    /// (§9 "Batch runtime-age ownership ambiguity" resolution, DESIGN.md).
    pub fn reconcile_once(&self) -> Result<Vec<NodeProfile>, ProfilerError> {
        let now = unix_now_secs();
        let nodes = self.store.list_nodes()?;

        let mut profiles = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Some(pool_tag) = node.pool_tag() else {
                continue;
            };

            let used = self
                .store
                .list_tasks()?
                .into_iter()
                .filter(|t| {
                    t.status.phase == TaskPhase::Running
                        && t.spec.node_name.as_deref() == Some(node.metadata.name.as_str())
                })
                .fold(Resources::ZERO, |acc, t| acc.saturating_add(&t.spec.requests));

            let available = node.status.allocatable.saturating_sub(&used);

            let profile = NodeProfile::new(
                node.metadata.name.clone(),
                NodeProfileSpec {
                    instance_name: node.metadata.name.clone(),
                    instance_type: node.spec.instance_type.clone(),
                    pool_tag,
                    cpu_capacity: node.spec.capacity.cpu_millicores,
                    memory_capacity: node.spec.capacity.memory_mib,
                    cpu_available: available.cpu_millicores,
                    memory_available: available.memory_mib,
                    runtime: node.runtime_age_secs(now),
                },
            );

            self.store.upsert_node_profile(profile.clone())?;
            profiles.push(profile);
        }

        *self.snapshot.write().unwrap() = profiles.clone();
        Ok(profiles)
    }

    /// Runs the reconcile loop until `shutdown` resolves. On reconcile
    /// failure the prior snapshot is left in place and the cycle is skipped
    /// (§4.B stale-ok serving).
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(RECONCILE_PERIOD);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.reconcile_once() {
                        Ok(profiles) => info!("reconciled {} node profiles", profiles.len()),
                        Err(err) => error!("reconcile cycle failed, serving stale snapshot: {}", err),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("resource profiler shutting down");
                        return;
                    }
                }
            }
        }
    }
}
