//! Cross-component flow: a Packer cycle that cannot place a task emits an
//! AutoScaleRequest, and a subsequent Autoscaler cycle consumes it and
//! resizes the target pool (§2 "Data flow", §8 invariant 3 and 4).

use std::sync::Arc;

use htas_control_plane::autoscaler::Autoscaler;
use htas_control_plane::cloud_adapter::{CloudAdapter, FakeCloudAdapter};
use htas_control_plane::common::Resources;
use htas_control_plane::config::NodePoolMapping;
use htas_control_plane::model::{Task, VmFlavor, WorkloadClass};
use htas_control_plane::store::{ClusterStore, FakeClusterStore};
use htas_control_plane::task_packer::Packer;

fn flavors() -> Vec<VmFlavor> {
    vec![
        VmFlavor {
            name: "e2-micro".to_string(),
            cpu_cores: 2.0,
            memory_gib: 1.0,
            hourly_price: 0.0060,
        },
        VmFlavor {
            name: "e2-standard-2".to_string(),
            cpu_cores: 2.0,
            memory_gib: 8.0,
            hourly_price: 0.0686,
        },
    ]
}

#[test]
fn unplaceable_long_running_task_triggers_pool_resize_end_to_end() {
    let store = Arc::new(FakeClusterStore::new());
    let cloud = Arc::new(FakeCloudAdapter::new(50));

    let mut task = Task::new("big-task", Resources::new(4000, 16384));
    task.metadata
        .labels
        .insert("workload-type".to_string(), "long-running".to_string());
    store.seed_task(task);

    // No nodes exist yet, so the Packer cannot place it.
    let packer = Packer::new(Arc::clone(&store), Arc::clone(&cloud), None, 300);
    let pack_summary = packer.reconcile_once().unwrap();
    assert_eq!(pack_summary.bound, 0);
    assert_eq!(pack_summary.autoscale_requests_emitted, 1);

    let requests = store.list_autoscale_requests().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].spec.workload_type, WorkloadClass::LongRunning);

    // A second Packer cycle re-emits for the still-Pending task (at-least-once
    // delivery, §9): the request name collides by construction and is
    // treated as already pending (§7).
    let pack_summary_2 = packer.reconcile_once().unwrap();
    assert_eq!(pack_summary_2.autoscale_requests_emitted, 1);
    assert_eq!(store.list_autoscale_requests().unwrap().len(), 1);

    let autoscaler = Autoscaler::new(
        Arc::clone(&store),
        Arc::clone(&cloud),
        flavors(),
        NodePoolMapping::default(),
        300,
        50,
    );
    let autoscale_summary = autoscaler.reconcile_once().unwrap();
    assert_eq!(autoscale_summary.resized, 1);
    assert!(store.list_autoscale_requests().unwrap().is_empty());
    assert!(cloud.pool_size("longrunning-pool") > 0);
}

#[test]
fn binding_is_stable_across_repeated_packer_cycles() {
    let store = Arc::new(FakeClusterStore::new());
    let cloud = Arc::new(FakeCloudAdapter::new(10));

    let task = Task::new("t1", Resources::new(500, 1024));
    store.seed_task(task);

    let mut profile_labels = std::collections::HashMap::new();
    profile_labels.insert("workload".to_string(), "batch".to_string());
    let node = htas_control_plane::model::Node {
        metadata: htas_control_plane::model::node::NodeMetadata {
            name: "bn-1".to_string(),
            labels: profile_labels,
            creation_timestamp: 0,
        },
        spec: htas_control_plane::model::node::NodeSpec {
            instance_type: "e2-standard-2".to_string(),
            capacity: Resources::new(4000, 16384),
        },
        status: htas_control_plane::model::node::NodeStatus {
            allocatable: Resources::new(4000, 16384),
            unschedulable: false,
        },
    };
    store.seed_node(node);

    let packer = Packer::new(Arc::clone(&store), Arc::clone(&cloud), None, 300);

    // First cycle reconciles NodeProfiles from nothing: the Packer falls
    // back to the object store, which has no NodeProfile yet (only a raw
    // Node), so it cannot place until a profile exists. Seed one directly to
    // stand in for a completed Profiler reconcile.
    let profile = htas_control_plane::model::NodeProfile::new(
        "bn-1",
        htas_control_plane::model::node_profile::NodeProfileSpec {
            instance_name: "bn-1".to_string(),
            instance_type: "e2-standard-2".to_string(),
            pool_tag: htas_control_plane::model::node::PoolTag::Batch,
            cpu_capacity: 4000,
            memory_capacity: 16384,
            cpu_available: 4000,
            memory_available: 16384,
            runtime: 0,
        },
    );
    store.seed_node_profile(profile);

    let first = packer.reconcile_once().unwrap();
    assert_eq!(first.bound, 1);
    let bound_node = cloud.binding_of("t1");
    assert_eq!(bound_node.as_deref(), Some("bn-1"));

    // A later cycle observes the same binding and does not re-place it
    // (already Running tasks are not re-evaluated by the Packer).
    let mut bound_task = store.get_task("t1").unwrap();
    bound_task.status.phase = htas_control_plane::model::TaskPhase::Running;
    store.update_task(bound_task).unwrap();

    let second = packer.reconcile_once().unwrap();
    assert_eq!(second.bound, 0);
    assert_eq!(cloud.binding_of("t1").as_deref(), Some("bn-1"));
}
