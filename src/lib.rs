//! Heterogeneous workload-aware scheduling and autoscaling control plane:
//! Task Packer, Autoscaler, Resource Profiler, and Instance Cleaner, plus
//! their shared object model and the Cloud Adapter boundary they all call
//! through.

pub mod autoscaler;
pub mod bootstrap;
pub mod cloud_adapter;
pub mod common;
pub mod config;
pub mod error;
pub mod instance_cleaner;
pub mod model;
pub mod resource_profiler;
pub mod store;
pub mod task_packer;

/// Wall-clock helpers kept in one place so every component agrees on "now"
/// (runtime-age, AutoScaleRequest naming).
pub mod time {
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn unix_now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs()
    }
}
