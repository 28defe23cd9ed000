//! Object model shared by the Packer, Autoscaler, Profiler, and Cleaner.
//! Every type mirrors the orchestrator's own `metadata`/`spec`/`status`
//! envelope convention rather than a flat record.

pub mod autoscale_request;
pub mod flavor;
pub mod node;
pub mod node_profile;
pub mod task;

pub use autoscale_request::{AutoScaleRequest, AutoScaleRequestSpec};
pub use flavor::{validate_flavor_catalog, VmFlavor};
pub use node::{Node, PoolTag};
pub use node_profile::NodeProfile;
pub use task::{RestartPolicy, Task, TaskPhase, TaskStatus, WorkloadClass};
