//! Task Packer daemon entry point (§4.C).

use std::sync::Arc;

use clap::Parser;
use log::info;

use htas_control_plane::bootstrap::{self, CommonArgs};
use htas_control_plane::cloud_adapter::FakeCloudAdapter;
use htas_control_plane::store::FakeClusterStore;
use htas_control_plane::task_packer::Packer;

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Base URL of the Resource Profiler's `GET /nodes` endpoint; falls back
    /// to a direct object-store read on any failure (§4.C step 2).
    #[arg(long)]
    profiler_url: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = bootstrap::load_config(&args.common);
    bootstrap::init_logging(&config);
    let cluster_name = bootstrap::require_cluster_name(&config);

    info!("task packer starting for cluster {} ({})", cluster_name, config.zone);

    let store = Arc::new(FakeClusterStore::new());
    let cloud = Arc::new(FakeCloudAdapter::new(config.max_node_count));
    let packer = Packer::new(
        store,
        cloud,
        args.profiler_url.or_else(|| Some("http://127.0.0.1:8080/nodes".to_string())),
        config.scaling_cycle_secs,
    );

    let shutdown = bootstrap::shutdown_signal().await;
    packer.run(shutdown).await;
}
