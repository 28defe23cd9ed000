//! Instance Cleaner daemon entry point (§4.E).

use std::sync::Arc;

use clap::Parser;
use log::info;

use htas_control_plane::bootstrap::{self, CommonArgs};
use htas_control_plane::cloud_adapter::FakeCloudAdapter;
use htas_control_plane::instance_cleaner::migration::ProcessCheckpointRestoreTool;
use htas_control_plane::instance_cleaner::Cleaner;
use htas_control_plane::store::FakeClusterStore;

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Path to the external checkpoint/restore tool binary (§1: out of
    /// scope, specified only at its interface).
    #[arg(long, default_value = "checkpoint-tool")]
    checkpoint_tool: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = bootstrap::load_config(&args.common);
    bootstrap::init_logging(&config);
    let cluster_name = bootstrap::require_cluster_name(&config);

    info!("instance cleaner starting for cluster {} ({})", cluster_name, config.zone);

    let store = Arc::new(FakeClusterStore::new());
    let cloud = Arc::new(FakeCloudAdapter::new(config.max_node_count));
    let tool = Arc::new(ProcessCheckpointRestoreTool::new(args.checkpoint_tool));
    let cleaner = Cleaner::new(store, cloud, tool, config.utilization_threshold_percent);

    let shutdown = bootstrap::shutdown_signal().await;
    cleaner.run(shutdown).await;
}
