//! Autoscaler daemon entry point (§4.D).

use std::sync::Arc;

use clap::Parser;
use log::info;

use htas_control_plane::autoscaler::Autoscaler;
use htas_control_plane::bootstrap::{self, CommonArgs};
use htas_control_plane::cloud_adapter::FakeCloudAdapter;
use htas_control_plane::model::validate_flavor_catalog;
use htas_control_plane::store::FakeClusterStore;

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = bootstrap::load_config(&args.common);
    bootstrap::init_logging(&config);
    let cluster_name = bootstrap::require_cluster_name(&config);

    // Flavor catalog empty or invalid is fatal: refuse to start (§7, §8).
    if let Err(err) = validate_flavor_catalog(&config.vm_flavors) {
        eprintln!("fatal: invalid flavor catalog: {}", err);
        std::process::exit(1);
    }

    info!("autoscaler starting for cluster {} ({})", cluster_name, config.zone);

    let store = Arc::new(FakeClusterStore::new());
    let cloud = Arc::new(FakeCloudAdapter::new(config.max_node_count));
    let autoscaler = Autoscaler::new(
        store,
        cloud,
        config.vm_flavors,
        config.node_pools,
        config.scaling_cycle_secs,
        config.max_node_count,
    );

    let shutdown = bootstrap::shutdown_signal().await;
    autoscaler.run(shutdown).await;
}
