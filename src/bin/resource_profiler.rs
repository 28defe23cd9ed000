//! Resource Profiler daemon entry point (§4.B): runs the reconcile loop and
//! the read-only `GET /nodes` HTTP server as two independent tokio tasks
//! sharing the last-good snapshot (§5 "Suspension points").

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use htas_control_plane::bootstrap::{self, CommonArgs};
use htas_control_plane::resource_profiler::{http, Profiler};
use htas_control_plane::store::FakeClusterStore;

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
    /// Address the `GET /nodes` HTTP endpoint binds to (§6 "HTTP").
    #[arg(long, default_value = "0.0.0.0:8080")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = bootstrap::load_config(&args.common);
    bootstrap::init_logging(&config);
    let cluster_name = bootstrap::require_cluster_name(&config);

    info!("resource profiler starting for cluster {} ({})", cluster_name, config.zone);

    let store = Arc::new(FakeClusterStore::new());
    let profiler = Arc::new(Profiler::new(store));
    let snapshot = profiler.snapshot_handle();

    let shutdown = bootstrap::shutdown_signal().await;

    let http_addr = args.addr;
    let http_task = tokio::spawn(async move {
        if let Err(err) = http::serve(snapshot, http_addr).await {
            error!("profiler HTTP server exited: {}", err);
        }
    });

    profiler.run(shutdown).await;
    http_task.abort();
}
