//! Shared startup plumbing for the four daemon binaries: CLI flags, config
//! layering, logging, and the shutdown signal.
//!
//! Grounded in the teacher's `main.rs` as a trivial setup-then-run pattern,
//! generalized to four real daemons (DESIGN.md, "Daemon entry points"); the
//! `logs_filepath` / `file-rotate` pairing follows the field the teacher
//! declares in `SimulationConfig` but never wires up in the retrieved
//! sources.

use std::path::PathBuf;

use clap::Parser;
use log::error;

use crate::config::ControlPlaneConfig;

/// CLI flags common to all four daemons (§6 "Configuration layering":
/// CLI > environment > config file > built-in default).
#[derive(Parser, Debug)]
pub struct CommonArgs {
    /// Path to a YAML config file carrying the flavor catalog, pool-name
    /// mapping, and loop cadences.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides `cluster_name` (falls back to `GKE_CLUSTER_NAME`).
    #[arg(long)]
    pub cluster_name: Option<String>,
    /// Overrides `zone` (falls back to `GCP_ZONE`, default `us-central1-a`).
    #[arg(long)]
    pub zone: Option<String>,
    /// Routes logs through a rotating file sink instead of stderr.
    #[arg(long)]
    pub log_file: Option<String>,
}

/// Loads the layered config: file, then environment fallbacks, then CLI
/// overrides (highest precedence).
pub fn load_config(args: &CommonArgs) -> ControlPlaneConfig {
    let mut config = match &args.config {
        Some(path) => {
            let yaml = std::fs::read_to_string(path).unwrap_or_else(|err| {
                eprintln!("fatal: failed to read config file {}: {}", path.display(), err);
                std::process::exit(1);
            });
            ControlPlaneConfig::from_yaml_str(&yaml).unwrap_or_else(|err| {
                eprintln!("fatal: failed to parse config file {}: {}", path.display(), err);
                std::process::exit(1);
            })
        }
        None => ControlPlaneConfig::default(),
    };

    config.apply_env_fallbacks();

    if let Some(cluster_name) = &args.cluster_name {
        config.cluster_name = Some(cluster_name.clone());
    }
    if let Some(zone) = &args.zone {
        config.zone = zone.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.logs_filepath = Some(log_file.clone());
    }

    config
}

/// Initializes `log` via `env_logger`, routing through `file-rotate` when
/// `logs_filepath` is configured (teacher's `logs_filepath` convention).
pub fn init_logging(config: &ControlPlaneConfig) {
    match &config.logs_filepath {
        Some(path) => {
            use file_rotate::compression::Compression;
            use file_rotate::suffix::AppendCount;
            use file_rotate::{ContentLimit, FileRotate};

            let rotator = FileRotate::new(
                path,
                AppendCount::new(5),
                ContentLimit::Bytes(10 * 1024 * 1024),
                Compression::None,
                None,
            );
            env_logger::Builder::from_default_env()
                .target(env_logger::Target::Pipe(Box::new(rotator)))
                .init();
        }
        None => {
            let _ = env_logger::try_init();
        }
    }
}

/// Fatal if no cluster name is configured anywhere in the layering (§6 Exit
/// codes: "non-zero exit only on fatal configuration errors ... missing
/// cluster name").
pub fn require_cluster_name(config: &ControlPlaneConfig) -> String {
    config.cluster_name.clone().unwrap_or_else(|| {
        error!(
            "fatal: no cluster name configured (set --cluster-name, config.cluster_name, or GKE_CLUSTER_NAME)"
        );
        std::process::exit(1);
    })
}

/// A `watch` channel flipped to `true` on SIGINT/ctrl-c; each loop's
/// `tokio::select!` observes it only at the sleep boundary, so no cycle is
/// left half-committed (§5 "Shutdown").
pub async fn shutdown_signal() -> tokio::sync::watch::Receiver<bool> {
    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(true);
        }
    });
    rx
}
