//! edgesync - mirrors leaf-hub EdgeDevices to the hub as ManagedCluster bundles

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::{Client, CustomResourceExt};

use edgesync_bundle::{InMemoryTransport, Transport};
use edgesync_common::crd::{EdgeDevice, ManagedCluster};
use edgesync_common::telemetry::{init_telemetry, TelemetryConfig};
use edgesync_controller::run_edge_device_status_sync;

/// edgesync - leaf hub EdgeDevice status sync
#[derive(Parser, Debug)]
#[command(name = "edgesync", version, about, long_about = None)]
struct Cli {
    /// Print the EdgeDevice and ManagedCluster CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Name of this leaf hub, stamped on every bundle
    #[arg(long, env = "LH_ID", required_unless_present = "crd")]
    leaf_hub_name: Option<String>,

    /// Seconds between bundle sync ticks
    #[arg(long, env = "EDGESYNC_SYNC_INTERVAL_SECS", default_value = "5")]
    sync_interval_secs: u64,

    /// Namespace to watch (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Emit JSON log lines
    #[arg(long, env = "EDGESYNC_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        for crd in [EdgeDevice::crd(), ManagedCluster::crd()] {
            let yaml = serde_yaml::to_string(&crd)
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("---\n{yaml}");
        }
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        json: cli.log_json,
        ..Default::default()
    })?;

    let leaf_hub_name = cli
        .leaf_hub_name
        .ok_or_else(|| anyhow::anyhow!("--leaf-hub-name is required"))?;
    let sync_interval = Duration::from_secs(cli.sync_interval_secs.max(1));

    tracing::info!(
        leaf_hub = %leaf_hub_name,
        sync_interval = ?sync_interval,
        namespace = cli.namespace.as_deref().unwrap_or("<all>"),
        "edgesync starting"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    // No hub connection is wired in; deliveries are recorded and logged
    let transport = Arc::new(InMemoryTransport::new());

    run_edge_device_status_sync(
        client,
        cli.namespace.as_deref(),
        transport.clone() as Arc<dyn Transport>,
        &leaf_hub_name,
        sync_interval,
    )
    .await;

    tracing::info!(deliveries = transport.deliveries(), "edgesync stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_crd_flag_needs_no_leaf_hub() {
        let cli = Cli::try_parse_from(["edgesync", "--crd"]).unwrap();
        assert!(cli.crd);
        assert!(cli.leaf_hub_name.is_none());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["edgesync", "--leaf-hub-name", "leaf-hub-1"]).unwrap();
        assert_eq!(cli.leaf_hub_name.as_deref(), Some("leaf-hub-1"));
        assert_eq!(cli.sync_interval_secs, 5);
        assert!(cli.namespace.is_none());
        assert!(!cli.log_json);
    }
}
