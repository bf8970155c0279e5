//! EdgeDevice status sync
//!
//! Edge devices are reported to the hub as managed clusters, so their bundle
//! travels under the leaf hub's ManagedClusters delivery key.

use std::sync::Arc;
use std::time::Duration;

use kube::{Api, Client};
use tracing::info;

use edgesync_bundle::{
    generation_from_transport, BundleCollectionEntry, EdgeDeviceStatusBundle, Transport,
};
use edgesync_common::crd::EdgeDevice;
use edgesync_common::{
    delivery_key, EDGE_DEVICE_CLEANUP_FINALIZER, MANAGED_CLUSTERS_MSG_KEY, STATUS_BUNDLE_MSG_TYPE,
};

use crate::status_sync::{self, StatusSyncController};

/// Name used in log lines for the EdgeDevice controller
pub const EDGE_DEVICE_STATUS_SYNC_NAME: &str = "edge-devices-status-sync";

/// Build the EdgeDevice status sync controller
///
/// The single bundle is seeded from the generation the transport last
/// recorded for the ManagedClusters key and is always eligible for sync.
pub fn edge_device_status_sync(
    transport: Arc<dyn Transport>,
    leaf_hub_name: &str,
) -> StatusSyncController<EdgeDevice> {
    let key = delivery_key(leaf_hub_name, MANAGED_CLUSTERS_MSG_KEY);
    let generation = generation_from_transport(transport.as_ref(), &key, STATUS_BUNDLE_MSG_TYPE);

    info!(key = %key, generation, "Creating EdgeDevice status bundle");

    let bundle = Arc::new(EdgeDeviceStatusBundle::edge_devices(leaf_hub_name, generation));
    let entries = vec![BundleCollectionEntry::always(key, bundle)];

    StatusSyncController::new(
        EDGE_DEVICE_STATUS_SYNC_NAME,
        EDGE_DEVICE_CLEANUP_FINALIZER,
        transport,
        entries,
    )
}

/// Watch EdgeDevices and sync them to the hub until shutdown
///
/// Watches a single namespace when `namespace` is set, otherwise all.
pub async fn run_edge_device_status_sync(
    client: Client,
    namespace: Option<&str>,
    transport: Arc<dyn Transport>,
    leaf_hub_name: &str,
    sync_interval: Duration,
) {
    let api: Api<EdgeDevice> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let sync = Arc::new(edge_device_status_sync(transport, leaf_hub_name));
    status_sync::run(client, api, sync, sync_interval).await;
}
