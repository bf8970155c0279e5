//! Common types for edgesync: CRDs, errors, telemetry and well-known keys

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Annotation on a ManagedCluster carrying the full EdgeDevice as JSON
///
/// Hub consumers that need device fields the ManagedCluster schema does not
/// model read them from here.
pub const EDGE_DEVICE_ANNOTATION: &str =
    "hub-of-hubs.open-cluster-management.io/edge-device-resource";

/// Finalizer placed on EdgeDevices so deletions reach the bundle
pub const EDGE_DEVICE_CLEANUP_FINALIZER: &str =
    "hub-of-hubs.open-cluster-management.io/edge-device-cleanup";

/// Label key identifying the vendor of a managed cluster
pub const VENDOR_LABEL_KEY: &str = "vendor";

/// Label key carrying the managed cluster name
pub const NAME_LABEL_KEY: &str = "name";

/// Vendor label value for ManagedClusters synthesized from EdgeDevices
pub const EDGE_DEVICE_VENDOR: &str = "K4E";

/// Transport message key suffix for managed cluster bundles
pub const MANAGED_CLUSTERS_MSG_KEY: &str = "ManagedClusters";

/// Transport message type for status bundles
pub const STATUS_BUNDLE_MSG_TYPE: &str = "StatusBundle";

/// Build the transport delivery key for a leaf hub and message key
///
/// Keys have the form `<leafHubName>.<msgKey>`.
pub fn delivery_key(leaf_hub_name: &str, msg_key: &str) -> String {
    format!("{}.{}", leaf_hub_name, msg_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_key_format() {
        assert_eq!(
            delivery_key("leaf-hub-1", MANAGED_CLUSTERS_MSG_KEY),
            "leaf-hub-1.ManagedClusters"
        );
    }
}
