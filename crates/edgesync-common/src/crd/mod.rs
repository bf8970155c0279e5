//! Custom Resource Definitions used by edgesync
//!
//! [`EdgeDevice`] is the source object owned by the leaf hub.
//! [`ManagedCluster`] is the hub-facing representation it is mirrored into.

mod edge_device;
mod managed_cluster;
mod types;

pub use edge_device::{
    DeploymentStatus, EdgeDevice, EdgeDeviceSpec, EdgeDeviceStatus, HeartbeatConfiguration,
};
pub use managed_cluster::{
    ManagedCluster, ManagedClusterSpec, ManagedClusterStatus, CONDITION_AVAILABLE,
    CONDITION_HUB_ACCEPTED, CONDITION_JOINED, DEFAULT_LEASE_DURATION_SECONDS,
};
pub use types::{Condition, ConditionStatus};
