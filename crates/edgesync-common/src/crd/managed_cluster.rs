//! ManagedCluster resource as the hub expects it
//!
//! Mirrors the subset of the open-cluster-management ManagedCluster schema
//! that edge devices are mapped onto.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;

/// Condition type set when the hub accepts the cluster
pub const CONDITION_HUB_ACCEPTED: &str = "HubAcceptedManagedCluster";

/// Condition type set when the cluster has joined the hub
pub const CONDITION_JOINED: &str = "ManagedClusterJoined";

/// Condition type reflecting cluster availability
pub const CONDITION_AVAILABLE: &str = "ManagedClusterConditionAvailable";

/// Lease duration advertised for synthesized clusters
pub const DEFAULT_LEASE_DURATION_SECONDS: i32 = 60;

/// Specification for a ManagedCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cluster.open-cluster-management.io",
    version = "v1",
    kind = "ManagedCluster",
    plural = "managedclusters",
    status = "ManagedClusterStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    /// Whether the hub accepts the cluster's agent
    #[serde(default)]
    pub hub_accepts_client: bool,

    /// Lease duration for the cluster's availability lease
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration_seconds: Option<i32>,
}

/// Status for a ManagedCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterStatus {
    /// Conditions in the order they were synthesized
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
