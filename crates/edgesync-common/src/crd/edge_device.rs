//! EdgeDevice Custom Resource Definition
//!
//! An EdgeDevice is a device registered with the leaf hub. It is the source
//! object edgesync mirrors to the hub as a ManagedCluster. Only the request
//! and last-seen timestamps are interpreted; the rest travels to the hub
//! verbatim inside an annotation.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for an EdgeDevice
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "management.k4e.io",
    version = "v1alpha1",
    kind = "EdgeDevice",
    plural = "edgedevices",
    status = "EdgeDeviceStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Last Seen","type":"date","jsonPath":".status.lastSeenTime"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDeviceSpec {
    /// When the device requested to join the leaf hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_time: Option<Time>,

    /// Heartbeat settings pushed to the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<HeartbeatConfiguration>,

    /// OS image the device should run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_image_id: Option<String>,
}

/// Heartbeat configuration for a device
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatConfiguration {
    /// Seconds between heartbeats
    #[serde(default)]
    pub period_seconds: i64,
}

/// Status of a workload deployment on the device
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    /// Deployment identifier
    pub id: String,

    /// Deployment phase as reported by the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Last time the phase changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

/// Status for an EdgeDevice
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDeviceStatus {
    /// Last time the device sent a heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_time: Option<Time>,

    /// Device phase (e.g. "up", "degraded")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Workload deployments running on the device
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployments: Vec<DeploymentStatus>,
}

impl EdgeDevice {
    /// Time the device asked to join, if recorded
    pub fn request_time(&self) -> Option<&Time> {
        self.spec.request_time.as_ref()
    }

    /// Time the device was last heard from, if recorded
    pub fn last_seen_time(&self) -> Option<&Time> {
        self.status.as_ref()?.last_seen_time.as_ref()
    }
}
