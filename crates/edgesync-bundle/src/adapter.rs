//! Adapters from leaf-hub source objects to hub-facing target objects
//!
//! An edge device pretends to be a managed cluster on the hub. The
//! ManagedCluster schema cannot carry device fields, so the whole device is
//! attached as an annotation and the status conditions the hub relies on are
//! synthesized from the device's timestamps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::DynamicObject;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use edgesync_common::crd::{
    Condition, ConditionStatus, EdgeDevice, ManagedCluster, ManagedClusterSpec,
    ManagedClusterStatus, CONDITION_AVAILABLE, CONDITION_HUB_ACCEPTED, CONDITION_JOINED,
    DEFAULT_LEASE_DURATION_SECONDS,
};
use edgesync_common::{EDGE_DEVICE_ANNOTATION, EDGE_DEVICE_VENDOR, NAME_LABEL_KEY, VENDOR_LABEL_KEY};

use crate::object::BundleObject;

/// Transformation of one source object into one target object
///
/// Implementations must be pure: adapting the same source twice yields equal
/// targets, and the target keeps the source's UID and resource version.
pub trait StatusAdapter: Send + Sync + 'static {
    /// The watched object kind this adapter accepts
    type Source: BundleObject + Resource<DynamicType = ()> + DeserializeOwned;

    /// The hub-facing object kind this adapter produces
    type Target: BundleObject + Resource<DynamicType = ()>;

    /// Build the target representation of `source`
    fn adapt(&self, source: &Self::Source) -> Self::Target;

    /// Accept an untyped object if it is of this adapter's source kind
    ///
    /// Returns None for objects of other kinds, objects without type
    /// information, and objects that fail to parse.
    fn accept(&self, object: &DynamicObject) -> Option<Self::Source> {
        let types = object.types.as_ref()?;
        if types.kind != <Self::Source as Resource>::kind(&())
            || types.api_version != <Self::Source as Resource>::api_version(&())
        {
            return None;
        }

        match object.clone().try_parse::<Self::Source>() {
            Ok(source) => Some(source),
            Err(e) => {
                debug!(kind = %types.kind, error = %e, "Ignoring unparseable object");
                None
            }
        }
    }
}

/// Maps EdgeDevices onto ManagedClusters
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeDeviceAdapter;

impl StatusAdapter for EdgeDeviceAdapter {
    type Source = EdgeDevice;
    type Target = ManagedCluster;

    fn adapt(&self, device: &EdgeDevice) -> ManagedCluster {
        managed_cluster_from_edge_device(device)
    }
}

/// Build the ManagedCluster that represents `device` on the hub
pub fn managed_cluster_from_edge_device(device: &EdgeDevice) -> ManagedCluster {
    let name = device.metadata.name.clone().unwrap_or_default();

    let mut cluster = ManagedCluster::new(
        &name,
        ManagedClusterSpec {
            hub_accepts_client: true,
            lease_duration_seconds: Some(DEFAULT_LEASE_DURATION_SECONDS),
        },
    );

    let meta = &mut cluster.metadata;
    meta.uid = device.metadata.uid.clone();
    meta.resource_version = device.metadata.resource_version.clone();
    meta.creation_timestamp = device.metadata.creation_timestamp.clone();
    meta.labels = Some(BTreeMap::from([
        (VENDOR_LABEL_KEY.to_string(), EDGE_DEVICE_VENDOR.to_string()),
        (NAME_LABEL_KEY.to_string(), name),
    ]));
    meta.annotations = Some(BTreeMap::from([(
        EDGE_DEVICE_ANNOTATION.to_string(),
        source_payload(device),
    )]));

    cluster.status = Some(ManagedClusterStatus {
        conditions: managed_cluster_conditions(device),
    });

    cluster
}

/// Synthesize the conditions a hub expects on a joined ManagedCluster
///
/// Accepted and joined transition at the device's request time; available
/// transitions at the last time the device was seen. A missing timestamp
/// falls back to the device creation time, then the Unix epoch.
pub fn managed_cluster_conditions(device: &EdgeDevice) -> Vec<Condition> {
    let fallback = device
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|t| t.0)
        .unwrap_or_default();
    let requested = timestamp_or(device.request_time(), fallback);

    let available = match device.last_seen_time() {
        Some(seen) => Condition::at(
            CONDITION_AVAILABLE,
            ConditionStatus::True,
            "ManagedClusterAvailable",
            "Edge device is sending heartbeats",
            seen.0,
        ),
        None => Condition::at(
            CONDITION_AVAILABLE,
            ConditionStatus::Unknown,
            "ManagedClusterLeaseUnknown",
            "Edge device has not reported a heartbeat yet",
            fallback,
        ),
    };

    vec![
        Condition::at(
            CONDITION_HUB_ACCEPTED,
            ConditionStatus::True,
            "HubClusterAdminAccepted",
            "Accepted by leaf hub on device registration",
            requested,
        ),
        Condition::at(
            CONDITION_JOINED,
            ConditionStatus::True,
            "ManagedClusterJoined",
            "Edge device joined the leaf hub",
            requested,
        ),
        available,
    ]
}

fn timestamp_or(time: Option<&Time>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    time.map(|t| t.0).unwrap_or(fallback)
}

/// Serialize the source object for the annotation escape hatch
///
/// Serialization failure degrades to an empty string; it never fails the
/// adaptation.
pub fn source_payload<T: Serialize + Resource>(object: &T) -> String {
    serde_json::to_string(object).unwrap_or_else(|e| {
        warn!(
            name = object.meta().name.as_deref().unwrap_or_default(),
            error = %e,
            "Failed to serialize source object for annotation"
        );
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use edgesync_common::crd::{EdgeDeviceSpec, EdgeDeviceStatus};
    use serde::ser::Error as _;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 1, hour, 0, 0).unwrap()
    }

    fn device(request: Option<DateTime<Utc>>, last_seen: Option<DateTime<Utc>>) -> EdgeDevice {
        let mut device = EdgeDevice::new(
            "device-a",
            EdgeDeviceSpec {
                request_time: request.map(Time),
                os_image_id: Some("rhel-9".to_string()),
                ..Default::default()
            },
        );
        device.metadata.namespace = Some("devices".to_string());
        device.metadata.uid = Some("uid-a".to_string());
        device.metadata.resource_version = Some("42".to_string());
        device.metadata.creation_timestamp = Some(Time(ts(8)));
        device.status = Some(EdgeDeviceStatus {
            last_seen_time: last_seen.map(Time),
            phase: Some("up".to_string()),
            ..Default::default()
        });
        device
    }

    #[test]
    fn test_identity_is_carried_over() {
        let cluster = EdgeDeviceAdapter.adapt(&device(Some(ts(9)), Some(ts(10))));

        assert_eq!(cluster.metadata.name.as_deref(), Some("device-a"));
        assert_eq!(cluster.metadata.uid.as_deref(), Some("uid-a"));
        assert_eq!(cluster.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(cluster.metadata.creation_timestamp, Some(Time(ts(8))));
        assert!(cluster.spec.hub_accepts_client);
    }

    #[test]
    fn test_vendor_and_name_labels() {
        let cluster = EdgeDeviceAdapter.adapt(&device(None, None));
        let labels = cluster.metadata.labels.unwrap();

        assert_eq!(labels.get(VENDOR_LABEL_KEY).map(String::as_str), Some("K4E"));
        assert_eq!(labels.get(NAME_LABEL_KEY).map(String::as_str), Some("device-a"));
    }

    #[test]
    fn test_annotation_holds_full_device() {
        let source = device(Some(ts(9)), Some(ts(10)));
        let cluster = EdgeDeviceAdapter.adapt(&source);

        let annotations = cluster.metadata.annotations.unwrap();
        let payload = annotations.get(EDGE_DEVICE_ANNOTATION).unwrap();
        let decoded: EdgeDevice = serde_json::from_str(payload).unwrap();

        assert_eq!(decoded.metadata.uid.as_deref(), Some("uid-a"));
        assert_eq!(decoded.spec.os_image_id.as_deref(), Some("rhel-9"));
        assert_eq!(decoded.status.unwrap().phase.as_deref(), Some("up"));
    }

    #[test]
    fn test_conditions_use_request_and_last_seen_times() {
        let cluster = EdgeDeviceAdapter.adapt(&device(Some(ts(9)), Some(ts(10))));
        let conditions = &cluster.status.as_ref().unwrap().conditions;

        let types: Vec<&str> = conditions.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(
            types,
            vec![CONDITION_HUB_ACCEPTED, CONDITION_JOINED, CONDITION_AVAILABLE]
        );

        assert_eq!(conditions[0].last_transition_time, ts(9));
        assert_eq!(conditions[1].last_transition_time, ts(9));
        assert_eq!(conditions[2].last_transition_time, ts(10));
        assert!(conditions
            .iter()
            .all(|c| c.status == ConditionStatus::True));
    }

    #[test]
    fn test_missing_timestamps_fall_back_to_creation_time() {
        let cluster = EdgeDeviceAdapter.adapt(&device(None, None));
        let conditions = &cluster.status.as_ref().unwrap().conditions;

        assert_eq!(conditions[0].last_transition_time, ts(8));
        assert_eq!(conditions[1].last_transition_time, ts(8));
        assert_eq!(conditions[2].last_transition_time, ts(8));
        assert_eq!(conditions[2].status, ConditionStatus::Unknown);
    }

    #[test]
    fn test_missing_creation_time_falls_back_to_epoch() {
        let mut source = device(None, None);
        source.metadata.creation_timestamp = None;

        let conditions = managed_cluster_conditions(&source);
        assert_eq!(conditions[0].last_transition_time, DateTime::<Utc>::default());
    }

    #[test]
    fn test_adapt_is_deterministic() {
        let source = device(Some(ts(9)), Some(ts(10)));
        assert_eq!(EdgeDeviceAdapter.adapt(&source), EdgeDeviceAdapter.adapt(&source));
    }

    /// Serializes its metadata but fails on the payload
    #[derive(Clone, Debug)]
    struct Unserializable(EdgeDevice);

    impl Resource for Unserializable {
        type DynamicType = ();
        type Scope = kube::core::NamespaceResourceScope;

        fn kind(_: &()) -> std::borrow::Cow<'_, str> {
            "Unserializable".into()
        }
        fn group(_: &()) -> std::borrow::Cow<'_, str> {
            "".into()
        }
        fn version(_: &()) -> std::borrow::Cow<'_, str> {
            "v1".into()
        }
        fn plural(_: &()) -> std::borrow::Cow<'_, str> {
            "unserializables".into()
        }
        fn meta(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
            &self.0.metadata
        }
        fn meta_mut(&mut self) -> &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
            &mut self.0.metadata
        }
    }

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not serializable"))
        }
    }

    #[test]
    fn test_serialization_failure_degrades_to_empty_string() {
        let object = Unserializable(device(None, None));
        assert_eq!(source_payload(&object), "");
    }

    mod accept {
        use super::*;
        use crate::object::to_dynamic_object;

        #[test]
        fn test_accepts_edge_device() {
            let dynamic = to_dynamic_object(&device(Some(ts(9)), None)).unwrap();
            let accepted = EdgeDeviceAdapter.accept(&dynamic).unwrap();
            assert_eq!(accepted.metadata.uid.as_deref(), Some("uid-a"));
        }

        #[test]
        fn test_rejects_other_kinds() {
            let cluster = EdgeDeviceAdapter.adapt(&device(None, None));
            let dynamic = to_dynamic_object(&cluster).unwrap();
            assert!(EdgeDeviceAdapter.accept(&dynamic).is_none());
        }

        #[test]
        fn test_rejects_objects_without_type_meta() {
            let mut dynamic = to_dynamic_object(&device(None, None)).unwrap();
            dynamic.types = None;
            assert!(EdgeDeviceAdapter.accept(&dynamic).is_none());
        }
    }
}
