//! Identity capabilities of objects held in a bundle

use kube::api::DynamicObject;
use kube::Resource;
use serde::Serialize;

/// An object that can live in a bundle
///
/// Bundles key objects by UID and detect changes through the resource
/// version; both come from the object's Kubernetes metadata.
pub trait BundleObject: Resource + Serialize + Clone + Send + Sync + 'static {
    /// Stable identity, invariant for the object's lifetime
    fn bundle_uid(&self) -> Option<&str> {
        self.meta().uid.as_deref()
    }

    /// Opaque change token assigned by the source system
    fn bundle_resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    /// Object name
    fn bundle_name(&self) -> Option<&str> {
        self.meta().name.as_deref()
    }
}

impl<T> BundleObject for T where T: Resource + Serialize + Clone + Send + Sync + 'static {}

/// Convert a typed resource into kube's untyped representation
///
/// Typed custom resources serialize their `apiVersion` and `kind`, so the
/// result carries type information bundles use to accept or ignore it.
pub fn to_dynamic_object<K: Serialize>(object: &K) -> Result<DynamicObject, serde_json::Error> {
    serde_json::to_value(object).and_then(serde_json::from_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesync_common::crd::{EdgeDevice, EdgeDeviceSpec};

    #[test]
    fn test_identity_from_metadata() {
        let mut device = EdgeDevice::new("device-a", EdgeDeviceSpec::default());
        assert!(device.bundle_uid().is_none());

        device.metadata.uid = Some("uid-a".to_string());
        device.metadata.resource_version = Some("7".to_string());

        assert_eq!(device.bundle_uid(), Some("uid-a"));
        assert_eq!(device.bundle_resource_version(), Some("7"));
        assert_eq!(device.bundle_name(), Some("device-a"));
    }

    #[test]
    fn test_to_dynamic_object_keeps_type_meta() {
        let mut device = EdgeDevice::new("device-a", EdgeDeviceSpec::default());
        device.metadata.uid = Some("uid-a".to_string());

        let dynamic = to_dynamic_object(&device).unwrap();
        let types = dynamic.types.as_ref().unwrap();
        assert_eq!(types.kind, "EdgeDevice");
        assert_eq!(types.api_version, "management.k4e.io/v1alpha1");
        assert_eq!(dynamic.bundle_uid(), Some("uid-a"));
    }
}
