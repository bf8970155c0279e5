//! Generation-tracked status bundles
//!
//! A [`StatusBundle`] holds the adapted form of every source object it has
//! seen, keyed by UID, together with a generation that increases exactly once
//! per accepted insert, replace or delete. Objects and generation live behind
//! one mutex so a reader never sees a generation that does not match the
//! objects it reads.
//!
//! Every mutation is total: objects of the wrong kind, objects without a UID,
//! unchanged resource versions and deletes of unknown UIDs are silent no-ops.

use kube::api::DynamicObject;
use kube::Resource;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use edgesync_common::{Error, Result};

use crate::adapter::{EdgeDeviceAdapter, StatusAdapter};
use crate::object::BundleObject;

/// Operations the sync driver performs on any bundle
///
/// Object-safe so a driver can manage bundles of different kinds uniformly.
/// Objects are passed untyped; each bundle picks out the kind it adapts.
pub trait Bundle: Send + Sync {
    /// Insert or replace the object, ignoring kinds this bundle does not adapt
    fn update_object(&self, object: &DynamicObject);

    /// Remove the object with the same UID, if present
    fn delete_object(&self, object: &DynamicObject);

    /// Current generation
    fn generation(&self) -> u64;

    /// Serialize the bundle together with the generation it reflects
    fn snapshot(&self) -> Result<BundleSnapshot>;
}

/// Wire payload of a bundle
///
/// Field names are part of the hub contract and must not change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlePayload<T> {
    /// Objects in bundle order
    pub objects: Vec<T>,
    /// Name of the leaf hub that produced the bundle
    pub leaf_hub_name: String,
    /// Generation the objects correspond to
    pub generation: u64,
}

/// Serialized bundle taken under the bundle lock
#[derive(Clone, Debug, PartialEq)]
pub struct BundleSnapshot {
    /// Generation the payload corresponds to
    pub generation: u64,
    /// JSON-encoded [`BundlePayload`]
    pub payload: Vec<u8>,
}

struct BundleState<T> {
    objects: Vec<T>,
    generation: u64,
}

impl<T: BundleObject> BundleState<T> {
    // Linear scan; bundles hold at most a few thousand objects per leaf hub
    fn index_of(&self, uid: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.bundle_uid() == Some(uid))
    }
}

/// Bundle of target objects produced by adapter `A`
pub struct StatusBundle<A: StatusAdapter> {
    leaf_hub_name: String,
    adapter: A,
    state: Mutex<BundleState<A::Target>>,
}

/// Bundle mirroring EdgeDevices as ManagedClusters
pub type EdgeDeviceStatusBundle = StatusBundle<EdgeDeviceAdapter>;

impl EdgeDeviceStatusBundle {
    /// Create an empty EdgeDevice bundle starting at `generation`
    pub fn edge_devices(leaf_hub_name: impl Into<String>, generation: u64) -> Self {
        Self::new(leaf_hub_name, generation, EdgeDeviceAdapter)
    }
}

impl<A: StatusAdapter> StatusBundle<A> {
    /// Create an empty bundle
    ///
    /// `generation` is the seed, normally the last generation the transport
    /// recorded for this bundle's delivery key.
    pub fn new(leaf_hub_name: impl Into<String>, generation: u64, adapter: A) -> Self {
        Self {
            leaf_hub_name: leaf_hub_name.into(),
            adapter,
            state: Mutex::new(BundleState {
                objects: Vec::new(),
                generation,
            }),
        }
    }

    /// Insert or replace the adapted form of `source`
    ///
    /// An unknown UID is appended. A known UID with a different resource
    /// version is replaced in place. A known UID with the same resource
    /// version is left alone, so redelivered watch events do not bump the
    /// generation.
    pub fn update(&self, source: &A::Source) {
        let Some(uid) = source.bundle_uid() else {
            let kind = <A::Source as Resource>::kind(&());
            debug!(
                kind = %kind,
                name = source.bundle_name().unwrap_or_default(),
                "Ignoring object without uid"
            );
            return;
        };

        let mut state = self.state.lock();
        match state.index_of(uid) {
            None => {
                let target = self.adapter.adapt(source);
                state.objects.push(target);
                state.generation += 1;
                trace!(uid, generation = state.generation, "Added object to bundle");
            }
            Some(index) => {
                if state.objects[index].bundle_resource_version() == source.bundle_resource_version()
                {
                    return;
                }
                state.objects[index] = self.adapter.adapt(source);
                state.generation += 1;
                trace!(uid, generation = state.generation, "Replaced object in bundle");
            }
        }
    }

    /// Remove the object whose UID matches `object`
    ///
    /// Unknown UIDs are ignored; delete notifications may race ahead of the
    /// matching create or arrive twice.
    pub fn delete<O: BundleObject>(&self, object: &O) {
        let Some(uid) = object.bundle_uid() else {
            return;
        };

        let mut state = self.state.lock();
        if let Some(index) = state.index_of(uid) {
            state.objects.remove(index);
            state.generation += 1;
            trace!(uid, generation = state.generation, "Removed object from bundle");
        }
    }

    /// Consistent copy of objects and generation
    ///
    /// The lock is held only for the copy.
    pub fn payload(&self) -> BundlePayload<A::Target> {
        let (objects, generation) = {
            let state = self.state.lock();
            (state.objects.clone(), state.generation)
        };

        BundlePayload {
            objects,
            leaf_hub_name: self.leaf_hub_name.clone(),
            generation,
        }
    }
}

impl<A: StatusAdapter> Bundle for StatusBundle<A> {
    fn update_object(&self, object: &DynamicObject) {
        if let Some(source) = self.adapter.accept(object) {
            self.update(&source);
        }
    }

    fn delete_object(&self, object: &DynamicObject) {
        self.delete(object);
    }

    fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn snapshot(&self) -> Result<BundleSnapshot> {
        let payload = self.payload();
        let bytes = serde_json::to_vec(&payload).map_err(|e| {
            Error::serialization_for_kind(<A::Target as Resource>::kind(&()), e.to_string())
        })?;

        Ok(BundleSnapshot {
            generation: payload.generation,
            payload: bytes,
        })
    }
}
