//! Cleanup finalizer management
//!
//! Watched objects carry a finalizer so their deletion is observed even when
//! the controller was down at the time. The patch calls sit behind
//! [`FinalizerClient`] so reconcile can run against a mock.

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use edgesync_common::Result;

/// Field manager used for finalizer patches
const FIELD_MANAGER: &str = "edgesync-controller";

/// Kubernetes operations needed to manage the cleanup finalizer
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FinalizerClient: Send + Sync {
    /// Add `finalizer` to the named object unless it is already present
    async fn add_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<()>;

    /// Remove `finalizer` from the named object
    async fn remove_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<()>;
}

/// [`FinalizerClient`] patching objects of kind `K` through the API server
pub struct KubeFinalizerClient<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeFinalizerClient<K> {
    /// Create a client for kind `K`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K> FinalizerClient for KubeFinalizerClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn add_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<()> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);

        let object = api.get(name).await?;
        let mut finalizers = object.meta().finalizers.clone().unwrap_or_default();
        if finalizers.iter().any(|f| f == finalizer) {
            return Ok(());
        }
        finalizers.push(finalizer.to_string());

        patch_finalizers(&api, name, finalizers).await?;
        debug!(namespace, name, finalizer, "Added finalizer");
        Ok(())
    }

    async fn remove_finalizer(&self, namespace: &str, name: &str, finalizer: &str) -> Result<()> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);

        let object = api.get(name).await?;
        let finalizers: Vec<String> = object
            .meta()
            .finalizers
            .as_ref()
            .map(|f| f.iter().filter(|s| *s != finalizer).cloned().collect())
            .unwrap_or_default();

        patch_finalizers(&api, name, finalizers).await?;
        debug!(namespace, name, finalizer, "Removed finalizer");
        Ok(())
    }
}

async fn patch_finalizers<K>(api: &Api<K>, name: &str, finalizers: Vec<String>) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let patch = serde_json::json!({
        "metadata": {
            "finalizers": finalizers
        }
    });

    api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Whether `object` already carries `finalizer`
pub fn has_finalizer<K: Resource>(object: &K, finalizer: &str) -> bool {
    object
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|s| s == finalizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgesync_common::crd::{EdgeDevice, EdgeDeviceSpec};

    #[test]
    fn test_has_finalizer() {
        let mut device = EdgeDevice::new("device-a", EdgeDeviceSpec::default());
        assert!(!has_finalizer(&device, "test/finalizer"));

        device.metadata.finalizers = Some(vec!["other/finalizer".to_string()]);
        assert!(!has_finalizer(&device, "test/finalizer"));

        device
            .metadata
            .finalizers
            .as_mut()
            .unwrap()
            .push("test/finalizer".to_string());
        assert!(has_finalizer(&device, "test/finalizer"));
    }
}
