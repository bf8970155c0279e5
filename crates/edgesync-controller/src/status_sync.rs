//! Generic status sync controller
//!
//! One controller watches one object kind and feeds every bundle in its
//! collection. Bundles pick out the kinds they adapt, so a collection can
//! mix bundles freely.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use edgesync_bundle::{to_dynamic_object, BundleCollectionEntry, Transport, TransportMessage};
use edgesync_common::Error;

use crate::finalizer::{has_finalizer, FinalizerClient, KubeFinalizerClient};

/// Requeue delay after a failed reconcile
const ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Feeds watched objects of kind `K` into a bundle collection and delivers
/// changed bundles through a transport
pub struct StatusSyncController<K> {
    name: String,
    finalizer: String,
    transport: Arc<dyn Transport>,
    entries: Vec<BundleCollectionEntry>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> StatusSyncController<K> {
    /// Create a controller
    ///
    /// `name` tags log lines; `finalizer` is placed on watched objects.
    pub fn new(
        name: impl Into<String>,
        finalizer: impl Into<String>,
        transport: Arc<dyn Transport>,
        entries: Vec<BundleCollectionEntry>,
    ) -> Self {
        Self {
            name: name.into(),
            finalizer: finalizer.into(),
            transport,
            entries,
            _kind: PhantomData,
        }
    }

    /// Name used in log lines
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finalizer placed on watched objects
    pub fn finalizer(&self) -> &str {
        &self.finalizer
    }

    /// Bundle collection
    pub fn entries(&self) -> &[BundleCollectionEntry] {
        &self.entries
    }

    /// Deliver every eligible bundle whose generation advanced
    ///
    /// Returns the number of bundles delivered. A failed send leaves the
    /// entry's delivered generation untouched so the next tick retries.
    pub async fn sync_once(&self) -> usize {
        let mut delivered = 0;

        for entry in &self.entries {
            if !entry.should_sync() {
                continue;
            }

            let bundle = entry.bundle();
            if !entry.needs_delivery(bundle.generation()) {
                continue;
            }

            // Serialized under the bundle lock; sent without it
            let snapshot = match bundle.snapshot() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(controller = %self.name, key = %entry.transport_key(), error = %e, "Failed to serialize bundle");
                    continue;
                }
            };
            let generation = snapshot.generation;

            let message = TransportMessage::status_bundle(entry.transport_key(), snapshot);
            match self.transport.send(message).await {
                Ok(()) => {
                    entry.mark_sent(generation);
                    delivered += 1;
                    debug!(controller = %self.name, key = %entry.transport_key(), generation, "Bundle delivered");
                }
                Err(e) => {
                    warn!(controller = %self.name, key = %entry.transport_key(), generation, error = %e, "Bundle delivery failed, retrying next tick");
                }
            }
        }

        delivered
    }

    /// Run [`Self::sync_once`] every `interval` until `cancel` fires
    pub async fn run_periodic_sync(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(controller = %self.name, interval = ?interval, "Starting periodic bundle sync");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sync_once().await;
                }
            }
        }

        info!(controller = %self.name, "Periodic bundle sync stopped");
    }
}

impl<K> StatusSyncController<K>
where
    K: Resource + Serialize,
{
    /// Offer a created or updated object to every bundle
    pub fn on_create_or_update(&self, object: &K) {
        match to_dynamic_object(object) {
            Ok(dynamic) => {
                for entry in &self.entries {
                    entry.bundle().update_object(&dynamic);
                }
            }
            Err(e) => warn!(
                controller = %self.name,
                object = object.meta().name.as_deref().unwrap_or_default(),
                error = %e,
                "Failed to convert object for bundles"
            ),
        }
    }

    /// Remove a deleted object from every bundle
    pub fn on_delete(&self, object: &K) {
        match to_dynamic_object(object) {
            Ok(dynamic) => {
                for entry in &self.entries {
                    entry.bundle().delete_object(&dynamic);
                }
            }
            Err(e) => warn!(
                controller = %self.name,
                object = object.meta().name.as_deref().unwrap_or_default(),
                error = %e,
                "Failed to convert object for bundles"
            ),
        }
    }
}

/// Controller context
pub struct Context<K> {
    /// Finalizer patches (trait object for testability)
    pub finalizers: Arc<dyn FinalizerClient>,
    /// The sync controller fed by reconciles
    pub sync: Arc<StatusSyncController<K>>,
}

/// Reconcile one watched object
///
/// Live objects get the cleanup finalizer first and are then offered to the
/// bundles. Objects being deleted are removed from the bundles before the
/// finalizer is released. Watched kinds are namespaced; the finalizer is
/// patched through the object's own namespace.
pub async fn reconcile<K>(object: Arc<K>, ctx: Arc<Context<K>>) -> Result<Action, Error>
where
    K: Resource + Serialize,
{
    let name = object.name_any();
    let finalizer = ctx.sync.finalizer();
    let namespace = object
        .namespace()
        .ok_or_else(|| Error::finalizer(&name, "object has no namespace"))?;

    if object.meta().deletion_timestamp.is_some() {
        if has_finalizer(object.as_ref(), finalizer) {
            debug!(controller = %ctx.sync.name(), object = %name, "Object deleted");
            ctx.sync.on_delete(&object);
            ctx.finalizers
                .remove_finalizer(&namespace, &name, finalizer)
                .await?;
        }
        return Ok(Action::await_change());
    }

    if !has_finalizer(object.as_ref(), finalizer) {
        ctx.finalizers
            .add_finalizer(&namespace, &name, finalizer)
            .await?;
    }

    debug!(controller = %ctx.sync.name(), object = %name, "Object created or updated");
    ctx.sync.on_create_or_update(&object);
    Ok(Action::await_change())
}

/// Error policy for status sync controllers
///
/// Retryable errors requeue after a short delay; permanent ones wait for the
/// object to change.
pub fn error_policy<K>(object: Arc<K>, error: &Error, ctx: Arc<Context<K>>) -> Action
where
    K: Resource,
{
    error!(
        ?error,
        controller = %ctx.sync.name(),
        object = object.meta().name.as_deref().unwrap_or_default(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    if error.is_retryable() {
        Action::requeue(ERROR_REQUEUE)
    } else {
        Action::await_change()
    }
}

/// Run the controller and its periodic sync until a shutdown signal
pub async fn run<K>(
    client: Client,
    api: Api<K>,
    sync: Arc<StatusSyncController<K>>,
    sync_interval: Duration,
) where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    let cancel = CancellationToken::new();
    let ticker = {
        let sync = sync.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { sync.run_periodic_sync(sync_interval, cancel).await })
    };

    let ctx = Arc::new(Context {
        finalizers: Arc::new(KubeFinalizerClient::<K>::new(client)),
        sync: sync.clone(),
    });

    info!(controller = %sync.name(), "Starting status sync controller");

    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile::<K>, error_policy::<K>, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(object = %object.name, "reconciled"),
                Err(e) => warn!(error = %e, "reconcile dispatch failed"),
            }
        })
        .await;

    cancel.cancel();
    if let Err(e) = ticker.await {
        warn!(error = %e, "Periodic sync task ended abnormally");
    }

    info!(controller = %sync.name(), "Status sync controller stopped");
}
