//! Boundary to the hub-facing transport
//!
//! The transport owns delivery, retries and durability. Bundles only need
//! two things from it: the version it last recorded for a delivery key, and
//! a way for the sync driver to hand it a serialized bundle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[cfg(test)]
use mockall::automock;

use edgesync_common::{Error, Result, STATUS_BUNDLE_MSG_TYPE};

use crate::bundle::BundleSnapshot;

/// Message handed to the transport
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportMessage {
    /// Delivery key
    pub id: String,
    /// Message type (e.g. "StatusBundle")
    pub msg_type: String,
    /// Bundle generation as a decimal string
    pub version: String,
    /// Serialized bundle payload
    pub payload: Vec<u8>,
}

impl TransportMessage {
    /// Build a status bundle message from a snapshot
    pub fn status_bundle(key: impl Into<String>, snapshot: BundleSnapshot) -> Self {
        Self {
            id: key.into(),
            msg_type: STATUS_BUNDLE_MSG_TYPE.to_string(),
            version: snapshot.generation.to_string(),
            payload: snapshot.payload,
        }
    }
}

/// Channel to the hub
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Last version recorded for a delivery key and message type
    ///
    /// Queried once per key at start-up to seed bundle generations.
    fn last_known_version(&self, key: &str, msg_type: &str) -> Option<String>;

    /// Deliver a message
    async fn send(&self, message: TransportMessage) -> Result<()>;
}

/// Transport that keeps the latest delivered message per key in memory
///
/// Records the version of every delivered message per key so a later
/// [`Transport::last_known_version`] reflects it, and logs each delivery.
/// Only the newest message for each key is retained. Used when no hub
/// connection is configured and in tests.
#[derive(Default)]
pub struct InMemoryTransport {
    versions: Mutex<HashMap<(String, String), String>>,
    latest: Mutex<HashMap<String, TransportMessage>>,
    deliveries: AtomicU64,
    failing: Mutex<Option<String>>,
}

impl InMemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-record a version, as a durable transport would after a restart
    pub fn with_version(
        self,
        key: impl Into<String>,
        msg_type: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.versions
            .lock()
            .insert((key.into(), msg_type.into()), version.into());
        self
    }

    /// Make every send fail with `reason` until cleared with None
    pub fn set_failure(&self, reason: Option<String>) {
        *self.failing.lock() = reason;
    }

    /// Most recent message delivered for `key`
    pub fn latest(&self, key: &str) -> Option<TransportMessage> {
        self.latest.lock().get(key).cloned()
    }

    /// Number of successful deliveries since creation
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn last_known_version(&self, key: &str, msg_type: &str) -> Option<String> {
        self.versions
            .lock()
            .get(&(key.to_string(), msg_type.to_string()))
            .cloned()
    }

    async fn send(&self, message: TransportMessage) -> Result<()> {
        if let Some(reason) = self.failing.lock().clone() {
            return Err(Error::transport(&message.id, reason));
        }

        info!(
            key = %message.id,
            msg_type = %message.msg_type,
            version = %message.version,
            bytes = message.payload.len(),
            "Delivered bundle"
        );

        self.versions.lock().insert(
            (message.id.clone(), message.msg_type.clone()),
            message.version.clone(),
        );
        self.latest.lock().insert(message.id.clone(), message);
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
