//! Bundle collection entries
//!
//! An entry pairs a bundle with its delivery key and an inclusion predicate,
//! and remembers the last generation delivered for that key. The sync driver
//! walks its entries on every tick without knowing what kind each bundle
//! holds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bundle::Bundle;

/// Decides, once per sync tick, whether an entry takes part in the tick
pub type BundlePredicate = Box<dyn Fn() -> bool + Send + Sync>;

/// A bundle bound to a delivery key and an inclusion predicate
pub struct BundleCollectionEntry {
    transport_key: String,
    bundle: Arc<dyn Bundle>,
    predicate: BundlePredicate,
    last_sent_generation: AtomicU64,
}

impl BundleCollectionEntry {
    /// Create an entry
    ///
    /// The bundle's current generation counts as already delivered: it was
    /// seeded from what the transport last recorded for `transport_key`.
    pub fn new(
        transport_key: impl Into<String>,
        bundle: Arc<dyn Bundle>,
        predicate: BundlePredicate,
    ) -> Self {
        let last_sent_generation = AtomicU64::new(bundle.generation());
        Self {
            transport_key: transport_key.into(),
            bundle,
            predicate,
            last_sent_generation,
        }
    }

    /// Create an entry that takes part in every tick
    pub fn always(transport_key: impl Into<String>, bundle: Arc<dyn Bundle>) -> Self {
        Self::new(transport_key, bundle, Box::new(|| true))
    }

    /// Delivery key on the transport
    pub fn transport_key(&self) -> &str {
        &self.transport_key
    }

    /// The bundle this entry delivers
    pub fn bundle(&self) -> &dyn Bundle {
        self.bundle.as_ref()
    }

    /// Evaluate the inclusion predicate
    pub fn should_sync(&self) -> bool {
        (self.predicate)()
    }

    /// Last generation successfully delivered
    pub fn last_sent_generation(&self) -> u64 {
        self.last_sent_generation.load(Ordering::Acquire)
    }

    /// Whether `generation` is newer than anything delivered
    pub fn needs_delivery(&self, generation: u64) -> bool {
        generation > self.last_sent_generation()
    }

    /// Record a successful delivery
    ///
    /// Never moves the recorded generation backwards.
    pub fn mark_sent(&self, generation: u64) {
        self.last_sent_generation
            .fetch_max(generation, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for BundleCollectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleCollectionEntry")
            .field("transport_key", &self.transport_key)
            .field("generation", &self.bundle.generation())
            .field("last_sent_generation", &self.last_sent_generation())
            .finish()
    }
}
