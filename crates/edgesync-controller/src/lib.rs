//! Status sync controller for edgesync
//!
//! Drives bundles from Kubernetes events and ships them to the hub:
//!
//! - **Reconcile**: every create/update of a watched object is offered to
//!   each bundle; deletions are observed through a cleanup finalizer so no
//!   delete is missed while the controller is down.
//! - **Periodic sync**: on every tick, bundles whose generation moved past
//!   the last delivered one are serialized and handed to the transport.

#![deny(missing_docs)]

pub mod edge_devices;
pub mod finalizer;
pub mod status_sync;

pub use edge_devices::{edge_device_status_sync, run_edge_device_status_sync};
pub use finalizer::{FinalizerClient, KubeFinalizerClient};
pub use status_sync::{error_policy, reconcile, run, Context, StatusSyncController};
