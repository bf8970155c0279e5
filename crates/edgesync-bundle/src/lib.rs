//! Status bundles for edgesync
//!
//! A bundle accumulates the hub-facing representation of every watched
//! source object under one delivery key and versions the collection with a
//! monotonic generation. The sync driver ships a bundle whenever its
//! generation moves past the last one delivered.
//!
//! - [`adapter`] - Source to target object transformation
//! - [`bundle`] - Generation-tracked bundle and its wire payload
//! - [`collection`] - Delivery key + predicate wrapper the driver iterates
//! - [`generation`] - Seeding generations from the transport after restart
//! - [`object`] - Identity capabilities shared by bundle objects
//! - [`transport`] - Boundary to the hub-facing transport

#![deny(missing_docs)]

pub mod adapter;
pub mod bundle;
pub mod collection;
pub mod generation;
pub mod object;
pub mod transport;

pub use adapter::{EdgeDeviceAdapter, StatusAdapter};
pub use bundle::{Bundle, BundlePayload, BundleSnapshot, EdgeDeviceStatusBundle, StatusBundle};
pub use collection::{BundleCollectionEntry, BundlePredicate};
pub use generation::generation_from_transport;
pub use object::{to_dynamic_object, BundleObject};
pub use transport::{InMemoryTransport, Transport, TransportMessage};
