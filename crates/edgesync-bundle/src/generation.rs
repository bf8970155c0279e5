//! Seeding bundle generations from the transport
//!
//! After a restart bundles are rebuilt from the watched objects, so their
//! generation must continue from what the hub already acknowledged rather
//! than restart at zero.

use tracing::{debug, warn};

use crate::transport::Transport;

/// Last generation the transport recorded for `key`, or 0
///
/// The transport reports versions as strings; a missing, empty or
/// non-numeric version seeds 0.
pub fn generation_from_transport(transport: &dyn Transport, key: &str, msg_type: &str) -> u64 {
    let Some(version) = transport.last_known_version(key, msg_type) else {
        debug!(key, msg_type, "No generation recorded by transport");
        return 0;
    };

    if version.is_empty() {
        return 0;
    }

    match version.parse::<u64>() {
        Ok(generation) => {
            debug!(key, msg_type, generation, "Seeded generation from transport");
            generation
        }
        Err(e) => {
            warn!(key, msg_type, version = %version, error = %e, "Ignoring unparseable transport version");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use mockall::predicate::eq;

    fn transport_reporting(version: Option<&'static str>) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_last_known_version()
            .with(eq("leaf-hub-1.ManagedClusters"), eq("StatusBundle"))
            .times(1)
            .returning(move |_, _| version.map(str::to_string));
        transport
    }

    #[test]
    fn test_numeric_version_seeds_generation() {
        let transport = transport_reporting(Some("5"));
        assert_eq!(
            generation_from_transport(&transport, "leaf-hub-1.ManagedClusters", "StatusBundle"),
            5
        );
    }

    #[test]
    fn test_missing_version_seeds_zero() {
        let transport = transport_reporting(None);
        assert_eq!(
            generation_from_transport(&transport, "leaf-hub-1.ManagedClusters", "StatusBundle"),
            0
        );
    }

    #[test]
    fn test_empty_version_seeds_zero() {
        let transport = transport_reporting(Some(""));
        assert_eq!(
            generation_from_transport(&transport, "leaf-hub-1.ManagedClusters", "StatusBundle"),
            0
        );
    }

    #[test]
    fn test_garbage_and_negative_versions_seed_zero() {
        for version in ["abc", "-3", "1.5"] {
            let transport = transport_reporting(Some(version));
            assert_eq!(
                generation_from_transport(
                    &transport,
                    "leaf-hub-1.ManagedClusters",
                    "StatusBundle"
                ),
                0,
                "version {version:?}"
            );
        }
    }
}
