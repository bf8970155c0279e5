//! Error types for edgesync
//!
//! Errors carry structured context (bundle keys, resource kinds, objects)
//! so failures in the sync driver can be traced back to what caused them.
//! The bundle core itself never returns these for its mutations; they surface
//! from serialization, transport delivery and the Kubernetes controller.

use thiserror::Error;

/// Main error type for edgesync operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Transport delivery or query error
    #[error("transport error [{key}]: {message}")]
    Transport {
        /// Delivery key of the bundle being sent
        key: String,
        /// Description of what failed
        message: String,
    },

    /// Object cannot carry the cleanup finalizer
    ///
    /// Raised for watched objects missing the namespace or name needed to
    /// patch them. Failed patches surface as [`Error::Kube`].
    #[error("finalizer error for {object}: {message}")]
    Finalizer {
        /// Name of the object whose finalizer failed
        object: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a transport error for a delivery key
    pub fn transport(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transport {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Create a finalizer error for an object
    pub fn finalizer(object: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Finalizer {
            object: object.into(),
            message: msg.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Serialization errors and objects that cannot carry the finalizer need
    /// a code or data fix and are not retried. Kubernetes 4xx responses are
    /// permanent too. Transport failures are retried on the next sync tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::Serialization { .. } => false,
            Error::Transport { .. } => true,
            Error::Finalizer { .. } => false,
        }
    }

    /// Get the delivery key if this error is associated with a bundle
    pub fn bundle_key(&self) -> Option<&str> {
        match self {
            Error::Transport { key, .. } => Some(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = Error::transport("leaf-hub-1.ManagedClusters", "connection refused");
        assert_eq!(
            err.to_string(),
            "transport error [leaf-hub-1.ManagedClusters]: connection refused"
        );
        assert_eq!(err.bundle_key(), Some("leaf-hub-1.ManagedClusters"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_serialization_error_not_retryable() {
        let err = Error::serialization_for_kind("ManagedCluster", "key must be a string");
        assert!(!err.is_retryable());
        assert!(err.bundle_key().is_none());
        match err {
            Error::Serialization { kind, .. } => assert_eq!(kind.as_deref(), Some("ManagedCluster")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_finalizer_error_display() {
        let err = Error::finalizer("device-a", "object has no namespace");
        assert_eq!(
            err.to_string(),
            "finalizer error for device-a: object has no namespace"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_kube_client_errors_not_retryable() {
        let err: Error = kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        })
        .into();
        assert!(!err.is_retryable());

        let err: Error = kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "etcd unavailable".to_string(),
            reason: "InternalError".to_string(),
            code: 500,
        })
        .into();
        assert!(err.is_retryable());
    }
}
