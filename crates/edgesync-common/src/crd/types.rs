//! Shared status types

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., ManagedClusterJoined)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,
}

impl Condition {
    /// Create a condition that transitioned at the given time
    ///
    /// Synthesized conditions carry timestamps taken from the source object,
    /// never the current wall clock, so re-adapting an unchanged object
    /// produces an identical condition.
    pub fn at(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        last_transition_time: DateTime<Utc>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_condition_status_display() {
        assert_eq!(ConditionStatus::True.to_string(), "True");
        assert_eq!(ConditionStatus::False.to_string(), "False");
        assert_eq!(ConditionStatus::Unknown.to_string(), "Unknown");
        assert_eq!(ConditionStatus::default(), ConditionStatus::Unknown);
    }

    #[test]
    fn test_condition_wire_field_names() {
        let ts = Utc.with_ymd_and_hms(2022, 3, 1, 12, 0, 0).unwrap();
        let condition = Condition::at(
            "ManagedClusterJoined",
            ConditionStatus::True,
            "ManagedClusterJoined",
            "joined",
            ts,
        );

        let value = serde_json::to_value(&condition).unwrap();
        assert_eq!(value["type"], "ManagedClusterJoined");
        assert_eq!(value["status"], "True");
        assert_eq!(value["reason"], "ManagedClusterJoined");
        assert_eq!(value["message"], "joined");
        assert_eq!(value["lastTransitionTime"], "2022-03-01T12:00:00Z");
    }
}
