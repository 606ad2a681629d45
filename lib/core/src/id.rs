//! Strongly-typed ID types for domain entities.
//!
//! Most IDs use ULID (Universally Unique Lexicographically Sortable Identifier)
//! format, providing both uniqueness and temporal ordering. The one exception is
//! [`JobId`], which mirrors the `serial` primary key of the persisted `job_queue`
//! table and is therefore a plain `i64`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Creates an ID from a ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the prefix used for display formatting.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }

            /// The all-zero sentinel id, used for deterministic system
            /// principals (e.g. the cron trigger's attributed user) rather
            /// than entities that need a genuinely unique identity.
            #[must_use]
            pub fn nil() -> Self {
                Self(Ulid::from(0u128))
            }

            /// Whether this id is the [`nil`](Self::nil) sentinel.
            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0 == Ulid::from(0u128)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let prefix_with_underscore = concat!($prefix, "_");
                let ulid_str = if let Some(stripped) = s.strip_prefix(prefix_with_underscore) {
                    stripped
                } else {
                    s
                };

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }

        impl From<$name> for Ulid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user or service principal initiating a trigger.
    UserId,
    "usr"
);

define_id!(
    /// Unique identifier for a persisted flow record.
    FlowId,
    "flow"
);

define_id!(
    /// Unique identifier for one execution (run) of a flow. Carried in the
    /// queue payload, the execution record, and every log stream record.
    ExecId,
    "exec"
);

define_id!(
    /// Unique identifier for an approval request.
    ApprovalId,
    "apr"
);

define_id!(
    /// Unique identifier for a namespace (the unit of multi-tenant ownership).
    NamespaceId,
    "ns"
);

/// Unique identifier for a durable queue row.
///
/// Mirrors the `serial` primary key of the persisted `job_queue` table, so it
/// is a plain integer rather than a ULID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job_{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Every `define_id!`-generated type display-formats as `<prefix()>_<ulid>`
    /// and round-trips through that same format, checked across the whole
    /// family rather than one type at a time.
    #[test]
    fn every_id_type_displays_with_its_prefix_and_round_trips() {
        let exec = ExecId::new();
        assert_eq!(exec.to_string(), format!("{}_{}", ExecId::prefix(), exec.as_ulid()));
        assert_eq!(exec.to_string().parse::<ExecId>().unwrap(), exec);

        let flow = FlowId::new();
        assert_eq!(flow.to_string(), format!("{}_{}", FlowId::prefix(), flow.as_ulid()));
        assert_eq!(flow.to_string().parse::<FlowId>().unwrap(), flow);

        let ns = NamespaceId::new();
        assert_eq!(ns.to_string(), format!("{}_{}", NamespaceId::prefix(), ns.as_ulid()));
        assert_eq!(ns.to_string().parse::<NamespaceId>().unwrap(), ns);
    }

    #[test]
    fn parse_accepts_a_bare_ulid_with_no_prefix() {
        let ulid = Ulid::new();
        let id: FlowId = ulid.to_string().parse().expect("should parse");
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn parse_reports_the_offending_type_name_on_failure() {
        let result: Result<ApprovalId, _> = "not_a_ulid".parse();
        let err = result.unwrap_err();
        assert_eq!(err.id_type, "ApprovalId");
        assert!(err.to_string().contains("ApprovalId"));
    }

    #[test]
    fn ids_of_the_same_type_hash_and_compare_by_value() {
        let id1 = ExecId::new();
        let id2 = ExecId::new();

        let mut set = HashSet::new();
        set.insert(id1);
        set.insert(id2);
        set.insert(id1);

        assert_eq!(set.len(), 2);
        assert_eq!(id1, ExecId::from_ulid(id1.as_ulid()));
    }

    #[test]
    fn id_serde_roundtrip() {
        let id = ApprovalId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        let parsed: ApprovalId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, parsed);
    }

    #[test]
    fn nil_sentinel_is_stable_and_flagged_by_is_nil() {
        assert_eq!(UserId::nil(), UserId::nil());
        assert!(UserId::nil().is_nil());
        assert!(!UserId::new().is_nil());
    }

    #[test]
    fn job_id_is_a_plain_integer_not_a_ulid() {
        let id = JobId(42);
        assert_eq!(id.to_string(), "job_42");
        assert_eq!(i64::from(id), 42);
        assert_eq!(JobId::from(7i64), JobId(7));
    }
}
