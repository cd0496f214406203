//! User event kinds and their routing keys.

use std::fmt;

/// The three user lifecycle event kinds consumed from the identity authority.
///
/// Each kind is bound 1:1 to a fixed routing key of the form
/// `identity.user.<kind>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    /// All kinds, in subscription registration order.
    pub const ALL: [EventKind; 3] = [EventKind::Created, EventKind::Updated, EventKind::Deleted];

    /// The fixed routing key for this kind.
    #[must_use]
    pub fn routing_key(self) -> &'static str {
        match self {
            EventKind::Created => "identity.user.created",
            EventKind::Updated => "identity.user.updated",
            EventKind::Deleted => "identity.user.deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => f.write_str("created"),
            EventKind::Updated => f.write_str("updated"),
            EventKind::Deleted => f.write_str("deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_keys_are_fixed() {
        assert_eq!(EventKind::Created.routing_key(), "identity.user.created");
        assert_eq!(EventKind::Updated.routing_key(), "identity.user.updated");
        assert_eq!(EventKind::Deleted.routing_key(), "identity.user.deleted");
    }

    #[test]
    fn test_routing_keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            EventKind::ALL.iter().map(|k| k.routing_key()).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_display_matches_key_suffix() {
        for kind in EventKind::ALL {
            assert!(kind.routing_key().ends_with(&kind.to_string()));
        }
    }
}
