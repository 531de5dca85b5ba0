//! Status and event types shared by the membership table and its callers.

use crate::common::{Incarnation, Node};
use serde::{Deserialize, Serialize};

/// A member's status, each variant carrying the incarnation it was
/// announced at (spec §3). A [`Status`] claimed about a node is exactly
/// the same shape as a [`Status`] stored for it — the wire encodes claims,
/// the table stores the accepted ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Alive(Incarnation),
    Suspect(Incarnation),
    Dead(Incarnation),
}

impl Status {
    pub fn incarnation(&self) -> Incarnation {
        match self {
            Status::Alive(i) | Status::Suspect(i) | Status::Dead(i) => *i,
        }
    }

    pub fn is_suspect(&self) -> bool {
        matches!(self, Status::Suspect(_))
    }
}

/// One accepted membership transition, published to the dissemination sink
/// (spec §4.1 "Event emission").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub node: Node,
    pub status: Status,
}

/// Pure reconciliation function (spec §4.1). Returns the new status to
/// install, or `None` if `claim` is stale/rejected and nothing should
/// change. Side effects (event emission, timer arming) live outside this
/// function in the actor, per the re-architecture guidance in spec §9.
pub fn reconcile(current: Option<Status>, claim: Status) -> Option<Status> {
    use Status::*;
    match (current, claim) {
        (None, Alive(_)) => Some(claim),
        (None, Suspect(_)) => Some(claim),
        (None, Dead(_)) => None,

        (Some(Alive(j)), Alive(i)) if i > j => Some(claim),
        (Some(Alive(j)), Suspect(i)) if i >= j => Some(claim),
        (Some(Alive(j)), Dead(i)) if i >= j => Some(claim),

        (Some(Suspect(j)), Alive(i)) if i > j => Some(claim),
        (Some(Suspect(j)), Suspect(i)) if i > j => Some(claim),
        (Some(Suspect(j)), Dead(i)) if i >= j => Some(claim),

        (Some(Dead(j)), Dead(i)) if i > j => Some(claim),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_accepts_alive_and_suspect_but_not_dead() {
        assert_eq!(reconcile(None, Status::Alive(0)), Some(Status::Alive(0)));
        assert_eq!(reconcile(None, Status::Suspect(0)), Some(Status::Suspect(0)));
        assert_eq!(reconcile(None, Status::Dead(0)), None);
    }

    #[test]
    fn alive_is_stale_against_equal_or_lower_alive() {
        assert_eq!(reconcile(Some(Status::Alive(3)), Status::Alive(3)), None);
        assert_eq!(reconcile(Some(Status::Alive(3)), Status::Alive(2)), None);
        assert_eq!(
            reconcile(Some(Status::Alive(3)), Status::Alive(4)),
            Some(Status::Alive(4))
        );
    }

    #[test]
    fn suspect_at_equal_incarnation_overrides_alive() {
        assert_eq!(
            reconcile(Some(Status::Alive(3)), Status::Suspect(3)),
            Some(Status::Suspect(3))
        );
    }

    #[test]
    fn suspect_requires_strictly_greater_incarnation_to_replace_suspect() {
        assert_eq!(reconcile(Some(Status::Suspect(3)), Status::Suspect(3)), None);
        assert_eq!(
            reconcile(Some(Status::Suspect(3)), Status::Suspect(4)),
            Some(Status::Suspect(4))
        );
    }

    #[test]
    fn dead_overrides_suspect_at_equal_incarnation() {
        assert_eq!(
            reconcile(Some(Status::Suspect(7)), Status::Dead(7)),
            Some(Status::Dead(7))
        );
    }

    #[test]
    fn stale_dead_against_newer_alive_is_dropped() {
        // Scenario 5 from spec §8: Alive(4) installed, then a late Dead(3) fires.
        assert_eq!(reconcile(Some(Status::Alive(4)), Status::Dead(3)), None);
    }

    #[test]
    fn dead_is_terminal_against_lower_or_equal_dead() {
        assert_eq!(reconcile(Some(Status::Dead(5)), Status::Dead(5)), None);
        assert_eq!(reconcile(Some(Status::Dead(5)), Status::Dead(4)), None);
        assert_eq!(
            reconcile(Some(Status::Dead(5)), Status::Dead(6)),
            Some(Status::Dead(6))
        );
    }
}
