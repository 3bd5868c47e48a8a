//! Project role transition table.
//!
//! Every accepted `(actor relationship, requested role, current role,
//! condition)` combination is one row of [`TRANSITION_TABLE`]. Rows are
//! evaluated in order and the first match wins. Anything that matches no row
//! is rejected.

use crate::roles::{Involvement, ProjectRole};
use std::fmt;

/// One of the five accepted project role transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// An org admin applying to a project becomes project admin directly.
    PromoteOrgAdminAsProjectAdmin,
    /// A user applies to join a project.
    StorePendingDevRequest,
    /// A user accepts their own invitation.
    PromoteInvitedDev,
    /// A project admin approves a pending application.
    AcceptPendingDevRequest,
    /// A project admin invites a user.
    InviteDevToJoin,
}

impl Transition {
    /// The role the target holds after the transition.
    #[must_use]
    pub fn resulting_role(&self) -> ProjectRole {
        match self {
            Self::PromoteOrgAdminAsProjectAdmin => ProjectRole::Admin,
            Self::StorePendingDevRequest => ProjectRole::Pending,
            Self::PromoteInvitedDev | Self::AcceptPendingDevRequest => ProjectRole::Dev,
            Self::InviteDevToJoin => ProjectRole::Invited,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromoteOrgAdminAsProjectAdmin => "promote_org_admin_as_project_admin",
            Self::StorePendingDevRequest => "store_pending_dev_request",
            Self::PromoteInvitedDev => "promote_invited_dev",
            Self::AcceptPendingDevRequest => "accept_pending_dev_request",
            Self::InviteDevToJoin => "invite_dev_to_join",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra condition a row may require.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// The acting user is an admin of the project's owning organization.
    ActorIsOrgAdmin,
    ActorIsNotOrgAdmin,
    /// The acting user is an admin of the project.
    SenderIsProjectAdmin,
}

impl Condition {
    fn holds(&self, request: &TransitionRequest) -> bool {
        match self {
            Self::Always => true,
            Self::ActorIsOrgAdmin => request.actor_is_org_admin,
            Self::ActorIsNotOrgAdmin => !request.actor_is_org_admin,
            Self::SenderIsProjectAdmin => request.sender_role.is(ProjectRole::Admin),
        }
    }
}

/// A row of the transition table.
#[derive(Clone, Copy, Debug)]
pub struct TransitionRule {
    pub actor_is_target: bool,
    pub requested: ProjectRole,
    pub current: Involvement<ProjectRole>,
    pub condition: Condition,
    pub transition: Transition,
}

/// The accepted project role transitions, in evaluation order.
pub const TRANSITION_TABLE: &[TransitionRule] = &[
    TransitionRule {
        actor_is_target: true,
        requested: ProjectRole::Pending,
        current: Involvement::NotInvolved,
        condition: Condition::ActorIsOrgAdmin,
        transition: Transition::PromoteOrgAdminAsProjectAdmin,
    },
    TransitionRule {
        actor_is_target: true,
        requested: ProjectRole::Pending,
        current: Involvement::NotInvolved,
        condition: Condition::ActorIsNotOrgAdmin,
        transition: Transition::StorePendingDevRequest,
    },
    TransitionRule {
        actor_is_target: true,
        requested: ProjectRole::Dev,
        current: Involvement::Member(ProjectRole::Invited),
        condition: Condition::Always,
        transition: Transition::PromoteInvitedDev,
    },
    TransitionRule {
        actor_is_target: false,
        requested: ProjectRole::Dev,
        current: Involvement::Member(ProjectRole::Pending),
        condition: Condition::SenderIsProjectAdmin,
        transition: Transition::AcceptPendingDevRequest,
    },
    TransitionRule {
        actor_is_target: false,
        requested: ProjectRole::Invited,
        current: Involvement::NotInvolved,
        condition: Condition::SenderIsProjectAdmin,
        transition: Transition::InviteDevToJoin,
    },
];

/// Inputs to a transition decision.
#[derive(Clone, Copy, Debug)]
pub struct TransitionRequest {
    pub actor_is_target: bool,
    pub requested: ProjectRole,
    /// The target's current standing.
    pub current: Involvement<ProjectRole>,
    /// The acting user's project standing.
    pub sender_role: Involvement<ProjectRole>,
    pub actor_is_org_admin: bool,
}

/// Outcome of evaluating the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Apply this transition.
    Apply(Transition),
    /// The transition already happened; the target holds its resulting role.
    Replay(ProjectRole),
    Reject,
}

impl TransitionRule {
    fn accepts(&self, request: &TransitionRequest) -> bool {
        self.actor_is_target == request.actor_is_target
            && self.requested == request.requested
            && self.current == request.current
            && self.condition.holds(request)
    }

    fn replays(&self, request: &TransitionRequest) -> bool {
        self.actor_is_target == request.actor_is_target
            && self.requested == request.requested
            && self.condition.holds(request)
            && request.current.is(self.transition.resulting_role())
    }
}

/// Evaluate the table against a request.
///
/// A request that matches no row but whose effect is already in place (same
/// actor relationship, requested role and condition, and the target holds the
/// resulting role) is a replay and succeeds without a write.
#[must_use]
pub fn decide(request: &TransitionRequest) -> Decision {
    if let Some(rule) = TRANSITION_TABLE.iter().find(|rule| rule.accepts(request)) {
        return Decision::Apply(rule.transition);
    }

    match TRANSITION_TABLE.iter().find(|rule| rule.replays(request)) {
        Some(rule) => Decision::Replay(rule.transition.resulting_role()),
        None => Decision::Reject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        actor_is_target: bool,
        requested: ProjectRole,
        current: Involvement<ProjectRole>,
        sender_role: Involvement<ProjectRole>,
        actor_is_org_admin: bool,
    ) -> TransitionRequest {
        TransitionRequest {
            actor_is_target,
            requested,
            current,
            sender_role,
            actor_is_org_admin,
        }
    }

    #[test]
    fn test_each_row_fires() {
        use Involvement::{Member, NotInvolved};
        use ProjectRole::*;

        let cases = [
            (
                request(true, Pending, NotInvolved, NotInvolved, true),
                Transition::PromoteOrgAdminAsProjectAdmin,
            ),
            (
                request(true, Pending, NotInvolved, NotInvolved, false),
                Transition::StorePendingDevRequest,
            ),
            (
                request(true, Dev, Member(Invited), Member(Invited), false),
                Transition::PromoteInvitedDev,
            ),
            (
                request(false, Dev, Member(Pending), Member(Admin), false),
                Transition::AcceptPendingDevRequest,
            ),
            (
                request(false, Invited, NotInvolved, Member(Admin), false),
                Transition::InviteDevToJoin,
            ),
        ];

        for (req, expected) in cases {
            assert_eq!(decide(&req), Decision::Apply(expected), "{req:?}");
        }
    }

    #[test]
    fn test_resulting_roles() {
        assert_eq!(
            Transition::PromoteOrgAdminAsProjectAdmin.resulting_role(),
            ProjectRole::Admin
        );
        assert_eq!(
            Transition::StorePendingDevRequest.resulting_role(),
            ProjectRole::Pending
        );
        assert_eq!(Transition::PromoteInvitedDev.resulting_role(), ProjectRole::Dev);
        assert_eq!(
            Transition::AcceptPendingDevRequest.resulting_role(),
            ProjectRole::Dev
        );
        assert_eq!(Transition::InviteDevToJoin.resulting_role(), ProjectRole::Invited);
    }

    #[test]
    fn test_no_self_promotion_from_pending() {
        use Involvement::Member;
        use ProjectRole::*;

        let req = request(true, Dev, Member(Pending), Member(Pending), false);
        assert_eq!(decide(&req), Decision::Reject);
    }

    #[test]
    fn test_approval_requires_project_admin() {
        use Involvement::Member;
        use ProjectRole::*;

        for sender in [Involvement::NotInvolved, Member(Pending), Member(Invited), Member(Dev)] {
            let req = request(false, Dev, Member(Pending), sender, true);
            assert_eq!(decide(&req), Decision::Reject, "sender = {sender:?}");
        }
    }

    #[test]
    fn test_admin_cannot_grant_admin_or_pending() {
        use Involvement::{Member, NotInvolved};
        use ProjectRole::*;

        for requested in [Admin, Pending] {
            let req = request(false, requested, NotInvolved, Member(Admin), true);
            assert_eq!(decide(&req), Decision::Reject, "requested = {requested:?}");
        }
    }

    #[test]
    fn test_self_request_for_admin_rejected() {
        let req = request(
            true,
            ProjectRole::Admin,
            Involvement::NotInvolved,
            Involvement::NotInvolved,
            true,
        );
        assert_eq!(decide(&req), Decision::Reject);
    }

    #[test]
    fn test_replays() {
        use Involvement::Member;
        use ProjectRole::*;

        // Applying twice.
        let req = request(true, Pending, Member(Pending), Member(Pending), false);
        assert_eq!(decide(&req), Decision::Replay(Pending));

        // Org admin applying twice.
        let req = request(true, Pending, Member(Admin), Member(Admin), true);
        assert_eq!(decide(&req), Decision::Replay(Admin));

        // Approving an already approved applicant.
        let req = request(false, Dev, Member(Dev), Member(Admin), false);
        assert_eq!(decide(&req), Decision::Replay(Dev));

        // Inviting twice.
        let req = request(false, Invited, Member(Invited), Member(Admin), false);
        assert_eq!(decide(&req), Decision::Replay(Invited));
    }

    #[test]
    fn test_replay_still_checks_condition() {
        use Involvement::Member;
        use ProjectRole::*;

        // A non-admin "approving" someone who is already dev is still rejected.
        let req = request(false, Dev, Member(Dev), Member(Dev), false);
        assert_eq!(decide(&req), Decision::Reject);

        // A non org admin who is project admin cannot replay the fast track.
        let req = request(true, Pending, Member(Admin), Member(Admin), false);
        assert_eq!(decide(&req), Decision::Reject);
    }
}
