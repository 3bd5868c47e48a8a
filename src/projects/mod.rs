//! Project membership.
//!
//! Project roles move through a small state machine:
//!
//! ```text
//! NotInvolved --apply--> Pending --approve (project admin)--> Dev
//! NotInvolved --invite (project admin)--> Invited --accept--> Dev
//! NotInvolved --apply (org admin)--> Admin
//! ```
//!
//! The accepted moves are listed in [`TRANSITION_TABLE`]. Each one is
//! persisted through a [`TransitionHooks`] method so side effects can be
//! attached to a single transition.

mod hooks;
mod service;
mod transitions;

pub use hooks::{DefaultTransitionHooks, TransitionHooks};
pub use service::ProjectMembershipService;
pub use transitions::{
    Condition, Decision, TRANSITION_TABLE, Transition, TransitionRequest, TransitionRule, decide,
};
