//! Role vocabulary for organization and project membership.
//!
//! Both vocabularies are closed. A stored role string that does not parse is
//! an integrity failure, never a user error. The absence of a membership row
//! is modelled by [`Involvement::NotInvolved`], which is never persisted.

use crate::error::{AccessError, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// User identifier, as resolved by the session layer.
pub type UserId = i64;
/// Organization identifier.
pub type OrgId = i64;
/// Project identifier.
pub type ProjectId = i64;
/// Chatroom identifier.
pub type ChatroomId = i64;
/// Chat message identifier.
pub type MessageId = i64;

/// A role that can be persisted in a membership row.
pub trait StoredRole:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr<Err = ParseRoleError> + Send + Sync + 'static
{
    /// Vocabulary name used in error messages and logs.
    const KIND: &'static str;

    /// The persisted representation.
    fn as_str(&self) -> &'static str;

    /// Every member of the vocabulary.
    fn all() -> &'static [Self];
}

/// Error returned when a stored role string is outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    kind: &'static str,
    invalid_value: String,
    expected: &'static str,
}

impl ParseRoleError {
    /// The raw value that failed to parse.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} role: '{}' (expected: {})",
            self.kind, self.invalid_value, self.expected
        )
    }
}

impl std::error::Error for ParseRoleError {}

/// Parse a persisted role, failing with [`AccessError::Integrity`].
pub fn parse_role<R: StoredRole>(raw: &str) -> Result<R> {
    raw.parse::<R>().map_err(AccessError::from)
}

/// Role within an organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// Invited by an admin, not yet accepted.
    Invited,
    /// Full administrator.
    Admin,
}

impl StoredRole for OrgRole {
    const KIND: &'static str = "organization";

    fn as_str(&self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::Admin => "admin",
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Invited, Self::Admin]
    }
}

impl FromStr for OrgRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "invited" => Ok(Self::Invited),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError {
                kind: Self::KIND,
                invalid_value: s.to_string(),
                expected: "invited or admin",
            }),
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role within a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Applied to join, waiting for approval.
    Pending,
    /// Invited by a project admin, not yet accepted.
    Invited,
    /// Full participant.
    Dev,
    /// Project administrator.
    Admin,
}

impl ProjectRole {
    /// Whether the role grants access to project-scoped discussion.
    ///
    /// `Pending` and `Invited` users are not participants yet.
    #[must_use]
    pub fn is_participant(&self) -> bool {
        matches!(self, Self::Dev | Self::Admin)
    }
}

impl StoredRole for ProjectRole {
    const KIND: &'static str = "project";

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Invited => "invited",
            Self::Dev => "dev",
            Self::Admin => "admin",
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Pending, Self::Invited, Self::Dev, Self::Admin]
    }
}

impl FromStr for ProjectRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "invited" => Ok(Self::Invited),
            "dev" => Ok(Self::Dev),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError {
                kind: Self::KIND,
                invalid_value: s.to_string(),
                expected: "pending, invited, dev or admin",
            }),
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's standing in an entity: either a stored role or no row at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Involvement<R> {
    /// No membership row exists for the pair.
    NotInvolved,
    /// A membership row holds this role.
    Member(R),
}

impl<R> Default for Involvement<R> {
    fn default() -> Self {
        Self::NotInvolved
    }
}

impl<R: StoredRole> Involvement<R> {
    /// The stored role, if any.
    #[must_use]
    pub fn role(&self) -> Option<R> {
        match self {
            Self::NotInvolved => None,
            Self::Member(role) => Some(*role),
        }
    }

    /// Whether a membership row exists.
    #[must_use]
    pub fn is_involved(&self) -> bool {
        matches!(self, Self::Member(_))
    }

    /// Whether the stored role equals `role`.
    #[must_use]
    pub fn is(&self, role: R) -> bool {
        *self == Self::Member(role)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInvolved => "not_involved",
            Self::Member(role) => role.as_str(),
        }
    }
}

impl<R> From<Option<R>> for Involvement<R> {
    fn from(role: Option<R>) -> Self {
        match role {
            Some(role) => Self::Member(role),
            None => Self::NotInvolved,
        }
    }
}

impl<R> From<R> for Involvement<R>
where
    R: StoredRole,
{
    fn from(role: R) -> Self {
        Self::Member(role)
    }
}

impl<R: StoredRole> fmt::Display for Involvement<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<R: StoredRole> Serialize for Involvement<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of a successful assign call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOutcome<R> {
    /// A membership row was written.
    Changed {
        /// Standing before the write.
        previous: Involvement<R>,
        /// Role now stored.
        current: R,
    },
    /// The target already held the resulting role; nothing was written.
    Unchanged(R),
}

impl<R: StoredRole> AssignOutcome<R> {
    /// The role the target holds after the call.
    #[must_use]
    pub fn role(&self) -> R {
        match self {
            Self::Changed { current, .. } => *current,
            Self::Unchanged(role) => *role,
        }
    }

    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Result of a successful unassign call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnassignOutcome<R> {
    /// The row holding this role was deleted.
    Removed(R),
    /// There was no row; nothing changed.
    NotInvolved,
}

impl<R> UnassignOutcome<R> {
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}
