//! Broadcast audiences.

use crate::roles::UserId;
use serde::Serialize;
use std::collections::BTreeSet;

/// A deduplicated, ordered set of users to notify.
///
/// Mutations that can change who sees a resource capture the audience before
/// and after the write and notify the union, so users who lose access still
/// receive the close-out event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Audience(BTreeSet<UserId>);

impl Audience {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of two audiences.
    #[must_use]
    pub fn union(mut self, other: Audience) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Add a single user.
    #[must_use]
    pub fn with(mut self, user_id: UserId) -> Self {
        self.0.insert(user_id);
        self
    }

    pub fn insert(&mut self, user_id: UserId) -> bool {
        self.0.insert(user_id)
    }

    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.0.contains(&user_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }

    /// User ids in ascending order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<UserId> {
        self.iter().collect()
    }
}

impl FromIterator<UserId> for Audience {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<UserId>> for Audience {
    fn from(users: Vec<UserId>) -> Self {
        users.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_deduplicates() {
        let before = Audience::from(vec![3, 1, 2]);
        let after = Audience::from(vec![2, 4]);

        let all = before.union(after);
        assert_eq!(all.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_with_subject() {
        let audience = Audience::new().with(7).with(7);
        assert!(audience.contains(7));
        assert_eq!(audience.len(), 1);
        assert!(Audience::new().is_empty());
    }

    #[test]
    fn test_serializes_as_list() {
        let audience: Audience = [5, 1].into_iter().collect();
        assert_eq!(serde_json::to_string(&audience).unwrap(), "[1,5]");
    }
}
