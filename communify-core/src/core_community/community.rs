//! Community records and member sets

use super::invite::InvitationCode;
use super::types::{CommunityId, CommunityType, Timestamp, UserId, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of user identifiers.
///
/// Backing storage may be list-shaped and contain repeats; building a
/// `MemberSet` from such a list collapses them, so a user appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberSet(BTreeSet<UserId>);

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.0.contains(user_id)
    }

    /// Returns `false` if the user was already present
    pub fn insert(&mut self, user_id: UserId) -> bool {
        self.0.insert(user_id)
    }

    pub fn remove(&mut self, user_id: &UserId) -> bool {
        self.0.remove(user_id)
    }

    /// Union of this set and `{user_id}`
    pub fn with_member(&self, user_id: &UserId) -> MemberSet {
        let mut next = self.clone();
        next.insert(user_id.clone());
        next
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }
}

impl FromIterator<UserId> for MemberSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        MemberSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MemberSet {
    type Item = &'a UserId;
    type IntoIter = std::collections::btree_set::Iter<'a, UserId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A Community (event group) as stored in the Directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Unique identifier
    pub id: CommunityId,

    /// Human-readable name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Open (browsable) or closed (invitation only)
    #[serde(rename = "type")]
    pub community_type: CommunityType,

    /// Code that grants membership of a closed Community
    pub invitation_code: Option<String>,

    /// Joined members. Absent in stored data means empty.
    #[serde(default)]
    pub members: MemberSet,

    /// Users who confirmed attendance of the event
    #[serde(default)]
    pub confirmed_attendees: MemberSet,

    /// Creator of the Community
    pub created_by: UserId,

    /// Optional event start time
    pub event_date: Option<Timestamp>,

    /// Optional event location
    pub location: Option<String>,

    /// Optional cover image URL
    pub cover_image: Option<String>,

    /// When the Community was created
    pub created_at: Timestamp,

    /// Revision of the member list, assigned by the Directory
    #[serde(default)]
    pub version: Version,
}

impl Community {
    /// Create a new Community. Closed Communities get a fresh invitation code.
    pub fn new(name: impl Into<String>, created_by: UserId, community_type: CommunityType) -> Self {
        let invitation_code = match community_type {
            CommunityType::Closed => Some(InvitationCode::generate().to_string()),
            CommunityType::Open => None,
        };

        Community {
            id: CommunityId::generate(),
            name: name.into(),
            description: None,
            community_type,
            invitation_code,
            members: MemberSet::new(),
            confirmed_attendees: MemberSet::new(),
            created_by,
            event_date: None,
            location: None,
            cover_image: None,
            created_at: Timestamp::now(),
            version: 0,
        }
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    /// Whether the Community belongs on the user's own list: they created it
    /// or they joined it
    pub fn involves(&self, user_id: &UserId) -> bool {
        &self.created_by == user_id || self.is_member(user_id)
    }

    pub fn attendee_count(&self) -> usize {
        self.confirmed_attendees.len()
    }

    pub fn matches_code(&self, code: &InvitationCode) -> bool {
        self.invitation_code.as_deref() == Some(code.as_str())
    }
}
