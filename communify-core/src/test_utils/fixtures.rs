//! Test fixtures for creating common test objects
//!
//! Provides builder patterns and factory functions for creating test data.

use crate::core_community::{
    Community, CommunityId, CommunityType, InvitationCode, MemberSet, Timestamp, UserId,
};
use crate::core_identity::UserProfile;

/// Parse a non-blank invitation code, panicking otherwise
pub fn code(raw: &str) -> InvitationCode {
    InvitationCode::parse(raw).unwrap_or_else(|| panic!("blank invitation code: {:?}", raw))
}

pub fn user(id: &str) -> UserId {
    UserId::from(id)
}

/// Profile with a name and phone number, so onboarding is complete
pub fn test_profile(id: &str) -> UserProfile {
    let mut profile = UserProfile::new(user(id)).with_full_name("Test User");
    profile.phone_number = Some("+972500000000".to_string());
    profile
}

/// Closed Community `id` with invitation code `code` and the given members
pub fn test_closed_community(id: &str, code: &str, members: &[&str]) -> Community {
    TestCommunityBuilder::new(id)
        .with_code(code)
        .with_members(members)
        .build()
}

/// Builder for creating test Communities
pub struct TestCommunityBuilder {
    id: CommunityId,
    name: String,
    community_type: CommunityType,
    invitation_code: Option<String>,
    members: MemberSet,
    created_by: UserId,
    created_at: Timestamp,
}

impl TestCommunityBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: CommunityId::from(id),
            name: format!("Community {}", id),
            community_type: CommunityType::Closed,
            invitation_code: None,
            members: MemberSet::new(),
            created_by: user("creator@x.com"),
            created_at: Timestamp::now(),
        }
    }

    pub fn with_type(mut self, community_type: CommunityType) -> Self {
        self.community_type = community_type;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.invitation_code = Some(code.into());
        self
    }

    pub fn with_members(mut self, members: &[&str]) -> Self {
        self.members = members.iter().map(|m| user(m)).collect();
        self
    }

    pub fn created_by(mut self, creator: UserId) -> Self {
        self.created_by = creator;
        self
    }

    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn build(self) -> Community {
        Community {
            id: self.id,
            name: self.name,
            description: None,
            community_type: self.community_type,
            invitation_code: self.invitation_code,
            members: self.members,
            confirmed_attendees: MemberSet::new(),
            created_by: self.created_by,
            event_date: None,
            location: None,
            cover_image: None,
            created_at: self.created_at,
            version: 0,
        }
    }
}
