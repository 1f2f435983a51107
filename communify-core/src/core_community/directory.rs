//! Community Directory trait
//!
//! Defines the interface to the datastore that owns Community records.
//! The Join Service only ever reads through this trait and writes members
//! with a version-conditional update.

use super::community::{Community, MemberSet};
use super::invite::InvitationCode;
use super::types::{CommunityId, CommunityType, Version};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for Directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur in Directory operations
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport or storage unavailable
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    /// Conditional write lost against a newer revision
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: Version, actual: Version },

    /// Community does not exist
    #[error("Community not found: {0}")]
    NotFound(CommunityId),

    /// Community id already taken
    #[error("Community already exists: {0}")]
    AlreadyExists(CommunityId),
}

impl DirectoryError {
    /// Whether a fresh read-modify-write may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, DirectoryError::VersionConflict { .. })
    }
}

/// Query used to list Communities, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityQuery {
    /// Restrict to one Community type
    pub community_type: Option<CommunityType>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl CommunityQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_type(community_type: CommunityType) -> Self {
        Self {
            community_type: Some(community_type),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, community: &Community) -> bool {
        self.community_type
            .map_or(true, |t| community.community_type == t)
    }
}

/// Directory of Community records
///
/// Implementations must ensure:
/// - `find_by_invitation_code` returns matches in a stable Directory order
/// - `update_members` is atomic and only applies when `expected_version`
///   equals the stored version; on success the stored version increases
#[async_trait]
pub trait CommunityDirectory: Send + Sync {
    /// Communities whose invitation code exactly equals `code`.
    ///
    /// Expected length is 0 or 1 in well-formed data.
    async fn find_by_invitation_code(&self, code: &InvitationCode) -> DirectoryResult<Vec<Community>>;

    /// Load a Community by id
    async fn get(&self, id: &CommunityId) -> DirectoryResult<Option<Community>>;

    /// Replace the member set if the stored version is still `expected_version`.
    ///
    /// Returns the new version.
    async fn update_members(
        &self,
        id: &CommunityId,
        expected_version: Version,
        members: &MemberSet,
    ) -> DirectoryResult<Version>;

    /// Store a new Community
    async fn insert(&self, community: &Community) -> DirectoryResult<()>;

    /// List Communities newest first
    async fn list(&self, query: &CommunityQuery) -> DirectoryResult<Vec<Community>>;
}
