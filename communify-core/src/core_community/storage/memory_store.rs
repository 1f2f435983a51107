//! In-Memory Community Directory
//!
//! Keeps Communities in insertion order, which is also its Directory order.

use crate::core_community::community::{Community, MemberSet};
use crate::core_community::directory::{
    CommunityDirectory, CommunityQuery, DirectoryError, DirectoryResult,
};
use crate::core_community::invite::InvitationCode;
use crate::core_community::types::{CommunityId, Version};
use crate::metrics;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory directory (for tests and demos)
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    communities: Arc<RwLock<Vec<Community>>>,
    writes: Arc<AtomicU64>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of member writes applied so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.communities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.communities.read().await.is_empty()
    }
}

#[async_trait]
impl CommunityDirectory for MemoryDirectory {
    async fn find_by_invitation_code(&self, code: &InvitationCode) -> DirectoryResult<Vec<Community>> {
        let communities = self.communities.read().await;
        Ok(communities
            .iter()
            .filter(|c| c.matches_code(code))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &CommunityId) -> DirectoryResult<Option<Community>> {
        let communities = self.communities.read().await;
        Ok(communities.iter().find(|c| &c.id == id).cloned())
    }

    async fn update_members(
        &self,
        id: &CommunityId,
        expected_version: Version,
        members: &MemberSet,
    ) -> DirectoryResult<Version> {
        let mut communities = self.communities.write().await;
        let community = communities
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;

        if community.version != expected_version {
            return Err(DirectoryError::VersionConflict {
                expected: expected_version,
                actual: community.version,
            });
        }

        community.members = members.clone();
        community.version += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);
        metrics::record_counter(metrics::DIRECTORY_WRITES, 1);

        Ok(community.version)
    }

    async fn insert(&self, community: &Community) -> DirectoryResult<()> {
        let mut communities = self.communities.write().await;
        if communities.iter().any(|c| c.id == community.id) {
            return Err(DirectoryError::AlreadyExists(community.id.clone()));
        }
        communities.push(community.clone());
        Ok(())
    }

    async fn list(&self, query: &CommunityQuery) -> DirectoryResult<Vec<Community>> {
        let communities = self.communities.read().await;
        let mut matching: Vec<Community> = communities
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();

        // Stable sort keeps insertion order among equal timestamps
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching)
    }
}
