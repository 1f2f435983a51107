//! Directory wrappers for exercising failure and contention paths

use crate::core_community::{
    Community, CommunityDirectory, CommunityId, CommunityQuery, DirectoryError, DirectoryResult,
    InvitationCode, MemberSet, UserId, Version,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Which Directory call a [`FaultyDirectory`] fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `find_by_invitation_code` fails with `Unavailable`
    Find,
    /// `update_members` fails with `Unavailable`
    Update,
    /// `update_members` reports the Community as gone
    UpdateNotFound,
}

/// Fails one kind of call, forwarding everything else
pub struct FaultyDirectory {
    inner: Arc<dyn CommunityDirectory>,
    fault: Fault,
    find_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl FaultyDirectory {
    pub fn new(inner: Arc<dyn CommunityDirectory>, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            find_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommunityDirectory for FaultyDirectory {
    async fn find_by_invitation_code(&self, code: &InvitationCode) -> DirectoryResult<Vec<Community>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Find {
            return Err(DirectoryError::Unavailable("injected read failure".into()));
        }
        self.inner.find_by_invitation_code(code).await
    }

    async fn get(&self, id: &CommunityId) -> DirectoryResult<Option<Community>> {
        self.inner.get(id).await
    }

    async fn update_members(
        &self,
        id: &CommunityId,
        expected_version: Version,
        members: &MemberSet,
    ) -> DirectoryResult<Version> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::Update => {
                return Err(DirectoryError::Unavailable("injected write failure".into()))
            }
            Fault::UpdateNotFound => return Err(DirectoryError::NotFound(id.clone())),
            Fault::Find => {}
        }
        self.inner.update_members(id, expected_version, members).await
    }

    async fn insert(&self, community: &Community) -> DirectoryResult<()> {
        self.inner.insert(community).await
    }

    async fn list(&self, query: &CommunityQuery) -> DirectoryResult<Vec<Community>> {
        self.inner.list(query).await
    }
}

/// Lets a concurrent writer win before each member write.
///
/// Before forwarding `update_members`, the next queued racer is added to the
/// stored Community at its current version, so the forwarded write is stale
/// and conflicts. Once the queue is empty writes go straight through.
pub struct ConflictingDirectory {
    inner: Arc<dyn CommunityDirectory>,
    racers: Mutex<VecDeque<UserId>>,
}

impl ConflictingDirectory {
    pub fn new(inner: Arc<dyn CommunityDirectory>, racers: Vec<UserId>) -> Self {
        Self {
            inner,
            racers: Mutex::new(racers.into()),
        }
    }

    pub async fn remaining_racers(&self) -> usize {
        self.racers.lock().await.len()
    }
}

#[async_trait]
impl CommunityDirectory for ConflictingDirectory {
    async fn find_by_invitation_code(&self, code: &InvitationCode) -> DirectoryResult<Vec<Community>> {
        self.inner.find_by_invitation_code(code).await
    }

    async fn get(&self, id: &CommunityId) -> DirectoryResult<Option<Community>> {
        self.inner.get(id).await
    }

    async fn update_members(
        &self,
        id: &CommunityId,
        expected_version: Version,
        members: &MemberSet,
    ) -> DirectoryResult<Version> {
        let racer = self.racers.lock().await.pop_front();
        if let Some(racer) = racer {
            let current = self
                .inner
                .get(id)
                .await?
                .ok_or_else(|| DirectoryError::NotFound(id.clone()))?;
            self.inner
                .update_members(id, current.version, &current.members.with_member(&racer))
                .await?;
        }
        self.inner.update_members(id, expected_version, members).await
    }

    async fn insert(&self, community: &Community) -> DirectoryResult<()> {
        self.inner.insert(community).await
    }

    async fn list(&self, query: &CommunityQuery) -> DirectoryResult<Vec<Community>> {
        self.inner.list(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_community::storage::MemoryDirectory;
    use crate::test_utils::{test_closed_community, user};

    #[tokio::test]
    async fn test_racer_makes_write_stale() {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .insert(&test_closed_community("c1", "X1", &[]))
            .await
            .unwrap();
        let racing = ConflictingDirectory::new(directory.clone(), vec![user("carol@x.com")]);
        let id = CommunityId::from("c1");

        let result = racing.update_members(&id, 0, &MemberSet::new()).await;
        assert!(matches!(result, Err(DirectoryError::VersionConflict { .. })));
        assert_eq!(racing.remaining_racers().await, 0);

        let stored = directory.get(&id).await.unwrap().unwrap();
        assert!(stored.is_member(&user("carol@x.com")));
        assert_eq!(racing.update_members(&id, 1, &MemberSet::new()).await.unwrap(), 2);
    }
}
