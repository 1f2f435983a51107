//! Invitation-code join protocol
//!
//! Looks up a Community by invitation code and adds the requester to its
//! member set. Repeated joins are idempotent: a user who is already a member
//! gets [`JoinOutcome::AlreadyMember`] and nothing is written.
//!
//! The member write is conditional on the version read in the same attempt.
//! When a concurrent writer got there first the whole read-modify-write is
//! redone from a fresh read, up to `max_attempts` times. Storage failures are
//! never retried here; the caller decides.

use super::directory::{CommunityDirectory, DirectoryError};
use super::invite::InvitationCode;
use super::types::{CommunityId, UserId};
use crate::core_identity::{IdentityError, IdentityProvider};
use crate::metrics::{self, Timer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default number of read-modify-write attempts per join
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Result type for join operations
pub type JoinResult<T> = Result<T, JoinError>;

/// Result of a join. None of these is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Requester was added to the Community
    Joined(CommunityId),

    /// Requester was already a member; nothing written
    AlreadyMember(CommunityId),

    /// No Community has this code; nothing written
    InvalidCode,
}

impl JoinOutcome {
    pub fn community_id(&self) -> Option<&CommunityId> {
        match self {
            JoinOutcome::Joined(id) | JoinOutcome::AlreadyMember(id) => Some(id),
            JoinOutcome::InvalidCode => None,
        }
    }

    /// Message shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            JoinOutcome::Joined(_) => "Successfully joined the community!",
            JoinOutcome::AlreadyMember(_) => "You are already a member of this community",
            JoinOutcome::InvalidCode => "Invalid invitation code",
        }
    }
}

/// Join errors
#[derive(Debug, Error)]
pub enum JoinError {
    /// No signed-in user; redirect to sign-in rather than retry
    #[error("Not authenticated")]
    Unauthenticated,

    /// Network or storage failure on the single read or write
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// Community disappeared between lookup and write
    #[error("Community not found: {0}")]
    NotFound(CommunityId),

    /// Every attempt lost its conditional write to a concurrent writer
    #[error("Gave up after {attempts} conflicting member writes")]
    ConflictRetriesExhausted { attempts: u32 },
}

impl From<DirectoryError> for JoinError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => JoinError::NotFound(id),
            // Conflicts are consumed by the retry loop and never converted here
            other => JoinError::TransientIo(other.to_string()),
        }
    }
}

impl From<IdentityError> for JoinError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated => JoinError::Unauthenticated,
            IdentityError::Unavailable(msg) => JoinError::TransientIo(msg),
        }
    }
}

/// A join as submitted from a form: trimmed code plus explicit requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub code: InvitationCode,
    pub requester: UserId,
}

impl JoinRequest {
    /// `None` when the raw code is blank, in which case nothing should run
    pub fn new(raw_code: &str, requester: UserId) -> Option<Self> {
        InvitationCode::parse(raw_code).map(|code| Self { code, requester })
    }
}

/// Membership Join Service
#[derive(Clone)]
pub struct JoinService {
    directory: Arc<dyn CommunityDirectory>,
    max_attempts: u32,
}

impl JoinService {
    pub fn new(directory: Arc<dyn CommunityDirectory>) -> Self {
        Self::with_max_attempts(directory, DEFAULT_MAX_ATTEMPTS)
    }

    /// `max_attempts` below 1 is treated as 1
    pub fn with_max_attempts(directory: Arc<dyn CommunityDirectory>, max_attempts: u32) -> Self {
        Self {
            directory,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Join the Community whose invitation code equals `code`
    pub async fn join(&self, code: &InvitationCode, requester: &UserId) -> JoinResult<JoinOutcome> {
        let timer = Timer::new(metrics::JOIN_DURATION);
        let result = self.join_with_retry(code, requester).await;
        timer.stop();

        match &result {
            Ok(JoinOutcome::Joined(_)) => metrics::record_counter(metrics::JOIN_JOINED, 1),
            Ok(JoinOutcome::AlreadyMember(_)) => {
                metrics::record_counter(metrics::JOIN_ALREADY_MEMBER, 1)
            }
            Ok(JoinOutcome::InvalidCode) => metrics::record_counter(metrics::JOIN_INVALID_CODE, 1),
            Err(_) => metrics::record_counter(metrics::JOIN_FAILED, 1),
        }

        result
    }

    pub async fn submit(&self, request: &JoinRequest) -> JoinResult<JoinOutcome> {
        self.join(&request.code, &request.requester).await
    }

    /// Resolve the requester through `identity`, then join
    pub async fn join_as_current_user(
        &self,
        identity: &dyn IdentityProvider,
        code: &InvitationCode,
    ) -> JoinResult<JoinOutcome> {
        let user = identity.current_user().await?;
        self.join(code, &user.id).await
    }

    async fn join_with_retry(
        &self,
        code: &InvitationCode,
        requester: &UserId,
    ) -> JoinResult<JoinOutcome> {
        for attempt in 1..=self.max_attempts {
            match self.attempt_join(code, requester).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_conflict() => {
                    metrics::record_counter(metrics::JOIN_CONFLICT, 1);
                    warn!(
                        code = %code,
                        user = %requester,
                        attempt,
                        error = %err,
                        "Member write lost to a concurrent update"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(JoinError::ConflictRetriesExhausted {
            attempts: self.max_attempts,
        })
    }

    async fn attempt_join(
        &self,
        code: &InvitationCode,
        requester: &UserId,
    ) -> Result<JoinOutcome, DirectoryError> {
        let matches = self.directory.find_by_invitation_code(code).await?;

        if matches.len() > 1 {
            warn!(
                code = %code,
                count = matches.len(),
                "Invitation code matches several communities; using the first"
            );
        }

        let Some(community) = matches.into_iter().next() else {
            debug!(code = %code, "No community for invitation code");
            return Ok(JoinOutcome::InvalidCode);
        };

        if community.is_member(requester) {
            debug!(community = %community.id, user = %requester, "Already a member");
            return Ok(JoinOutcome::AlreadyMember(community.id));
        }

        let members = community.members.with_member(requester);
        let version = self
            .directory
            .update_members(&community.id, community.version, &members)
            .await?;

        info!(
            community = %community.id,
            user = %requester,
            version,
            "Joined community"
        );
        Ok(JoinOutcome::Joined(community.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_community::storage::MemoryDirectory;
    use crate::core_identity::{
        IdentityResult, ProfileUpdate, SessionIdentity, UserProfile,
    };
    use crate::test_utils::{
        code, test_closed_community, user, ConflictingDirectory, FaultyDirectory, Fault,
    };

    async fn directory_with_c1() -> Arc<MemoryDirectory> {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .insert(&test_closed_community("c1", "ABC123", &["alice@x.com"]))
            .await
            .unwrap();
        directory
    }

    #[tokio::test]
    async fn test_join_adds_new_member() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory.clone());

        let outcome = service.join(&code("ABC123"), &user("bob@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::Joined(CommunityId::from("c1")));

        let stored = directory.get(&CommunityId::from("c1")).await.unwrap().unwrap();
        let expected: Vec<_> = vec![user("alice@x.com"), user("bob@x.com")];
        assert_eq!(stored.members.iter().cloned().collect::<Vec<_>>(), expected);
        assert_eq!(directory.write_count(), 1);
    }

    #[tokio::test]
    async fn test_join_existing_member_is_noop() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory.clone());

        let outcome = service.join(&code("ABC123"), &user("alice@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::AlreadyMember(CommunityId::from("c1")));
        assert_eq!(directory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_join_unknown_code() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory.clone());

        let outcome = service.join(&code("ZZZZZZ"), &user("bob@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::InvalidCode);
        assert_eq!(outcome.community_id(), None);
        assert_eq!(directory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_join_twice_is_idempotent() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory.clone());
        let bob = user("bob@x.com");

        let first = service.join(&code("ABC123"), &bob).await.unwrap();
        let after_first = directory.get(&CommunityId::from("c1")).await.unwrap().unwrap();
        let second = service.join(&code("ABC123"), &bob).await.unwrap();
        let after_second = directory.get(&CommunityId::from("c1")).await.unwrap().unwrap();

        assert!(matches!(first, JoinOutcome::Joined(_)));
        assert!(matches!(second, JoinOutcome::AlreadyMember(_)));
        assert_eq!(after_first.members, after_second.members);
        assert_eq!(after_first.version, after_second.version);
        assert_eq!(directory.write_count(), 1);
    }

    #[tokio::test]
    async fn test_code_is_case_sensitive() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory);

        let outcome = service.join(&code("abc123"), &user("bob@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::InvalidCode);
    }

    #[tokio::test]
    async fn test_read_failure_is_transient_and_not_retried() {
        let directory = directory_with_c1().await;
        let faulty = Arc::new(FaultyDirectory::new(directory.clone(), Fault::Find));
        let service = JoinService::new(faulty.clone());

        let result = service.join(&code("ABC123"), &user("bob@x.com")).await;
        assert!(matches!(result, Err(JoinError::TransientIo(_))));
        assert_eq!(faulty.find_calls(), 1);
        assert_eq!(directory.write_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_transient_and_not_retried() {
        let directory = directory_with_c1().await;
        let faulty = Arc::new(FaultyDirectory::new(directory.clone(), Fault::Update));
        let service = JoinService::new(faulty.clone());

        let result = service.join(&code("ABC123"), &user("bob@x.com")).await;
        assert!(matches!(result, Err(JoinError::TransientIo(_))));
        assert_eq!(faulty.update_calls(), 1);

        let stored = directory.get(&CommunityId::from("c1")).await.unwrap().unwrap();
        assert!(!stored.is_member(&user("bob@x.com")));
    }

    #[tokio::test]
    async fn test_vanished_community_is_not_found_and_not_retried() {
        let directory = directory_with_c1().await;
        let faulty = Arc::new(FaultyDirectory::new(directory.clone(), Fault::UpdateNotFound));
        let service = JoinService::new(faulty.clone());

        let result = service.join(&code("ABC123"), &user("bob@x.com")).await;
        match result {
            Err(JoinError::NotFound(id)) => assert_eq!(id, CommunityId::from("c1")),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(faulty.find_calls(), 1);
        assert_eq!(faulty.update_calls(), 1);
        assert_eq!(directory.write_count(), 0);
    }

    /// Identity backend that cannot be reached
    struct UnreachableIdentity;

    #[async_trait::async_trait]
    impl IdentityProvider for UnreachableIdentity {
        async fn current_user(&self) -> IdentityResult<UserProfile> {
            Err(IdentityError::Unavailable("session store offline".into()))
        }

        async fn update_me(&self, _update: ProfileUpdate) -> IdentityResult<UserProfile> {
            Err(IdentityError::Unavailable("session store offline".into()))
        }
    }

    #[tokio::test]
    async fn test_identity_outage_is_transient() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory.clone());

        let result = service
            .join_as_current_user(&UnreachableIdentity, &code("ABC123"))
            .await;
        match result {
            Err(JoinError::TransientIo(msg)) => assert!(msg.contains("offline")),
            other => panic!("expected TransientIo, got {:?}", other),
        }
        assert_eq!(directory.write_count(), 0);
    }

    #[test]
    fn test_directory_error_mapping() {
        let gone = JoinError::from(DirectoryError::NotFound(CommunityId::from("c1")));
        assert!(matches!(gone, JoinError::NotFound(_)));

        let stray = JoinError::from(DirectoryError::VersionConflict {
            expected: 0,
            actual: 1,
        });
        assert!(matches!(stray, JoinError::TransientIo(_)));
    }

    #[tokio::test]
    async fn test_conflict_is_retried_without_losing_concurrent_join() {
        let directory = directory_with_c1().await;
        let racing = Arc::new(ConflictingDirectory::new(
            directory.clone(),
            vec![user("carol@x.com")],
        ));
        let service = JoinService::new(racing);

        let outcome = service.join(&code("ABC123"), &user("bob@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::Joined(CommunityId::from("c1")));

        let stored = directory.get(&CommunityId::from("c1")).await.unwrap().unwrap();
        assert!(stored.is_member(&user("alice@x.com")));
        assert!(stored.is_member(&user("bob@x.com")));
        assert!(stored.is_member(&user("carol@x.com")));
    }

    #[tokio::test]
    async fn test_conflict_budget_exhausted() {
        let directory = directory_with_c1().await;
        let racers = (0..5).map(|i| user(&format!("racer{}@x.com", i))).collect();
        let racing = Arc::new(ConflictingDirectory::new(directory.clone(), racers));
        let service = JoinService::with_max_attempts(racing, 2);

        let result = service.join(&code("ABC123"), &user("bob@x.com")).await;
        assert!(matches!(
            result,
            Err(JoinError::ConflictRetriesExhausted { attempts: 2 })
        ));

        let stored = directory.get(&CommunityId::from("c1")).await.unwrap().unwrap();
        assert!(!stored.is_member(&user("bob@x.com")));
    }

    #[tokio::test]
    async fn test_conflict_reread_finds_requester_already_joined() {
        let directory = directory_with_c1().await;
        let racing = Arc::new(ConflictingDirectory::new(
            directory.clone(),
            vec![user("bob@x.com")],
        ));
        let service = JoinService::new(racing);

        let outcome = service.join(&code("ABC123"), &user("bob@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::AlreadyMember(CommunityId::from("c1")));
    }

    #[tokio::test]
    async fn test_duplicate_codes_use_first_match() {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .insert(&test_closed_community("first", "DUP", &[]))
            .await
            .unwrap();
        directory
            .insert(&test_closed_community("second", "DUP", &[]))
            .await
            .unwrap();
        let service = JoinService::new(directory.clone());

        let outcome = service.join(&code("DUP"), &user("bob@x.com")).await.unwrap();
        assert_eq!(outcome, JoinOutcome::Joined(CommunityId::from("first")));

        let second = directory.get(&CommunityId::from("second")).await.unwrap().unwrap();
        assert!(second.members.is_empty());
    }

    #[tokio::test]
    async fn test_join_as_current_user() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory);

        let identity = SessionIdentity::signed_in(UserProfile::new(user("bob@x.com")));
        let outcome = service
            .join_as_current_user(&identity, &code("ABC123"))
            .await
            .unwrap();
        assert!(matches!(outcome, JoinOutcome::Joined(_)));

        identity.sign_out().await;
        let result = service.join_as_current_user(&identity, &code("ABC123")).await;
        assert!(matches!(result, Err(JoinError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_submit_request() {
        let directory = directory_with_c1().await;
        let service = JoinService::new(directory);

        assert!(JoinRequest::new("   ", user("bob@x.com")).is_none());

        let request = JoinRequest::new(" ABC123 ", user("bob@x.com")).unwrap();
        let outcome = service.submit(&request).await.unwrap();
        assert_eq!(outcome.message(), "Successfully joined the community!");
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let service = JoinService::with_max_attempts(Arc::new(MemoryDirectory::new()), 0);
        assert_eq!(service.max_attempts(), 1);
    }
}
