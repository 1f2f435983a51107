//! Identity Provider trait and an in-process session implementation

use super::profile::{ProfileUpdate, UserProfile};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors from the identity layer
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No signed-in user
    #[error("Not authenticated")]
    Unauthenticated,

    /// Identity backend unreachable
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Source of the current user's identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user. Fails with `Unauthenticated` if there is no session.
    async fn current_user(&self) -> IdentityResult<UserProfile>;

    /// Save edits to the signed-in user's profile
    async fn update_me(&self, update: ProfileUpdate) -> IdentityResult<UserProfile>;

    async fn is_authenticated(&self) -> bool {
        self.current_user().await.is_ok()
    }
}

/// Holds at most one signed-in profile
#[derive(Clone, Default)]
pub struct SessionIdentity {
    session: Arc<RwLock<Option<UserProfile>>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session already signed in as `profile`
    pub fn signed_in(profile: UserProfile) -> Self {
        Self {
            session: Arc::new(RwLock::new(Some(profile))),
        }
    }

    pub async fn sign_in(&self, profile: UserProfile) {
        info!(user = %profile.id, "Signed in");
        *self.session.write().await = Some(profile);
    }

    pub async fn sign_out(&self) {
        if let Some(profile) = self.session.write().await.take() {
            info!(user = %profile.id, "Signed out");
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_user(&self) -> IdentityResult<UserProfile> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(IdentityError::Unauthenticated)
    }

    async fn update_me(&self, update: ProfileUpdate) -> IdentityResult<UserProfile> {
        let mut session = self.session.write().await;
        let profile = session.as_mut().ok_or(IdentityError::Unauthenticated)?;
        update.apply_to(profile);
        debug!(user = %profile.id, "Profile updated");
        Ok(profile.clone())
    }
}
