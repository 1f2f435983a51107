//! Communify membership core
//!
//! Communities, the Directory that stores them, and the invitation-code join
//! protocol, plus the configuration, logging and metrics around them.

pub mod config;
pub mod core_community;
pub mod core_identity;
pub mod logging;
pub mod metrics;
pub mod test_utils;

pub use config::{Config, ConfigError};
pub use core_community::{
    Community, CommunityDirectory, CommunityId, CommunityType, InvitationCode, JoinError,
    JoinOutcome, JoinService, MemberSet, UserId,
};
pub use core_identity::{IdentityProvider, SessionIdentity, UserProfile};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = LogLevel::Info;
        let _ = CommunityType::Closed;
        assert!(Config::default().validate().is_ok());
    }
}
