//! Community Management
//!
//! Community records, the Directory that stores them, and the invitation-code
//! join protocol.
//!
//! ## Architecture
//!
//! - **Community**: an event group with a member set, open or closed
//! - **Directory**: trait over the datastore; in-memory and SQLite backends
//! - **JoinService**: adds a user to the closed Community whose code they hold
//!
//! Member writes are conditional on the version read, so concurrent joins
//! to the same Community never overwrite each other.

pub mod community;
pub mod dashboard;
pub mod directory;
pub mod invite;
pub mod join;
pub mod storage;
pub mod types;

pub use community::{Community, MemberSet};
pub use dashboard::{my_communities, open_communities, DEFAULT_PREVIEW_LIMIT};
pub use directory::{CommunityDirectory, CommunityQuery, DirectoryError, DirectoryResult};
pub use invite::InvitationCode;
pub use join::{
    JoinError, JoinOutcome, JoinRequest, JoinResult, JoinService, DEFAULT_MAX_ATTEMPTS,
};
pub use storage::{MemoryDirectory, SqliteDirectory};
pub use types::{CommunityId, CommunityType, Timestamp, UserId, Version};
