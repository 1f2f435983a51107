//! Dashboard listings
//!
//! The two community lists a signed-in user sees: a preview of open
//! Communities anyone can browse, and the closed Communities they belong to.

use super::community::Community;
use super::directory::{CommunityDirectory, CommunityQuery, DirectoryResult};
use super::types::{CommunityType, UserId};
use tracing::debug;

/// Number of open Communities shown in the preview
pub const DEFAULT_PREVIEW_LIMIT: usize = 4;

/// Newest open Communities, at most `limit` of them
pub async fn open_communities(
    directory: &dyn CommunityDirectory,
    limit: usize,
) -> DirectoryResult<Vec<Community>> {
    let query = CommunityQuery::of_type(CommunityType::Open).limit(limit);
    let communities = directory.list(&query).await?;
    debug!(count = communities.len(), limit, "Loaded open communities");
    Ok(communities)
}

/// Closed Communities `user` created or joined, newest first
pub async fn my_communities(
    directory: &dyn CommunityDirectory,
    user: &UserId,
) -> DirectoryResult<Vec<Community>> {
    let closed = directory
        .list(&CommunityQuery::of_type(CommunityType::Closed))
        .await?;

    let mine: Vec<Community> = closed.into_iter().filter(|c| c.involves(user)).collect();
    debug!(user = %user, count = mine.len(), "Loaded user communities");
    Ok(mine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_community::storage::MemoryDirectory;
    use crate::core_community::types::Timestamp;
    use crate::test_utils::{user, TestCommunityBuilder};

    async fn seeded() -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        let fixtures = [
            ("open-1", CommunityType::Open, 1_000, "carol@x.com", &[][..]),
            ("open-2", CommunityType::Open, 2_000, "carol@x.com", &[][..]),
            ("open-3", CommunityType::Open, 3_000, "carol@x.com", &[][..]),
            ("open-4", CommunityType::Open, 4_000, "carol@x.com", &[][..]),
            ("open-5", CommunityType::Open, 5_000, "carol@x.com", &[][..]),
            ("created", CommunityType::Closed, 6_000, "alice@x.com", &[][..]),
            ("joined", CommunityType::Closed, 7_000, "carol@x.com", &["alice@x.com"][..]),
            ("other", CommunityType::Closed, 8_000, "carol@x.com", &["bob@x.com"][..]),
        ];

        for (id, kind, created, creator, members) in fixtures {
            let community = TestCommunityBuilder::new(id)
                .with_type(kind)
                .created_at(Timestamp::from_millis(created))
                .created_by(user(creator))
                .with_members(members)
                .build();
            directory.insert(&community).await.unwrap();
        }
        directory
    }

    #[tokio::test]
    async fn test_open_preview_is_newest_first_and_limited() {
        let directory = seeded().await;

        let preview = open_communities(&directory, DEFAULT_PREVIEW_LIMIT).await.unwrap();
        let ids: Vec<_> = preview.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["open-5", "open-4", "open-3", "open-2"]);
    }

    #[tokio::test]
    async fn test_my_communities_includes_created_and_joined() {
        let directory = seeded().await;

        let mine = my_communities(&directory, &user("alice@x.com")).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["joined", "created"]);
    }

    #[tokio::test]
    async fn test_my_communities_empty_for_stranger() {
        let directory = seeded().await;

        let mine = my_communities(&directory, &user("dave@x.com")).await.unwrap();
        assert!(mine.is_empty());
    }
}
