//! SQLite-backed Community Directory
//!
//! Uses an r2d2 connection pool. Every call runs on the blocking thread pool
//! and member writes are a single transaction guarded by the stored version.

use crate::core_community::community::{Community, MemberSet};
use crate::core_community::directory::{
    CommunityDirectory, CommunityQuery, DirectoryError, DirectoryResult,
};
use crate::core_community::invite::InvitationCode;
use crate::core_community::types::{CommunityId, CommunityType, Timestamp, UserId, Version};
use crate::metrics;
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const COMMUNITY_COLUMNS: &str = "id, name, description, community_type, invitation_code, \
     created_by, event_date, location, cover_image, created_at, version";

fn storage_error(context: &str) -> impl Fn(rusqlite::Error) -> DirectoryError + '_ {
    move |e| DirectoryError::Unavailable(format!("{}: {}", context, e))
}

fn pool_error(e: r2d2::Error) -> DirectoryError {
    DirectoryError::Unavailable(format!("Failed to get connection: {}", e))
}

/// SQLite directory of Communities
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDirectory {
    /// Create a directory over an existing pool, running pending migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> DirectoryResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        busy_timeout: Duration,
    ) -> DirectoryResult<Self> {
        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e| {
                DirectoryError::Unavailable(format!("Failed to create connection pool: {}", e))
            })?;

        Self::new(pool)
    }

    /// Create a new in-memory directory
    pub fn memory() -> DirectoryResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        // Each in-memory connection is a separate database
        let pool = Pool::builder().max_size(1).build(manager).map_err(|e| {
            DirectoryError::Unavailable(format!("Failed to create connection pool: {}", e))
        })?;

        Self::new(pool)
    }

    async fn with_conn<T, F>(&self, f: F) -> DirectoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> DirectoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(pool_error)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| DirectoryError::Unavailable(format!("Task join error: {}", e)))?
    }
}

fn read_community_row(row: &Row<'_>) -> rusqlite::Result<Community> {
    let type_str: String = row.get(3)?;
    let community_type = CommunityType::from_str(&type_str).unwrap_or(CommunityType::Closed);

    Ok(Community {
        id: CommunityId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        community_type,
        invitation_code: row.get(4)?,
        members: MemberSet::new(),
        confirmed_attendees: MemberSet::new(),
        created_by: UserId::new(row.get::<_, String>(5)?),
        event_date: row
            .get::<_, Option<i64>>(6)?
            .map(|ms| Timestamp::from_millis(ms.max(0) as u64)),
        location: row.get(7)?,
        cover_image: row.get(8)?,
        created_at: Timestamp::from_millis(row.get::<_, i64>(9)?.max(0) as u64),
        version: row.get::<_, i64>(10)?.max(0) as Version,
    })
}

fn load_user_set(conn: &Connection, table: &str, id: &CommunityId) -> DirectoryResult<MemberSet> {
    let sql = format!("SELECT user_id FROM {} WHERE community_id = ?", table);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(storage_error("Failed to prepare member query"))?;

    let users = stmt
        .query_map(params![id.as_str()], |row| row.get::<_, String>(0))
        .map_err(storage_error("Failed to load members"))?
        .map(|r| r.map(UserId::new))
        .collect::<Result<MemberSet, _>>()
        .map_err(storage_error("Failed to load members"))?;

    Ok(users)
}

/// Fill in member and attendee sets for rows read from `communities`
fn hydrate(conn: &Connection, mut communities: Vec<Community>) -> DirectoryResult<Vec<Community>> {
    for community in &mut communities {
        community.members = load_user_set(conn, "community_members", &community.id)?;
        community.confirmed_attendees = load_user_set(conn, "community_attendees", &community.id)?;
    }
    Ok(communities)
}

fn query_communities(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> DirectoryResult<Vec<Community>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(storage_error("Failed to prepare community query"))?;
    let rows = stmt
        .query_map(params, read_community_row)
        .map_err(storage_error("Failed to query communities"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage_error("Failed to read community"))?;

    hydrate(conn, rows)
}

#[async_trait]
impl CommunityDirectory for SqliteDirectory {
    async fn find_by_invitation_code(&self, code: &InvitationCode) -> DirectoryResult<Vec<Community>> {
        let code = code.as_str().to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM communities WHERE invitation_code = ?1
                 ORDER BY created_at ASC, rowid ASC",
                COMMUNITY_COLUMNS
            );
            query_communities(conn, &sql, params![code])
        })
        .await
    }

    async fn get(&self, id: &CommunityId) -> DirectoryResult<Option<Community>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {} FROM communities WHERE id = ?1", COMMUNITY_COLUMNS);
            let row = conn
                .query_row(&sql, params![id.as_str()], read_community_row)
                .optional()
                .map_err(storage_error("Failed to load community"))?;

            match row {
                Some(community) => Ok(hydrate(conn, vec![community])?.pop()),
                None => Ok(None),
            }
        })
        .await
    }

    async fn update_members(
        &self,
        id: &CommunityId,
        expected_version: Version,
        members: &MemberSet,
    ) -> DirectoryResult<Version> {
        let id = id.clone();
        let members = members.clone();

        let version = self
            .with_conn(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(storage_error("Failed to begin transaction"))?;

                let changed = tx
                    .execute(
                        "UPDATE communities SET version = version + 1
                         WHERE id = ?1 AND version = ?2",
                        params![id.as_str(), expected_version as i64],
                    )
                    .map_err(storage_error("Failed to update version"))?;

                if changed == 0 {
                    let actual: Option<i64> = tx
                        .query_row(
                            "SELECT version FROM communities WHERE id = ?1",
                            params![id.as_str()],
                            |row| row.get(0),
                        )
                        .optional()
                        .map_err(storage_error("Failed to read version"))?;

                    return Err(match actual {
                        Some(actual) => DirectoryError::VersionConflict {
                            expected: expected_version,
                            actual: actual.max(0) as Version,
                        },
                        None => DirectoryError::NotFound(id),
                    });
                }

                tx.execute(
                    "DELETE FROM community_members WHERE community_id = ?1",
                    params![id.as_str()],
                )
                .map_err(storage_error("Failed to clear members"))?;

                for user in &members {
                    tx.execute(
                        "INSERT INTO community_members (community_id, user_id) VALUES (?1, ?2)",
                        params![id.as_str(), user.as_str()],
                    )
                    .map_err(storage_error("Failed to insert member"))?;
                }

                tx.commit()
                    .map_err(storage_error("Failed to commit transaction"))?;

                Ok(expected_version + 1)
            })
            .await?;

        metrics::record_counter(metrics::DIRECTORY_WRITES, 1);
        debug!(version, "Member list written");
        Ok(version)
    }

    async fn insert(&self, community: &Community) -> DirectoryResult<()> {
        let community = community.clone();
        self.with_conn(move |conn| {
            let tx = conn
                .transaction()
                .map_err(storage_error("Failed to begin transaction"))?;

            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM communities WHERE id = ?1",
                    params![community.id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(storage_error("Failed to check community"))?;
            if exists.is_some() {
                return Err(DirectoryError::AlreadyExists(community.id));
            }

            tx.execute(
                "INSERT INTO communities (id, name, description, community_type, invitation_code,
                     created_by, event_date, location, cover_image, created_at, version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    community.id.as_str(),
                    &community.name,
                    &community.description,
                    community.community_type.as_str(),
                    &community.invitation_code,
                    community.created_by.as_str(),
                    community.event_date.map(|t| t.as_millis() as i64),
                    &community.location,
                    &community.cover_image,
                    community.created_at.as_millis() as i64,
                    community.version as i64,
                ],
            )
            .map_err(storage_error("Failed to insert community"))?;

            for (table, users) in [
                ("community_members", &community.members),
                ("community_attendees", &community.confirmed_attendees),
            ] {
                let sql = format!(
                    "INSERT INTO {} (community_id, user_id) VALUES (?1, ?2)",
                    table
                );
                for user in users {
                    tx.execute(&sql, params![community.id.as_str(), user.as_str()])
                        .map_err(storage_error("Failed to insert member"))?;
                }
            }

            tx.commit()
                .map_err(storage_error("Failed to commit transaction"))?;
            Ok(())
        })
        .await
    }

    async fn list(&self, query: &CommunityQuery) -> DirectoryResult<Vec<Community>> {
        let community_type = query.community_type.map(|t| t.as_str());
        // SQLite treats a negative LIMIT as no limit
        let limit = query.limit.map_or(-1, |l| l as i64);

        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM communities
                 WHERE (?1 IS NULL OR community_type = ?1)
                 ORDER BY created_at DESC, rowid ASC
                 LIMIT ?2",
                COMMUNITY_COLUMNS
            );
            query_communities(conn, &sql, params![community_type, limit])
        })
        .await
    }
}
