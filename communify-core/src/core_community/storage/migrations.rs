//! Database migrations for Communities
//!
//! Each migration is applied atomically and tracked in the
//! community_schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::info;

use crate::core_community::directory::{DirectoryError, DirectoryResult};
use crate::core_community::types::Timestamp;

/// Current schema version for core_community
pub const CURRENT_COMMUNITY_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial Communities schema",
        up_sql: r#"
                CREATE TABLE IF NOT EXISTS community_schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS communities (
                    id TEXT PRIMARY KEY,                    -- CommunityId
                    name TEXT NOT NULL,
                    description TEXT,
                    community_type TEXT NOT NULL CHECK(community_type IN ('open', 'closed')),
                    invitation_code TEXT,                   -- not unique
                    created_by TEXT NOT NULL,               -- UserId
                    event_date INTEGER,
                    location TEXT,
                    cover_image TEXT,
                    created_at INTEGER NOT NULL,
                    version INTEGER NOT NULL DEFAULT 0      -- bumped on each member write
                );

                CREATE INDEX IF NOT EXISTS idx_communities_code ON communities(invitation_code)
                    WHERE invitation_code IS NOT NULL;
                CREATE INDEX IF NOT EXISTS idx_communities_type ON communities(community_type, created_at);

                CREATE TABLE IF NOT EXISTS community_members (
                    community_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    PRIMARY KEY (community_id, user_id),
                    FOREIGN KEY (community_id) REFERENCES communities(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_community_members_user ON community_members(user_id);

                CREATE TABLE IF NOT EXISTS community_attendees (
                    community_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    PRIMARY KEY (community_id, user_id),
                    FOREIGN KEY (community_id) REFERENCES communities(id) ON DELETE CASCADE
                );
            "#,
        down_sql: Some(
            r#"
                DROP TABLE IF EXISTS community_attendees;
                DROP INDEX IF EXISTS idx_community_members_user;
                DROP TABLE IF EXISTS community_members;
                DROP INDEX IF EXISTS idx_communities_type;
                DROP INDEX IF EXISTS idx_communities_code;
                DROP TABLE IF EXISTS communities;
                DROP TABLE IF EXISTS community_schema_version;
            "#,
        ),
    }]
}

fn pool_error(e: r2d2::Error) -> DirectoryError {
    DirectoryError::Unavailable(format!("Failed to get connection: {}", e))
}

fn sql_error(e: rusqlite::Error) -> DirectoryError {
    DirectoryError::Unavailable(format!("Migration failed: {}", e))
}

/// Get current schema version from database
pub fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> DirectoryResult<i32> {
    let conn = pool.get().map_err(pool_error)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS community_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(sql_error)?;

    // Only an empty table means version 0; any other failure is surfaced
    let version: Option<i32> = conn
        .query_row(
            "SELECT version FROM community_schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(sql_error)?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> DirectoryResult<()> {
    let current_version = get_current_version(pool)?;

    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get().map_err(pool_error)?;

    for migration in pending {
        let tx = conn.unchecked_transaction().map_err(sql_error)?;
        tx.execute_batch(migration.up_sql).map_err(sql_error)?;
        tx.execute(
            "INSERT INTO community_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, Timestamp::now().as_millis() as i64],
        )
        .map_err(sql_error)?;
        tx.commit().map_err(sql_error)?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied community schema migration"
        );
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
