//! Schema migrations
//!
//! Every schema change is an entry in [`MIGRATIONS`]. Applied versions are
//! recorded in `_migrations`; each step runs in its own transaction together
//! with its bookkeeping row.

use sqlx::SqlitePool;
use tracing::{debug, info};

/// A single schema step
struct Migration {
    version: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Organizations and agents",
        sql: r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                domain TEXT NOT NULL UNIQUE,
                timezone TEXT NOT NULL DEFAULT 'UTC',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            -- instructions: JSON array of strings; tools: JSON text
            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY NOT NULL,
                organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                display_name TEXT,
                description TEXT,
                agent_type TEXT NOT NULL DEFAULT 'general' CHECK (agent_type IN (
                    'general', 'customer_support', 'sales', 'tech_support', 'custom'
                )),
                instructions TEXT NOT NULL DEFAULT '[]',
                tools TEXT,
                transfer_to_human INTEGER NOT NULL DEFAULT 0,
                is_default INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_agents_org_name ON agents(organization_id, name);
            CREATE INDEX IF NOT EXISTS idx_agents_org_default ON agents(organization_id, is_default);
        "#,
    },
    Migration {
        version: 2,
        description: "User groups",
        sql: r#"
            CREATE TABLE IF NOT EXISTS user_groups (
                id TEXT PRIMARY KEY NOT NULL,
                organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS agent_groups (
                agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
                group_id TEXT NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
                PRIMARY KEY (agent_id, group_id)
            );

            CREATE INDEX IF NOT EXISTS idx_agent_groups_group ON agent_groups(group_id);
        "#,
    },
];

/// Latest schema version
pub const CURRENT_VERSION: i32 = 2;

async fn applied_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

/// Apply every migration newer than the recorded version
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let from = applied_version(pool).await?;
    if from >= CURRENT_VERSION {
        debug!(version = from, "Schema is current");
        return Ok(());
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > from) {
        info!(version = step.version, description = step.description, "Applying migration");

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(step.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO _migrations (version, description) VALUES (?, ?)")
            .bind(step.version)
            .bind(step.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    info!(from, to = CURRENT_VERSION, "Schema migrated");
    Ok(())
}

/// Report the recorded schema version against the latest one
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = applied_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Schema version report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub current_version: i32,
    pub target_version: i32,
    pub needs_migration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bare_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory pool")
    }

    #[test]
    fn test_steps_are_ordered_and_end_at_current_version() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(versions, (1..=CURRENT_VERSION).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fresh_database_is_migrated_to_latest() {
        let pool = bare_pool().await;

        let before = migration_status(&pool).await.unwrap();
        assert_eq!(before.current_version, 0);
        assert!(before.needs_migration);

        run_migrations(&pool).await.unwrap();

        let after = migration_status(&pool).await.unwrap();
        assert_eq!(
            after,
            MigrationStatus {
                current_version: CURRENT_VERSION,
                target_version: CURRENT_VERSION,
                needs_migration: false,
            }
        );
    }

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let pool = bare_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, i64::from(CURRENT_VERSION));
    }

    #[tokio::test]
    async fn test_partial_database_gets_remaining_steps() {
        let pool = bare_pool().await;
        applied_version(&pool).await.unwrap();
        sqlx::raw_sql(MIGRATIONS[0].sql).execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO _migrations (version) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();

        let (groups,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_groups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(groups, 0);
        assert!(!migration_status(&pool).await.unwrap().needs_migration);
    }

    #[tokio::test]
    async fn test_agent_type_is_constrained() {
        let pool = bare_pool().await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO organizations (id, name, domain) VALUES ('o1', 'Acme', 'acme.com')")
            .execute(&pool)
            .await
            .unwrap();
        let result = sqlx::query(
            "INSERT INTO agents (id, organization_id, name, agent_type) VALUES ('a1', 'o1', 'Bot', 'wizard')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
