//! Embedded schema migrations.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to get schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every migration newer than the recorded schema version.
    /// Returns how many were applied.
    pub async fn run_embedded_migrations(
        &self,
        migrations: &[Migration],
    ) -> Result<usize, MigrationError> {
        self.ensure_migrations_table().await?;
        let current_version = self.get_current_version().await?;

        let mut applied = 0;
        for migration in migrations.iter().filter(|m| m.version > current_version) {
            self.apply_migration(migration).await?;
            applied += 1;
        }

        if applied > 0 {
            info!(applied, from_version = current_version, "applied schema migrations");
        }
        Ok(applied)
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                description TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MigrationError::ExecutionError { version: 0, source: e })?;
        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await
                .map_err(MigrationError::VersionCheckError)?;
        Ok(version)
    }

    /// Run one migration and record its version in the same transaction.
    async fn apply_migration(&self, migration: &Migration) -> Result<(), MigrationError> {
        let version = migration.version;
        let err = |source| MigrationError::ExecutionError { version, source };

        let mut tx = self.pool.begin().await.map_err(err)?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(err)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;

        debug!(version, description = migration.description, "migration applied");
        Ok(())
    }
}

pub fn all_embedded_migrations() -> &'static [Migration] {
    const MIGRATIONS: &[Migration] = &[
        Migration {
            version: 1,
            description: "Reputation records",
            sql: include_str!("../../../migrations/001_reputation.sql"),
        },
        Migration {
            version: 2,
            description: "Outcome history",
            sql: include_str!("../../../migrations/002_outcome_history.sql"),
        },
    ];
    MIGRATIONS
}
