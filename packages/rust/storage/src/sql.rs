//! libSQL-backed artifact store (single database file, offline mode).

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database, params};
use tracing::info;

use outreach_shared::{OutreachError, Result};

use crate::artifact::ArtifactKey;
use crate::migrations;
use crate::store::ArtifactStore;

/// Artifact store wrapping a local libSQL database.
pub struct SqlStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl SqlStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OutreachError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    OutreachError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl ArtifactStore for SqlStore {
    async fn exists(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(self.load(key).await?.is_some())
    }

    async fn load(&self, key: &ArtifactKey) -> Result<Option<String>> {
        let workspace = key.workspace.key();
        let mut rows = self
            .conn
            .query(
                "SELECT body FROM artifacts WHERE workspace = ?1 AND name = ?2",
                params![workspace.as_str(), key.name.as_str()],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| OutreachError::Storage(e.to_string()))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(OutreachError::Storage(e.to_string())),
        }
    }

    async fn store(&self, key: &ArtifactKey, body: &str) -> Result<()> {
        let workspace = key.workspace.key();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO artifacts (workspace, name, body, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(workspace, name) DO UPDATE SET
                    body = excluded.body,
                    created_at = excluded.created_at",
                params![workspace.as_str(), key.name.as_str(), body, now.as_str()],
            )
            .await
            .map_err(|e| OutreachError::Storage(e.to_string()))?;
        Ok(())
    }
}
