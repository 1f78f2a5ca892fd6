use async_trait::async_trait;
use ais_domain::{Cluster, ClusterId, Event, Host, HostId, InfraEnv, InfraEnvId, Manifest, ManifestFolder};
use sqlx::PgPool;

use crate::error::StoreError;
use crate::store::StateStore;

// DDL — idempotent; run at every startup via migrate().
const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS clusters (
    id         UUID PRIMARY KEY,
    state      JSONB NOT NULL,
    revision   BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS hosts (
    id            UUID PRIMARY KEY,
    cluster_id    UUID,
    infra_env_id  UUID NOT NULL,
    state         JSONB NOT NULL,
    revision      BIGINT NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_hosts_cluster ON hosts (cluster_id) WHERE cluster_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_hosts_infra_env ON hosts (infra_env_id);

CREATE TABLE IF NOT EXISTS infra_envs (
    id         UUID PRIMARY KEY,
    state      JSONB NOT NULL,
    revision   BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS events (
    seq         BIGSERIAL PRIMARY KEY,
    cluster_id  UUID,
    event       JSONB NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_events_cluster
    ON events (cluster_id) WHERE cluster_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS manifests (
    cluster_id UUID NOT NULL,
    folder     TEXT NOT NULL,
    filename   TEXT NOT NULL,
    contents   TEXT NOT NULL,
    PRIMARY KEY (cluster_id, folder, filename)
);
"#;

/// Persistent state store backed by a PostgreSQL database.
///
/// All tables are created automatically on first connect via
/// [`SqlStore::connect`]. Each entity is stored as a JSONB blob plus a
/// `revision` column checked by every conditional update.
#[derive(Clone)]
pub struct SqlStore {
    pool: PgPool,
}

impl SqlStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(url)
            .await
            .map_err(|e| StoreError::Internal(format!("postgres connect: {e}")))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(MIGRATIONS)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(format!("migration: {e}")))?;
        Ok(())
    }
}

fn to_json<T: serde::Serialize>(v: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(v).map_err(StoreError::Serialization)
}

fn from_json<T: serde::de::DeserializeOwned>(v: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(v).map_err(StoreError::Serialization)
}

#[async_trait]
impl StateStore for SqlStore {
    // ── Clusters ──────────────────────────────────────────────────────────────

    async fn get_cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM clusters WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM clusters ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn insert_cluster(&self, cluster: Cluster) -> Result<(), StoreError> {
        let json = to_json(&cluster)?;
        sqlx::query("INSERT INTO clusters (id, state, revision) VALUES ($1, $2::jsonb, $3)")
            .bind(cluster.id.as_uuid())
            .bind(&json)
            .bind(cluster.revision as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn update_cluster(&self, cluster: Cluster) -> Result<(), StoreError> {
        let mut next = cluster.clone();
        next.revision += 1;
        let json = to_json(&next)?;
        let result = sqlx::query(
            "UPDATE clusters SET state = $1::jsonb, revision = $2, updated_at = NOW()
             WHERE id = $3 AND revision = $4",
        )
        .bind(&json)
        .bind(next.revision as i64)
        .bind(cluster.id.as_uuid())
        .bind(cluster.revision as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            let current = self
                .get_cluster(cluster.id)
                .await?
                .ok_or_else(|| StoreError::ClusterNotFound(cluster.id.to_string()))?;
            return Err(StoreError::Conflict { expected: cluster.revision, actual: current.revision });
        }
        Ok(())
    }

    async fn delete_cluster(&self, id: ClusterId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM clusters WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    // ── Hosts ─────────────────────────────────────────────────────────────────

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, StoreError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM hosts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn list_hosts_for_cluster(&self, cluster_id: ClusterId) -> Result<Vec<Host>, StoreError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM hosts WHERE cluster_id = $1 ORDER BY id")
                .bind(cluster_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn list_hosts_for_infra_env(&self, infra_env_id: InfraEnvId) -> Result<Vec<Host>, StoreError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM hosts WHERE infra_env_id = $1 ORDER BY id")
                .bind(infra_env_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn insert_host(&self, host: Host) -> Result<(), StoreError> {
        let json = to_json(&host)?;
        sqlx::query(
            "INSERT INTO hosts (id, cluster_id, infra_env_id, state, revision) VALUES ($1, $2, $3, $4::jsonb, $5)",
        )
        .bind(host.id.as_uuid())
        .bind(host.cluster_id.map(|c| c.as_uuid()))
        .bind(host.infra_env_id.as_uuid())
        .bind(&json)
        .bind(host.revision as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn update_host(&self, host: Host) -> Result<(), StoreError> {
        let mut next = host.clone();
        next.revision += 1;
        let json = to_json(&next)?;
        let result = sqlx::query(
            "UPDATE hosts SET cluster_id = $1, state = $2::jsonb, revision = $3, updated_at = NOW()
             WHERE id = $4 AND revision = $5",
        )
        .bind(next.cluster_id.map(|c| c.as_uuid()))
        .bind(&json)
        .bind(next.revision as i64)
        .bind(host.id.as_uuid())
        .bind(host.revision as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            let current = self
                .get_host(host.id)
                .await?
                .ok_or_else(|| StoreError::HostNotFound(host.id.to_string()))?;
            return Err(StoreError::Conflict { expected: host.revision, actual: current.revision });
        }
        Ok(())
    }

    async fn delete_host(&self, id: HostId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM hosts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    // ── Infra-envs ────────────────────────────────────────────────────────────

    async fn get_infra_env(&self, id: InfraEnvId) -> Result<Option<InfraEnv>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT state FROM infra_envs WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?;
        row.map(|(v,)| from_json(v)).transpose()
    }

    async fn list_infra_envs(&self) -> Result<Vec<InfraEnv>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as("SELECT state FROM infra_envs ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        rows.into_iter().map(|(v,)| from_json(v)).collect()
    }

    async fn insert_infra_env(&self, infra_env: InfraEnv) -> Result<(), StoreError> {
        let json = to_json(&infra_env)?;
        sqlx::query("INSERT INTO infra_envs (id, state, revision) VALUES ($1, $2::jsonb, $3)")
            .bind(infra_env.id.as_uuid())
            .bind(&json)
            .bind(infra_env.revision as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn update_infra_env(&self, infra_env: InfraEnv) -> Result<(), StoreError> {
        let mut next = infra_env.clone();
        next.revision += 1;
        let json = to_json(&next)?;
        let result = sqlx::query(
            "UPDATE infra_envs SET state = $1::jsonb, revision = $2, updated_at = NOW()
             WHERE id = $3 AND revision = $4",
        )
        .bind(&json)
        .bind(next.revision as i64)
        .bind(infra_env.id.as_uuid())
        .bind(infra_env.revision as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;

        if result.rows_affected() == 0 {
            let current = self
                .get_infra_env(infra_env.id)
                .await?
                .ok_or_else(|| StoreError::InfraEnvNotFound(infra_env.id.to_string()))?;
            return Err(StoreError::Conflict { expected: infra_env.revision, actual: current.revision });
        }
        Ok(())
    }

    async fn delete_infra_env(&self, id: InfraEnvId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM infra_envs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    // ── Events ────────────────────────────────────────────────────────────────

    async fn append_event(&self, event: Event) -> Result<(), StoreError> {
        let json = to_json(&event)?;
        sqlx::query("INSERT INTO events (cluster_id, event, occurred_at) VALUES ($1, $2::jsonb, NOW())")
            .bind(event.cluster_id.map(|c| c.as_uuid()))
            .bind(&json)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_events(
        &self,
        cluster_id: Option<ClusterId>,
        limit: u32,
    ) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<(serde_json::Value,)> = match cluster_id {
            Some(cid) => sqlx::query_as(
                "SELECT event FROM events WHERE cluster_id = $1 ORDER BY seq DESC LIMIT $2",
            )
            .bind(cid.as_uuid())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?,
            None => sqlx::query_as("SELECT event FROM events ORDER BY seq DESC LIMIT $1")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Internal(e.to_string()))?,
        };
        let mut events: Vec<Event> = rows.into_iter().map(|(v,)| from_json(v)).collect::<Result<_, _>>()?;
        events.reverse();
        Ok(events)
    }

    // ── Manifests ─────────────────────────────────────────────────────────────

    async fn put_manifest(&self, manifest: Manifest) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO manifests (cluster_id, folder, filename, contents) VALUES ($1, $2, $3, $4)
             ON CONFLICT (cluster_id, folder, filename) DO UPDATE SET contents = EXCLUDED.contents",
        )
        .bind(manifest.cluster_id.as_uuid())
        .bind(manifest.folder.to_string())
        .bind(&manifest.filename)
        .bind(&manifest.contents)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_manifests(&self, cluster_id: ClusterId) -> Result<Vec<Manifest>, StoreError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT folder, filename, contents FROM manifests WHERE cluster_id = $1 ORDER BY folder, filename",
        )
        .bind(cluster_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?;

        rows.into_iter()
            .map(|(folder, filename, contents)| {
                let folder = match folder.as_str() {
                    "openshift" => ManifestFolder::Openshift,
                    _ => ManifestFolder::Manifests,
                };
                Ok(Manifest { cluster_id, folder, filename, contents })
            })
            .collect()
    }

    async fn delete_manifest(
        &self,
        cluster_id: ClusterId,
        folder: ManifestFolder,
        filename: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM manifests WHERE cluster_id = $1 AND folder = $2 AND filename = $3")
            .bind(cluster_id.as_uuid())
            .bind(folder.to_string())
            .bind(filename)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }
}
