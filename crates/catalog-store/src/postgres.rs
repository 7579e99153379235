//! Postgres-backed [`MetadataStore`].
//!
//! Update payloads are stored as JSONB (the tagged `Update` enum serializes
//! with a `update_type` discriminator, so the loader selects the concrete
//! variant by that tag rather than by structural sniffing, per the
//! JSON-polymorphism design note) alongside the raw canonical XML stream.
//! Anchors live in a second, trivially small table. Unlike the runtime store
//! this crate's teacher used for torrent state, there is no stored-procedure
//! layer here: the schema is a single append-only payload table plus a
//! one-row-per-scope anchor table, so plain parameterized queries are
//! clearer than wrapping them in procedures.

use async_trait::async_trait;
use catalog_core::identity::PackageIdentity;
use catalog_core::update::Update;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::{AnchorScope, MetadataStore};

/// Database-backed repository for update payloads and sync anchors.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct UpdateRow {
    payload: serde_json::Value,
    xml: String,
}

impl PgMetadataStore {
    /// Initialise the store against `pool`, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail to apply.
    pub async fn new(pool: PgPool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::Migration)?;
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn decode_row(identity_hint: &str, row: UpdateRow) -> StoreResult<Update> {
        serde_json::from_value(row.payload).map_err(|source| StoreError::Corrupt {
            identity: identity_hint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn put(&self, update: &Update, xml: &str) -> StoreResult<()> {
        let identity = update.identity();
        let payload = serde_json::to_value(update).map_err(|source| StoreError::Corrupt {
            identity: identity.to_string(),
            source,
        })?;
        sqlx::query(
            "INSERT INTO catalog_updates (id, revision, update_type, payload, xml)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id, revision) DO NOTHING",
        )
        .bind(identity.id)
        .bind(i64::from(identity.revision))
        .bind(update_type_tag(update))
        .bind(payload)
        .bind(xml)
        .execute(&self.pool)
        .await
        .map_err(|source| StoreError::Query {
            operation: "put",
            source,
        })?;
        Ok(())
    }

    async fn get_latest(&self, id: Uuid) -> StoreResult<Option<Update>> {
        let row = sqlx::query_as::<_, UpdateRow>(
            "SELECT payload, xml FROM catalog_updates
             WHERE id = $1 ORDER BY revision DESC LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| StoreError::Query {
            operation: "get_latest",
            source,
        })?;
        row.map(|row| Self::decode_row(&id.to_string(), row)).transpose()
    }

    async fn get_revision(&self, identity: PackageIdentity) -> StoreResult<Option<Update>> {
        let row = sqlx::query_as::<_, UpdateRow>(
            "SELECT payload, xml FROM catalog_updates WHERE id = $1 AND revision = $2",
        )
        .bind(identity.id)
        .bind(i64::from(identity.revision))
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| StoreError::Query {
            operation: "get_revision",
            source,
        })?;
        row.map(|row| Self::decode_row(&identity.to_string(), row)).transpose()
    }

    async fn get_xml(&self, identity: PackageIdentity) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT xml FROM catalog_updates WHERE id = $1 AND revision = $2")
            .bind(identity.id)
            .bind(i64::from(identity.revision))
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                operation: "get_xml",
                source,
            })?;
        Ok(row.map(|row| row.get::<String, _>("xml")))
    }

    async fn contains(&self, identity: PackageIdentity) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 AS present FROM catalog_updates WHERE id = $1 AND revision = $2")
            .bind(identity.id)
            .bind(i64::from(identity.revision))
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                operation: "contains",
                source,
            })?;
        Ok(row.is_some())
    }

    async fn snapshot(&self) -> StoreResult<Vec<Update>> {
        let rows = sqlx::query_as::<_, UpdateRow>(
            "SELECT DISTINCT ON (id) payload, xml FROM catalog_updates
             ORDER BY id, revision DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| StoreError::Query {
            operation: "snapshot",
            source,
        })?;
        rows.into_iter()
            .map(|row| Self::decode_row("snapshot", row))
            .collect()
    }

    async fn get_anchor(&self, scope: &AnchorScope) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT anchor FROM catalog_anchors WHERE scope = $1")
            .bind(scope.key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                operation: "get_anchor",
                source,
            })?;
        Ok(row.map(|row| row.get::<String, _>("anchor")))
    }

    async fn commit_anchor(&self, scope: &AnchorScope, anchor: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO catalog_anchors (scope, anchor, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (scope) DO UPDATE SET anchor = EXCLUDED.anchor, updated_at = now()",
        )
        .bind(scope.key())
        .bind(anchor)
        .execute(&self.pool)
        .await
        .map_err(|source| StoreError::Query {
            operation: "commit_anchor",
            source,
        })?;
        Ok(())
    }
}

const fn update_type_tag(update: &Update) -> &'static str {
    match update {
        Update::Detectoid { .. } => "detectoid",
        Update::Classification { .. } => "classification",
        Update::Product { .. } => "product",
        Update::SoftwareUpdate { .. } => "software_update",
        Update::DriverUpdate { .. } => "driver_update",
    }
}
