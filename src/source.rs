use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::CertificateRecord;

/// Read access to the certificate table, scoped to one owner.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// `Ok(None)` means the store answered without data; callers treat it as
    /// an empty record set.
    async fn certificates_for(
        &self,
        owner_id: Uuid,
    ) -> anyhow::Result<Option<Vec<CertificateRecord>>>;
}

/// Maps a session token to the owner it was issued for.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve_session(&self, token: &str) -> anyhow::Result<Option<Uuid>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordSource for PgStore {
    async fn certificates_for(
        &self,
        owner_id: Uuid,
    ) -> anyhow::Result<Option<Vec<CertificateRecord>>> {
        db::fetch_certificates(&self.pool, owner_id).await.map(Some)
    }
}

#[async_trait]
impl IdentityProvider for PgStore {
    async fn resolve_session(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        db::resolve_session(&self.pool, token).await
    }
}

#[cfg(test)]
pub use memory::MemoryStore;
