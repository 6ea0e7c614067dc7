use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::insights::{self, MonthBucket};
use crate::models::{Audience, CertificateRecord, Dashboard};
use crate::source::{IdentityProvider, RecordSource};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("no signed-in user for this session")]
    NotSignedIn,

    #[error("record source failed: {0}")]
    Source(#[from] anyhow::Error),
}

async fn load(
    source: &dyn RecordSource,
    owner_id: Uuid,
    audience: Audience,
    bucket: MonthBucket,
) -> Result<Dashboard, DashboardError> {
    let records = source.certificates_for(owner_id).await?.unwrap_or_default();
    debug!(%owner_id, records = records.len(), "aggregating certificates");
    Ok(insights::summarize(owner_id, &records, audience, bucket))
}

/// Public dashboard for whatever owner identifier the caller supplies.
pub async fn load_public(
    source: &dyn RecordSource,
    owner_id: Uuid,
    bucket: MonthBucket,
) -> Result<Dashboard, DashboardError> {
    load(source, owner_id, Audience::Public, bucket).await
}

pub async fn load_private(
    identity: &dyn IdentityProvider,
    source: &dyn RecordSource,
    session_token: &str,
    bucket: MonthBucket,
) -> Result<Dashboard, DashboardError> {
    let owner_id = identity
        .resolve_session(session_token)
        .await?
        .ok_or(DashboardError::NotSignedIn)?;
    load(source, owner_id, Audience::Private, bucket).await
}

/// The signed-in user's certificates, newest first. Undated rows go last.
pub async fn load_gallery(
    identity: &dyn IdentityProvider,
    source: &dyn RecordSource,
    session_token: &str,
) -> Result<Vec<CertificateRecord>, DashboardError> {
    let owner_id = identity
        .resolve_session(session_token)
        .await?
        .ok_or(DashboardError::NotSignedIn)?;

    let mut certificates = source.certificates_for(owner_id).await?.unwrap_or_default();
    certificates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(certificates)
}

/// Link handed out by the private dashboard's share button.
pub fn share_link(base_url: &str, owner_id: Uuid) -> String {
    format!("{}/public-dashboard/{owner_id}", base_url.trim_end_matches('/'))
}

/// State of one open dashboard. Holds the last good result and replaces it
/// only with a complete, uncancelled refresh.
pub struct DashboardView {
    source: Arc<dyn RecordSource>,
    owner_id: Uuid,
    audience: Audience,
    bucket: MonthBucket,
    current: Option<Dashboard>,
}

impl DashboardView {
    pub fn public(source: Arc<dyn RecordSource>, owner_id: Uuid, bucket: MonthBucket) -> Self {
        Self {
            source,
            owner_id,
            audience: Audience::Public,
            bucket,
            current: None,
        }
    }

    pub async fn private(
        identity: &dyn IdentityProvider,
        source: Arc<dyn RecordSource>,
        session_token: &str,
        bucket: MonthBucket,
    ) -> Result<Self, DashboardError> {
        let owner_id = identity
            .resolve_session(session_token)
            .await?
            .ok_or(DashboardError::NotSignedIn)?;

        Ok(Self {
            source,
            owner_id,
            audience: Audience::Private,
            bucket,
            current: None,
        })
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn current(&self) -> Option<&Dashboard> {
        self.current.as_ref()
    }

    /// Returns whether the held dashboard was replaced.
    pub async fn refresh(&mut self, cancel: &CancellationToken) -> bool {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(owner_id = %self.owner_id, "refresh cancelled");
                return false;
            }
            result = load(self.source.as_ref(), self.owner_id, self.audience, self.bucket) => result,
        };

        if cancel.is_cancelled() {
            debug!(owner_id = %self.owner_id, "view closed before refresh finished");
            return false;
        }

        match fetched {
            Ok(dashboard) => {
                self.current = Some(dashboard);
                true
            }
            Err(e) => {
                warn!(owner_id = %self.owner_id, "keeping previous dashboard: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::CertificateRecord;
    use crate::source::MemoryStore;

    fn record(owner_id: Uuid, skills: &str) -> CertificateRecord {
        CertificateRecord {
            id: Uuid::new_v4(),
            owner_id,
            title: "Certificate".to_string(),
            file_url: Some("certificates/file.pdf".to_string()),
            skills: Some(skills.to_string()),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single(),
        }
    }

    struct FlakySource {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    #[async_trait]
    impl RecordSource for FlakySource {
        async fn certificates_for(
            &self,
            owner_id: Uuid,
        ) -> anyhow::Result<Option<Vec<CertificateRecord>>> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("connection reset");
            }
            self.inner.certificates_for(owner_id).await
        }
    }

    struct StalledSource;

    #[async_trait]
    impl RecordSource for StalledSource {
        async fn certificates_for(
            &self,
            _owner_id: Uuid,
        ) -> anyhow::Result<Option<Vec<CertificateRecord>>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn private_dashboard_requires_a_session() {
        let store = MemoryStore::new();
        let result = load_private(&store, &store, "missing", MonthBucket::MonthOnly).await;
        assert!(matches!(result, Err(DashboardError::NotSignedIn)));
    }

    #[tokio::test]
    async fn private_dashboard_reads_the_session_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.open_session("session", owner);
        store.insert(record(owner, "AWS, Cloud"));
        store.insert(record(owner, "Cloud"));
        store.insert(record(Uuid::new_v4(), "Python"));

        let dashboard = load_private(&store, &store, "session", MonthBucket::MonthOnly)
            .await
            .unwrap();
        assert_eq!(dashboard.owner_id, owner);
        assert_eq!(dashboard.audience, Audience::Private);
        assert_eq!(dashboard.summary.total_certificates, 2);
        assert_eq!(dashboard.summary.strongest_skill, "Cloud");
    }

    #[tokio::test]
    async fn public_dashboard_treats_missing_data_as_empty() {
        let store = MemoryStore::new();
        let dashboard = load_public(&store, Uuid::new_v4(), MonthBucket::MonthOnly)
            .await
            .unwrap();

        assert_eq!(dashboard.audience, Audience::Public);
        assert_eq!(dashboard.summary.total_certificates, 0);
        assert_eq!(dashboard.summary.strongest_skill, "N/A");
        assert_eq!(dashboard.summary.ai_summary, "No certificates uploaded yet.");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_dashboard() {
        let owner = Uuid::new_v4();
        let source = Arc::new(FlakySource {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        });
        source.inner.insert(record(owner, "Rust"));

        let mut view = DashboardView::public(source.clone(), owner, MonthBucket::MonthOnly);
        let cancel = CancellationToken::new();
        assert!(view.refresh(&cancel).await);

        source.failing.store(true, Ordering::SeqCst);
        source.inner.insert(record(owner, "Go"));
        assert!(!view.refresh(&cancel).await);

        let current = view.current().unwrap();
        assert_eq!(current.summary.total_certificates, 1);
        assert_eq!(current.summary.strongest_skill, "Rust");
    }

    #[tokio::test]
    async fn cancelled_refresh_never_updates_state() {
        let mut view =
            DashboardView::public(Arc::new(StalledSource), Uuid::new_v4(), MonthBucket::MonthOnly);
        let cancel = CancellationToken::new();
        let closer = cancel.clone();

        let handle = tokio::spawn(async move {
            let updated = view.refresh(&cancel).await;
            (updated, view.current().is_none())
        });
        closer.cancel();

        let (updated, still_empty) = handle.await.unwrap();
        assert!(!updated);
        assert!(still_empty);
    }

    #[tokio::test]
    async fn private_view_binds_to_session_owner() {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        store.open_session("session", owner);
        store.insert(record(owner, "Docker"));

        let mut view =
            DashboardView::private(&*store, store.clone(), "session", MonthBucket::MonthOnly)
                .await
                .unwrap();
        assert_eq!(view.owner_id(), owner);
        assert!(view.refresh(&CancellationToken::new()).await);
        assert_eq!(view.current().unwrap().summary.strongest_skill, "Docker");
    }

    #[tokio::test]
    async fn gallery_lists_own_certificates_newest_first() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.open_session("session", owner);

        let mut older = record(owner, "AWS");
        older.title = "Cloud Practitioner".to_string();
        older.created_at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single();
        let mut undated = record(owner, "Docker");
        undated.title = "Docker Basics".to_string();
        undated.created_at = None;
        let mut newer = record(owner, "Terraform");
        newer.title = "Terraform Associate".to_string();
        newer.created_at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).single();

        store.insert(older);
        store.insert(undated);
        store.insert(newer);
        store.insert(record(Uuid::new_v4(), "Python"));

        let gallery = load_gallery(&store, &store, "session").await.unwrap();
        let titles: Vec<&str> = gallery.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Terraform Associate", "Cloud Practitioner", "Docker Basics"]
        );
        assert!(gallery.iter().all(|c| c.owner_id == owner));
    }

    #[tokio::test]
    async fn gallery_requires_a_session() {
        let store = MemoryStore::new();
        let result = load_gallery(&store, &store, "missing").await;
        assert!(matches!(result, Err(DashboardError::NotSignedIn)));
    }

    #[test]
    fn share_link_embeds_owner_id() {
        let owner = Uuid::parse_str("6b1f4c1e-8a53-4d1f-9c3e-2f5a7d9e0b41").unwrap();
        assert_eq!(
            share_link("https://certfolio.dev/", owner),
            "https://certfolio.dev/public-dashboard/6b1f4c1e-8a53-4d1f-9c3e-2f5a7d9e0b41"
        );
    }
}
