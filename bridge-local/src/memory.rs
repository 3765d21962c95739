//! In-memory service implementations

use async_trait::async_trait;
use bridge_traits::{
    asset::{AssetManager, Property, Snapshot, SnapshotQuery},
    error::{BridgeError, Result},
    registry::{Job, JobStatus, ServiceRegistry},
    series::{AccessControlList, SeriesService},
};
use chrono::Utc;
use core_mediapackage::MediaPackage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

// =============================================================================
// Series
// =============================================================================

#[derive(Debug, Clone)]
struct SeriesEntry {
    catalog: String,
    acl: AccessControlList,
}

/// Series service over a map of series id to Dublin Core catalog and ACL
#[derive(Default)]
pub struct InMemorySeriesService {
    series: RwLock<HashMap<String, SeriesEntry>>,
}

impl InMemorySeriesService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_series(
        &self,
        series_id: impl Into<String>,
        catalog: impl Into<String>,
        acl: AccessControlList,
    ) {
        self.series.write().await.insert(
            series_id.into(),
            SeriesEntry {
                catalog: catalog.into(),
                acl,
            },
        );
    }
}

#[async_trait]
impl SeriesService for InMemorySeriesService {
    async fn get_series(&self, series_id: &str) -> Result<String> {
        self.series
            .read()
            .await
            .get(series_id)
            .map(|entry| entry.catalog.clone())
            .ok_or_else(|| BridgeError::NotFound(format!("series {}", series_id)))
    }

    async fn get_series_access_control(&self, series_id: &str) -> Result<AccessControlList> {
        self.series
            .read()
            .await
            .get(series_id)
            .map(|entry| entry.acl.clone())
            .ok_or_else(|| BridgeError::NotFound(format!("series {}", series_id)))
    }
}

// =============================================================================
// Asset manager
// =============================================================================

/// Asset manager keeping every snapshot in memory
#[derive(Default)]
pub struct InMemoryAssetManager {
    snapshots: RwLock<Vec<Snapshot>>,
    properties: RwLock<Vec<Property>>,
}

impl InMemoryAssetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn properties(&self, media_package_id: &str) -> Vec<Property> {
        self.properties
            .read()
            .await
            .iter()
            .filter(|p| p.media_package_id == media_package_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AssetManager for InMemoryAssetManager {
    async fn take_snapshot(&self, owner: &str, media_package: &MediaPackage) -> Result<Snapshot> {
        let mut snapshots = self.snapshots.write().await;
        let version = snapshots
            .iter()
            .filter(|s| s.media_package.identifier() == media_package.identifier())
            .map(|s| s.version + 1)
            .max()
            .unwrap_or(0);
        let snapshot = Snapshot {
            version,
            owner: owner.to_string(),
            archival_date: Utc::now(),
            media_package: media_package.clone(),
        };
        snapshots.push(snapshot.clone());
        debug!(
            media_package = %media_package.identifier(),
            version,
            owner,
            "Took snapshot"
        );
        Ok(snapshot)
    }

    async fn find_snapshots(&self, query: SnapshotQuery) -> Result<Vec<Snapshot>> {
        let mut found: Vec<Snapshot> = self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(found)
    }

    async fn set_property(&self, property: Property) -> Result<bool> {
        let archived = self
            .snapshots
            .read()
            .await
            .iter()
            .any(|s| s.media_package.identifier() == property.media_package_id);
        if !archived {
            return Ok(false);
        }

        let mut properties = self.properties.write().await;
        properties.retain(|p| {
            !(p.media_package_id == property.media_package_id
                && p.namespace == property.namespace
                && p.name == property.name)
        });
        properties.push(property);
        Ok(true)
    }

    async fn find_properties(&self, media_package_id: &str, namespace: &str) -> Result<Vec<Property>> {
        Ok(self
            .properties
            .read()
            .await
            .iter()
            .filter(|p| p.media_package_id == media_package_id && p.namespace == namespace)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Service registry
// =============================================================================

/// Job registry for services running in the same process
pub struct InMemoryServiceRegistry {
    jobs: RwLock<HashMap<u64, Job>>,
    next_id: AtomicU64,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new job and returns it with its assigned id.
    pub async fn create_job(
        &self,
        job_type: &str,
        operation: &str,
        status: JobStatus,
        payload: Option<String>,
    ) -> Job {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut job = Job::new(id, job_type, operation).with_status(status);
        job.payload = payload;
        self.jobs.write().await.insert(id, job.clone());
        debug!(job = id, job_type, operation, status = ?status, "Created job");
        job
    }
}

impl Default for InMemoryServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryServiceRegistry {
    async fn get_job(&self, id: u64) -> Result<Job> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("job {}", id)))
    }

    async fn update_job(&self, job: Job) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&job.id) {
            return Err(BridgeError::NotFound(format!("job {}", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::series::AccessControlEntry;

    #[tokio::test]
    async fn test_series_lookup() {
        let service = InMemorySeriesService::new();
        let acl = AccessControlList::new(vec![AccessControlEntry::new("ROLE_USER", "read", true)]);
        service.insert_series("s1", "<dublincore/>", acl.clone()).await;

        assert_eq!(service.get_series("s1").await.unwrap(), "<dublincore/>");
        assert_eq!(service.get_series_access_control("s1").await.unwrap(), acl);
        assert!(matches!(
            service.get_series("missing").await,
            Err(BridgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_versions() {
        let assets = InMemoryAssetManager::new();
        let mut mp = MediaPackage::with_id("mp");
        let first = assets.take_snapshot("test", &mp).await.unwrap();
        mp.set_title(Some("changed".to_string()));
        let second = assets.take_snapshot("test", &mp).await.unwrap();
        assets
            .take_snapshot("test", &MediaPackage::with_id("other"))
            .await
            .unwrap();

        assert_eq!(first.version, 0);
        assert_eq!(second.version, 1);

        let found = assets
            .find_snapshots(SnapshotQuery::for_media_package("mp"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].version, 1);
        assert_eq!(found[0].media_package.title(), Some("changed"));

        let exact = assets
            .find_snapshots(SnapshotQuery::for_media_package("mp").with_version(0))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].media_package.title(), None);
    }

    #[tokio::test]
    async fn test_properties_require_archived_package() {
        let assets = InMemoryAssetManager::new();
        let property = Property {
            media_package_id: "mp".to_string(),
            namespace: "org.test".to_string(),
            name: "state".to_string(),
            value: "done".to_string(),
        };
        assert!(!assets.set_property(property.clone()).await.unwrap());

        assets
            .take_snapshot("test", &MediaPackage::with_id("mp"))
            .await
            .unwrap();
        assert!(assets.set_property(property.clone()).await.unwrap());
        assert!(assets.set_property(property).await.unwrap());
        assert_eq!(assets.properties("mp").await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_properties_by_namespace() {
        let assets = InMemoryAssetManager::new();
        assets
            .take_snapshot("test", &MediaPackage::with_id("mp"))
            .await
            .unwrap();
        for (namespace, name) in [("org.test", "state"), ("org.test", "owner"), ("org.other", "state")] {
            let property = Property {
                media_package_id: "mp".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                value: "x".to_string(),
            };
            assert!(assets.set_property(property).await.unwrap());
        }

        let found = assets.find_properties("mp", "org.test").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.namespace == "org.test"));
        assert!(assets.find_properties("other", "org.test").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let registry = InMemoryServiceRegistry::new();
        let job = registry
            .create_job("distribution", "distribute", JobStatus::Running, None)
            .await;
        assert_eq!(registry.get_job(job.id).await.unwrap().status, JobStatus::Running);

        let finished = job.with_status(JobStatus::Finished).with_payload("<elements/>");
        registry.update_job(finished).await.unwrap();
        let stored = registry.get_job(1).await.unwrap();
        assert!(stored.status.is_terminal());
        assert_eq!(stored.payload.as_deref(), Some("<elements/>"));

        assert!(registry.get_job(99).await.is_err());
    }
}
