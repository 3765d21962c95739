//! Distribution to local directories

use async_trait::async_trait;
use bridge_traits::{
    distribution::DistributionService,
    error::{BridgeError, Result},
    registry::{Job, JobStatus},
    workspace::Workspace,
};
use core_mediapackage::{MediaPackage, MediaPackageElement, MediaPackageParser};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

use crate::memory::InMemoryServiceRegistry;

pub const JOB_TYPE: &str = "org.opencastproject.distribution.local";

/// Copies element files to `<root>/<channel>/<media package>/<element>/`
///
/// Jobs complete synchronously and are registered as finished, with the
/// distributed elements as payload.
pub struct LocalDistributionService {
    root: PathBuf,
    workspace: Arc<dyn Workspace>,
    registry: Arc<InMemoryServiceRegistry>,
}

impl LocalDistributionService {
    pub fn new(
        root: PathBuf,
        workspace: Arc<dyn Workspace>,
        registry: Arc<InMemoryServiceRegistry>,
    ) -> Self {
        Self {
            root,
            workspace,
            registry,
        }
    }

    fn target_dir(&self, channel_id: &str, media_package_id: &str, element_id: &str) -> PathBuf {
        self.root
            .join(channel_id)
            .join(media_package_id)
            .join(element_id)
    }

    /// Directory of an element that was distributed to `channel_id`, based
    /// on its published location.
    fn published_dir(&self, channel_id: &str, element: &MediaPackageElement) -> Option<PathBuf> {
        let path = element.uri()?.to_file_path().ok()?;
        let dir = path.parent()?;
        dir.starts_with(self.root.join(channel_id))
            .then(|| dir.to_path_buf())
    }

    async fn distribute_element(
        &self,
        channel_id: &str,
        media_package: &MediaPackage,
        element: &MediaPackageElement,
        check_availability: bool,
    ) -> Result<MediaPackageElement> {
        let element_id = element.identifier().unwrap_or_default();
        let source = element.uri().ok_or_else(|| {
            BridgeError::OperationFailed(format!("Element {} has no location", element_id))
        })?;
        let data = self.workspace.read(source).await?;

        let dir = self.target_dir(channel_id, media_package.identifier(), element_id);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name(source, element_id));
        fs::write(&path, data.as_ref()).await?;

        if check_availability && !fs::try_exists(&path).await? {
            return Err(BridgeError::OperationFailed(format!(
                "Distributed file {} is not available",
                path.display()
            )));
        }

        let uri = Url::from_file_path(&path).map_err(|_| {
            BridgeError::OperationFailed(format!("Cannot build URI for {}", path.display()))
        })?;
        let mut distributed = element.clone();
        distributed.set_uri(Some(uri));
        debug!(
            channel = channel_id,
            element = element_id,
            path = ?path,
            "Distributed element"
        );
        Ok(distributed)
    }

    async fn finished_job(&self, operation: &str, elements: &[MediaPackageElement]) -> Result<Job> {
        let payload = MediaPackageParser::elements_to_xml(elements)?;
        Ok(self
            .registry
            .create_job(JOB_TYPE, operation, JobStatus::Finished, Some(payload))
            .await)
    }
}

/// Last path segment of `uri`, or `fallback` when there is none.
fn file_name(uri: &Url, fallback: &str) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Looks up `id` among the elements of `media_package` and its publications.
fn find_element<'a>(media_package: &'a MediaPackage, id: &str) -> Option<&'a MediaPackageElement> {
    media_package.element_by_id(id).or_else(|| {
        media_package
            .publications()
            .into_iter()
            .filter_map(|p| p.as_publication())
            .flat_map(|p| p.elements())
            .find(|e| e.identifier() == Some(id))
    })
}

#[async_trait]
impl DistributionService for LocalDistributionService {
    async fn distribute(
        &self,
        channel_id: &str,
        media_package: &MediaPackage,
        element_ids: &[String],
        check_availability: bool,
    ) -> Result<Job> {
        let mut distributed = Vec::with_capacity(element_ids.len());
        for id in element_ids {
            let element = media_package.element_by_id(id).ok_or_else(|| {
                BridgeError::NotFound(format!(
                    "element {} of media package {}",
                    id,
                    media_package.identifier()
                ))
            })?;
            distributed.push(
                self.distribute_element(channel_id, media_package, element, check_availability)
                    .await?,
            );
        }
        info!(
            channel = channel_id,
            media_package = %media_package.identifier(),
            count = distributed.len(),
            "Distributed elements"
        );
        self.finished_job("distribute", &distributed).await
    }

    async fn retract(
        &self,
        channel_id: &str,
        media_package: &MediaPackage,
        element_ids: &[String],
    ) -> Result<Job> {
        let mut retracted = Vec::new();
        for id in element_ids {
            let element = find_element(media_package, id);
            let dir = element
                .and_then(|e| self.published_dir(channel_id, e))
                .unwrap_or_else(|| self.target_dir(channel_id, media_package.identifier(), id));
            match fs::remove_dir_all(&dir).await {
                Ok(()) => debug!(channel = channel_id, element = %id, "Retracted element"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(channel = channel_id, element = %id, "Element was not distributed")
                }
                Err(e) => return Err(e.into()),
            }
            if let Some(element) = element {
                retracted.push(element.clone());
            }
        }
        info!(
            channel = channel_id,
            media_package = %media_package.identifier(),
            count = retracted.len(),
            "Retracted elements"
        );
        self.finished_job("retract", &retracted).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::FilesystemWorkspace;
    use bridge_traits::ServiceRegistry;
    use bytes::Bytes;
    use std::env;

    async fn setup() -> (LocalDistributionService, Arc<InMemoryServiceRegistry>, MediaPackage) {
        let root = env::temp_dir()
            .join("bridge-local-tests")
            .join(format!("distribution-{}", uuid::Uuid::new_v4()));
        let workspace = Arc::new(FilesystemWorkspace::in_directory(&root));
        let registry = Arc::new(InMemoryServiceRegistry::new());

        let mut mp = MediaPackage::with_id("mp");
        let uri = workspace
            .put("mp", "track-1", "video.mp4", Bytes::from("video"))
            .await
            .unwrap();
        let mut track = MediaPackageElement::track(uri);
        track.set_identifier(Some("track-1".to_string()));
        mp.add(track);

        let service =
            LocalDistributionService::new(root.join("published"), workspace, registry.clone());
        (service, registry, mp)
    }

    #[tokio::test]
    async fn test_distribute_registers_finished_job() {
        let (service, registry, mp) = setup().await;
        let job = service
            .distribute("engage", &mp, &["track-1".to_string()], true)
            .await
            .unwrap();

        let stored = registry.get_job(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Finished);

        let elements = MediaPackageParser::elements_from_xml(stored.payload.as_deref().unwrap()).unwrap();
        assert_eq!(elements.len(), 1);
        let uri = elements[0].uri().unwrap();
        assert!(uri.path().contains("/published/engage/mp/track-1/video.mp4"));
        assert!(uri.to_file_path().unwrap().exists());
    }

    #[tokio::test]
    async fn test_distribute_unknown_element_fails() {
        let (service, _, mp) = setup().await;
        let result = service
            .distribute("engage", &mp, &["missing".to_string()], false)
            .await;
        assert!(matches!(result, Err(BridgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_retract_removes_files() {
        let (service, _, mp) = setup().await;
        let job = service
            .distribute("engage", &mp, &["track-1".to_string()], false)
            .await
            .unwrap();
        let elements = MediaPackageParser::elements_from_xml(job.payload.as_deref().unwrap()).unwrap();
        let path = elements[0].uri().unwrap().to_file_path().unwrap();

        let job = service
            .retract("engage", &mp, &["track-1".to_string()])
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Finished);
        assert!(!path.exists());
    }
}
