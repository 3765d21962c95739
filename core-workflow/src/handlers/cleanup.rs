//! `cleanup` operation

use async_trait::async_trait;
use bridge_traits::{BridgeError, Workspace};
use core_mediapackage::{ElementType, MediaPackageElement};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::current_operation;

pub const OPERATION_ID: &str = "cleanup";
pub const PRESERVE_FLAVORS: &str = "preserve-flavors";
pub const DELETE_EXTERNAL: &str = "delete-external";
/// Seconds to wait before external files are deleted
pub const DELAY: &str = "delay";

/// Removes every element whose flavor is not preserved
///
/// Publications always stay. Files of removed elements are deleted from the
/// workspace on a best-effort basis; with `delete-external` they are also
/// removed from the shared repository after `delay` seconds.
pub struct CleanupWorkflowOperationHandler {
    workspace: Arc<dyn Workspace>,
    default_delay: Duration,
}

impl CleanupWorkflowOperationHandler {
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self {
            workspace,
            default_delay: Duration::from_secs(1),
        }
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    async fn delete_external(&self, media_package_id: &str, elements: &[MediaPackageElement]) {
        for element in elements {
            let Some(id) = element.identifier() else {
                continue;
            };
            if let Err(e) = self.workspace.delete_from_repository(media_package_id, id).await {
                warn!(
                    media_package = media_package_id,
                    element = id,
                    error = %e,
                    "Unable to delete element from repository"
                );
            }
        }
    }
}

#[async_trait]
impl WorkflowOperationHandler for CleanupWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Remove elements from the media package and the workspace"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;
        let preserved = operation.flavors_config(PRESERVE_FLAVORS)?;
        let delete_external = operation.bool_config(DELETE_EXTERNAL);
        let delay = match operation.opt_config(DELAY) {
            Some(value) => Duration::from_secs(value.parse().map_err(|_| {
                WorkflowOperationError::InvalidConfiguration(format!(
                    "{} must be a number of seconds, got '{}'",
                    DELAY, value
                ))
            })?),
            None => self.default_delay,
        };

        let mut mp = workflow.media_package().clone();
        let doomed: Vec<String> = mp
            .elements()
            .iter()
            .filter(|e| e.element_type() != ElementType::Publication)
            .filter(|e| !preserved.iter().any(|f| f.matches_opt(e.flavor())))
            .filter_map(|e| e.identifier().map(str::to_string))
            .collect();

        let removed: Vec<MediaPackageElement> =
            doomed.iter().filter_map(|id| mp.remove_by_id(id)).collect();

        if delete_external && !removed.is_empty() {
            if !delay.is_zero() {
                debug!(delay_secs = delay.as_secs(), "Waiting before deleting external files");
                tokio::time::sleep(delay).await;
            }
            self.delete_external(mp.identifier(), &removed).await;
        }

        for element in &removed {
            let Some(uri) = element.uri() else {
                continue;
            };
            match self.workspace.delete(uri).await {
                Ok(()) => {}
                Err(BridgeError::NotFound(_)) => {
                    debug!(uri = %uri, "Workspace file already gone");
                }
                Err(e) => warn!(uri = %uri, error = %e, "Unable to delete workspace file"),
            }
        }

        if preserved.is_empty() {
            if let Err(e) = self.workspace.cleanup(mp.identifier()).await {
                warn!(media_package = %mp.identifier(), error = %e, "Unable to clean up workspace");
            }
        }

        info!(
            media_package = %mp.identifier(),
            removed = removed.len(),
            remaining = mp.elements().len(),
            "Cleaned up media package"
        );
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{add_element, workflow, workspace};
    use crate::instance::WorkflowOperationInstance;
    use core_mediapackage::MediaPackage;
    use url::Url;

    #[tokio::test]
    async fn test_keeps_preserved_and_publications() {
        let workspace = workspace("cleanup");
        let mut mp = MediaPackage::with_id("mp");
        add_element(workspace.as_ref(), &mut mp, ElementType::Track, "t1", "presenter/source", &[], "video").await;
        add_element(workspace.as_ref(), &mut mp, ElementType::Track, "t2", "presenter/work", &[], "video").await;
        add_element(workspace.as_ref(), &mut mp, ElementType::Catalog, "c1", "dublincore/episode", &[], "<dc/>").await;
        mp.add(MediaPackageElement::publication(
            "pub",
            "engage",
            Url::parse("http://localhost/engage").unwrap(),
            None,
        ));
        let work_uri = mp.element_by_id("t2").unwrap().uri().unwrap().clone();

        let handler = CleanupWorkflowOperationHandler::new(workspace.clone());
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(PRESERVE_FLAVORS, "*/source, dublincore/*")
                .with_configuration(DELETE_EXTERNAL, "true")
                .with_configuration(DELAY, "0"),
        );

        let mp = handler
            .start(&wf, &JobContext::default())
            .await
            .unwrap()
            .media_package
            .unwrap();
        assert!(mp.contains_id("t1"));
        assert!(mp.contains_id("c1"));
        assert!(mp.contains_id("pub"));
        assert!(!mp.contains_id("t2"));
        assert!(workspace.get(&work_uri).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_files_are_ignored() {
        let workspace = workspace("cleanup");
        let mut mp = MediaPackage::with_id("mp");
        let mut track = MediaPackageElement::track(Url::parse("file:///nonexistent/t.mp4").unwrap());
        track.set_identifier(Some("t1".to_string()));
        mp.add(track);

        let handler = CleanupWorkflowOperationHandler::new(workspace).with_default_delay(Duration::ZERO);
        let wf = workflow(mp, WorkflowOperationInstance::new(OPERATION_ID));
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Continue);
        assert!(result.media_package.unwrap().elements().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_delay() {
        let handler = CleanupWorkflowOperationHandler::new(workspace("cleanup"));
        let wf = workflow(
            MediaPackage::with_id("mp"),
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration(DELAY, "soon"),
        );
        assert!(handler.start(&wf, &JobContext::default()).await.is_err());
    }
}
