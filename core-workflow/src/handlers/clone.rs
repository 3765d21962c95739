//! `clone` operation

use async_trait::async_trait;
use bridge_traits::Workspace;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::copy_element_file;
use crate::error::Result;
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::{current_operation, Configuration};
use crate::selector::SimpleElementSelector;

pub const OPERATION_ID: &str = "clone";

/// Duplicates the selected elements under `target-flavor`
///
/// Wildcards in the target flavor take the corresponding part of the source
/// element's flavor. Each copy gets its own file in the workspace.
pub struct CloneWorkflowOperationHandler {
    workspace: Arc<dyn Workspace>,
}

impl CloneWorkflowOperationHandler {
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl WorkflowOperationHandler for CloneWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Clone media package elements to a new flavor"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;
        let config = operation.tags_and_flavors(
            Configuration::Many,
            Configuration::Many,
            Configuration::None,
            Configuration::One,
        )?;
        let mut mp = workflow.media_package().clone();

        if config.has_no_source() {
            info!(
                media_package = %mp.identifier(),
                "No source tags or flavors configured, skipping"
            );
            return Ok(WorkflowOperationResult::of(mp, Action::Skip));
        }
        let Some(target_flavor) = config.single_target_flavor() else {
            return Ok(WorkflowOperationResult::of(mp, Action::Skip));
        };

        let selected: Vec<String> = SimpleElementSelector::new()
            .with_flavors(config.source_flavors.iter().cloned())
            .with_tags(&config.source_tags)
            .select(&mp, false)
            .iter()
            .filter_map(|e| e.identifier().map(str::to_string))
            .collect();
        if selected.is_empty() {
            info!(media_package = %mp.identifier(), "No matching elements to clone");
            return Ok(WorkflowOperationResult::of(mp, Action::Skip));
        }

        for id in &selected {
            let Some(source) = mp.element_by_id(id) else {
                continue;
            };
            let clone_id = Uuid::new_v4().to_string();
            let uri =
                copy_element_file(self.workspace.as_ref(), mp.identifier(), source, &clone_id).await?;

            let mut element = source.clone();
            let flavor = match source.flavor() {
                Some(current) => target_flavor.apply_to(current),
                None => target_flavor.clone(),
            };
            element.set_identifier(Some(clone_id));
            element.set_uri(Some(uri));
            element.set_flavor(Some(flavor));
            debug!(source = %id, clone = ?element.identifier(), "Cloned element");
            mp.add(element);
        }

        info!(
            media_package = %mp.identifier(),
            count = selected.len(),
            target = %target_flavor,
            "Cloned elements"
        );
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowOperationError;
    use crate::handlers::test_support::{add_element, workflow, workspace};
    use crate::instance::WorkflowOperationInstance;
    use core_mediapackage::{ElementType, MediaPackage, MediaPackageElementFlavor};

    async fn setup() -> (CloneWorkflowOperationHandler, Arc<bridge_local::FilesystemWorkspace>, MediaPackage) {
        let workspace = workspace("clone");
        let mut mp = MediaPackage::with_id("mp");
        add_element(workspace.as_ref(), &mut mp, ElementType::Track, "t1", "presenter/source", &[], "video").await;
        add_element(workspace.as_ref(), &mut mp, ElementType::Attachment, "a1", "presenter/preview", &["web"], "image").await;
        (CloneWorkflowOperationHandler::new(workspace.clone()), workspace, mp)
    }

    #[tokio::test]
    async fn test_clone_with_wildcard_target() {
        let (handler, workspace, mp) = setup().await;
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration("source-flavors", "presenter/*")
                .with_configuration("target-flavor", "*/copy"),
        );

        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Continue);
        let mp = result.media_package.unwrap();
        assert_eq!(mp.elements().len(), 4);

        let copies = mp.elements_by_flavor(&MediaPackageElementFlavor::parse("presenter/copy").unwrap());
        assert_eq!(copies.len(), 2);
        let copied_attachment = copies
            .iter()
            .find(|e| e.element_type() == ElementType::Attachment)
            .unwrap();
        assert!(copied_attachment.contains_tag("web"));
        assert_eq!(
            workspace.read(copied_attachment.uri().unwrap()).await.unwrap().as_ref(),
            b"image"
        );
    }

    #[tokio::test]
    async fn test_requires_target_flavor() {
        let (handler, _, mp) = setup().await;
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration("source-flavor", "presenter/source"),
        );
        let err = handler.start(&wf, &JobContext::default()).await.unwrap_err();
        assert!(matches!(err, WorkflowOperationError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_skips_without_source_or_matches() {
        let (handler, _, mp) = setup().await;
        let wf = workflow(
            mp.clone(),
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration("target-flavor", "x/y"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Skip);

        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration("source-tags", "missing")
                .with_configuration("target-flavor", "x/y"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Skip);
        assert_eq!(result.media_package.unwrap().elements().len(), 2);
    }
}
