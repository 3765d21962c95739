//! `tag` operation

use async_trait::async_trait;
use bridge_traits::Workspace;
use core_mediapackage::{MediaPackage, MediaPackageElement, MediaPackageElementFlavor};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::copy_element_file;
use crate::error::Result;
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::{current_operation, Configuration};
use crate::selector::SimpleElementSelector;
use crate::tags::TagDelta;

pub const OPERATION_ID: &str = "tag";
pub const COPY: &str = "copy";

/// Changes flavor and tags of the selected elements
///
/// Configuration: `source-flavors`, `source-tags`, `target-flavor`,
/// `target-tags` and `copy`. With `copy` the changes are applied to a copy
/// of each element, stored in the workspace under a new id.
pub struct TagWorkflowOperationHandler {
    workspace: Arc<dyn Workspace>,
}

impl TagWorkflowOperationHandler {
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl WorkflowOperationHandler for TagWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Modify the tags and flavors of media package elements"
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
            Configuration::Many,
            Configuration::Many,
        )?;
        let copy = operation.bool_config(COPY);
        let target_flavor = config.single_target_flavor();
        let delta = TagDelta::parse(&config.target_tags);

        let mut mp = workflow.media_package().clone();
        let selected: Vec<String> = SimpleElementSelector::new()
            .with_flavors(config.source_flavors.iter().cloned())
            .with_tags(&config.source_tags)
            .select(&mp, false)
            .iter()
            .filter_map(|e| e.identifier().map(str::to_string))
            .collect();

        if selected.is_empty() {
            info!(media_package = %mp.identifier(), "No elements to tag");
            return Ok(WorkflowOperationResult::of(mp, Action::Continue));
        }

        tag_elements(
            self.workspace.as_ref(),
            &mut mp,
            &selected,
            target_flavor,
            &delta,
            copy,
        )
        .await?;

        info!(
            media_package = %mp.identifier(),
            count = selected.len(),
            copy,
            "Tagged elements"
        );
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}

/// Retags the elements with the given ids, or copies of them when `copy`
/// is set.
pub(crate) async fn tag_elements(
    workspace: &dyn Workspace,
    mp: &mut MediaPackage,
    ids: &[String],
    target_flavor: Option<&MediaPackageElementFlavor>,
    delta: &TagDelta,
    copy: bool,
) -> Result<()> {
    for id in ids {
        if !copy {
            if let Some(element) = mp.element_by_id_mut(id) {
                retag(element, target_flavor, delta);
            }
            continue;
        }

        let Some(source) = mp.element_by_id(id) else {
            continue;
        };
        let copy_id = Uuid::new_v4().to_string();
        let uri = copy_element_file(workspace, mp.identifier(), source, &copy_id).await?;
        let mut element = source.clone();
        element.set_identifier(Some(copy_id));
        element.set_uri(Some(uri));
        retag(&mut element, target_flavor, delta);
        debug!(source = %id, copy = ?element.identifier(), "Copied element");
        mp.add(element);
    }
    Ok(())
}

fn retag(
    element: &mut MediaPackageElement,
    target_flavor: Option<&MediaPackageElementFlavor>,
    delta: &TagDelta,
) {
    if let Some(target) = target_flavor {
        match element.flavor() {
            Some(current) => {
                let flavor = target.apply_to(current);
                element.set_flavor(Some(flavor));
            }
            None if target.has_wildcard() => {
                warn!(
                    element = element.identifier().unwrap_or_default(),
                    target = %target,
                    "Cannot apply wildcard flavor to element without flavor"
                );
            }
            None => element.set_flavor(Some(target.clone())),
        }
    }
    delta.apply(element);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{add_element, workflow, workspace};
    use crate::instance::WorkflowOperationInstance;
    use core_mediapackage::{ElementType, MediaPackage};

    async fn media_package(workspace: &dyn Workspace) -> MediaPackage {
        let mut mp = MediaPackage::with_id("mp");
        add_element(workspace, &mut mp, ElementType::Track, "t1", "presenter/source", &["b", "d"], "video").await;
        add_element(workspace, &mut mp, ElementType::Catalog, "c1", "dublincore/episode", &["archive"], "<dc/>").await;
        mp
    }

    #[tokio::test]
    async fn test_retag_in_place() {
        let workspace = workspace("tag");
        let mp = media_package(workspace.as_ref()).await;
        let handler = TagWorkflowOperationHandler::new(workspace);
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration("source-flavors", "*/source")
                .with_configuration("target-flavor", "*/delivery")
                .with_configuration("target-tags", "+a,-b"),
        );

        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Continue);
        let mp = result.media_package.unwrap();
        let track = mp.element_by_id("t1").unwrap();
        assert_eq!(track.flavor().unwrap().to_string(), "presenter/delivery");
        assert_eq!(track.tags(), vec!["a", "d"]);
        assert_eq!(mp.elements().len(), 2);
    }

    #[tokio::test]
    async fn test_plain_target_tag_overrides() {
        let workspace = workspace("tag");
        let mp = media_package(workspace.as_ref()).await;
        let handler = TagWorkflowOperationHandler::new(workspace);
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration("source-tags", "b")
                .with_configuration("target-tags", "+a,-b,c"),
        );

        let mp = handler
            .start(&wf, &JobContext::default())
            .await
            .unwrap()
            .media_package
            .unwrap();
        assert_eq!(mp.element_by_id("t1").unwrap().tags(), vec!["c"]);
        assert_eq!(mp.element_by_id("c1").unwrap().tags(), vec!["archive"]);
    }

    #[tokio::test]
    async fn test_copy_creates_new_element() {
        let workspace = workspace("tag");
        let mp = media_package(workspace.as_ref()).await;
        let handler = TagWorkflowOperationHandler::new(workspace.clone());
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration("source-flavor", "dublincore/episode")
                .with_configuration("target-flavor", "dublincore/copy")
                .with_configuration("copy", "true"),
        );

        let mp = handler
            .start(&wf, &JobContext::default())
            .await
            .unwrap()
            .media_package
            .unwrap();
        assert_eq!(mp.elements().len(), 3);
        assert_eq!(
            mp.element_by_id("c1").unwrap().flavor().unwrap().to_string(),
            "dublincore/episode"
        );
        let copy = mp
            .elements_by_flavor(&"dublincore/copy".parse().unwrap())
            .into_iter()
            .next()
            .unwrap();
        assert_ne!(copy.identifier(), Some("c1"));
        let data = workspace.read(copy.uri().unwrap()).await.unwrap();
        assert_eq!(data.as_ref(), b"<dc/>");
    }

    #[tokio::test]
    async fn test_nothing_selected_continues() {
        let workspace = workspace("tag");
        let mp = media_package(workspace.as_ref()).await;
        let handler = TagWorkflowOperationHandler::new(workspace);
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration("target-tags", "x"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Continue);
        assert_eq!(
            result.media_package.unwrap().element_by_id("t1").unwrap().tags(),
            vec!["b", "d"]
        );
    }
}
