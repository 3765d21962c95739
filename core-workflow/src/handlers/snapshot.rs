//! `snapshot` operation

use async_trait::async_trait;
use bridge_traits::AssetManager;
use core_mediapackage::ElementType;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::{current_operation, Configuration};
use crate::selector::SimpleElementSelector;

pub const OPERATION_ID: &str = "snapshot";

pub const DEFAULT_OWNER: &str = "default";

/// Archives the media package in the asset manager
///
/// Without source flavors or tags the whole package is archived. Otherwise
/// only the selected elements and the publications go into the snapshot;
/// the workflow keeps the complete package either way.
pub struct SnapshotWorkflowOperationHandler {
    asset_manager: Arc<dyn AssetManager>,
    owner: String,
}

impl SnapshotWorkflowOperationHandler {
    pub fn new(asset_manager: Arc<dyn AssetManager>) -> Self {
        Self {
            asset_manager,
            owner: DEFAULT_OWNER.to_string(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }
}

#[async_trait]
impl WorkflowOperationHandler for SnapshotWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Archive the media package"
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
            Configuration::None,
        )?;
        let mp = workflow.media_package();

        let snapshot = if config.has_no_source() {
            self.asset_manager.take_snapshot(&self.owner, mp).await?
        } else {
            let selector = SimpleElementSelector::new()
                .with_flavors(config.source_flavors.iter().cloned())
                .with_tags(&config.source_tags);
            let mut partial = mp.clone();
            let dropped: Vec<String> = partial
                .elements()
                .iter()
                .filter(|e| e.element_type() != ElementType::Publication)
                .filter(|e| !selector.matches(e, true))
                .filter_map(|e| e.identifier().map(str::to_string))
                .collect();
            for id in &dropped {
                partial.remove_by_id(id);
            }
            self.asset_manager.take_snapshot(&self.owner, &partial).await?
        };

        info!(
            media_package = %mp.identifier(),
            version = snapshot.version,
            owner = %snapshot.owner,
            elements = snapshot.media_package.elements().len(),
            "Took snapshot"
        );
        Ok(WorkflowOperationResult::of(mp.clone(), Action::Continue))
    }
}
