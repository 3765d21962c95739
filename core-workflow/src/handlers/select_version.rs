//! `select-version` operation

use async_trait::async_trait;
use bridge_traits::{AssetManager, Snapshot, SnapshotQuery};
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::current_operation;

pub const OPERATION_ID: &str = "select-version";
pub const VERSION: &str = "version";
/// Tags the selected snapshot must not carry on any of its elements
pub const NO_TAGS: &str = "no-tags";

/// Replaces the workflow's media package with an archived version
///
/// Exactly one of `version` and `no-tags` must be configured.
pub struct SelectVersionWorkflowOperationHandler {
    asset_manager: Arc<dyn AssetManager>,
}

impl SelectVersionWorkflowOperationHandler {
    pub fn new(asset_manager: Arc<dyn AssetManager>) -> Self {
        Self { asset_manager }
    }
}

fn carries_any_tag(snapshot: &Snapshot, tags: &[String]) -> bool {
    snapshot
        .media_package
        .elements()
        .iter()
        .any(|element| tags.iter().any(|tag| element.contains_tag(tag)))
}

#[async_trait]
impl WorkflowOperationHandler for SelectVersionWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Select an archived version of the media package"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;
        let mp_id = workflow.media_package().identifier().to_string();
        let no_tags = operation.list_config(NO_TAGS);

        let selected = match (operation.opt_config(VERSION), no_tags.is_empty()) {
            (Some(_), false) => {
                return Err(WorkflowOperationError::InvalidConfiguration(format!(
                    "{} and {} cannot be combined",
                    VERSION, NO_TAGS
                )))
            }
            (None, true) => {
                return Err(WorkflowOperationError::InvalidConfiguration(format!(
                    "either {} or {} must be set",
                    VERSION, NO_TAGS
                )))
            }
            (Some(value), true) => {
                let version: u64 = value.parse().map_err(|_| {
                    WorkflowOperationError::InvalidConfiguration(format!(
                        "{} is not a valid version",
                        value
                    ))
                })?;
                self.asset_manager
                    .find_snapshots(SnapshotQuery::for_media_package(&mp_id).with_version(version))
                    .await?
                    .into_iter()
                    .next()
            }
            (None, false) => self
                .asset_manager
                .find_snapshots(SnapshotQuery::for_media_package(&mp_id))
                .await?
                .into_iter()
                .find(|snapshot| !carries_any_tag(snapshot, &no_tags)),
        };

        let snapshot = selected.ok_or_else(|| {
            WorkflowOperationError::Failed(format!(
                "no matching version of media package {} found",
                mp_id
            ))
        })?;

        info!(
            media_package = %mp_id,
            version = snapshot.version,
            "Selected archived version"
        );
        Ok(WorkflowOperationResult::of(snapshot.media_package, Action::Continue))
    }
}
