//! `series` operation

use async_trait::async_trait;
use bridge_traits::{BridgeError, SeriesService, Workspace};
use bytes::Bytes;
use core_mediapackage::flavor::{episode_dublin_core, series_dublin_core, xacml_policy_series};
use core_mediapackage::{
    MediaPackage, MediaPackageElement, MediaPackageElementFlavor, MediaPackageReference, MimeType,
};
use core_metadata::dublincore::{property, term};
use core_metadata::DublinCoreCatalog;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{load_dublin_core, store_dublin_core};
use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::current_operation;

pub const OPERATION_ID: &str = "series";
pub const SERIES: &str = "series";
/// Flavors of series catalogs to attach, `*` for all
pub const ATTACH: &str = "attach";
pub const APPLY_ACL: &str = "apply-acl";
/// Dublin Core terms copied from the series into the episode catalog
pub const COPY_METADATA: &str = "copy-metadata";

pub(crate) const ACL_FILENAME: &str = "xacml-series.xml";

/// Assigns a media package to a series
///
/// The series is taken from the `series` key or, when that is blank, from the
/// media package itself. Without either the operation is skipped.
pub struct SeriesWorkflowOperationHandler {
    workspace: Arc<dyn Workspace>,
    series_service: Arc<dyn SeriesService>,
}

impl SeriesWorkflowOperationHandler {
    pub fn new(workspace: Arc<dyn Workspace>, series_service: Arc<dyn SeriesService>) -> Self {
        Self {
            workspace,
            series_service,
        }
    }

    async fn attach_series_catalog(
        &self,
        mp: &mut MediaPackage,
        series_id: &str,
        series: &DublinCoreCatalog,
    ) -> Result<()> {
        let flavor = series_dublin_core();
        for existing in ids_with_flavor(mp, &flavor) {
            mp.remove_by_id(&existing);
        }

        let element_id = Uuid::new_v4().to_string();
        let uri = store_dublin_core(self.workspace.as_ref(), mp.identifier(), &element_id, series).await?;
        let mut catalog = MediaPackageElement::catalog(uri);
        catalog.set_identifier(Some(element_id));
        catalog.set_flavor(Some(flavor));
        catalog.set_mime_type(Some(MimeType::new("text", "xml")));
        catalog.set_reference(Some(MediaPackageReference::for_series(series_id)));
        mp.add(catalog);
        Ok(())
    }

    async fn attach_series_acl(&self, mp: &mut MediaPackage, series_id: &str) -> Result<()> {
        let acl = self.series_service.get_series_access_control(series_id).await?;
        if acl.is_empty() {
            debug!(series = series_id, "Series has no access control entries");
            return Ok(());
        }

        let flavor = xacml_policy_series();
        for existing in ids_with_flavor(mp, &flavor) {
            mp.remove_by_id(&existing);
        }

        let element_id = Uuid::new_v4().to_string();
        let uri = self
            .workspace
            .put(mp.identifier(), &element_id, ACL_FILENAME, Bytes::from(acl.to_xml()?))
            .await?;
        let mut attachment = MediaPackageElement::attachment(uri);
        attachment.set_identifier(Some(element_id));
        attachment.set_flavor(Some(flavor));
        attachment.set_mime_type(Some(MimeType::new("text", "xml")));
        mp.add(attachment);
        Ok(())
    }

    /// Copies `terms` from the series into every episode catalog and points
    /// the episode at the series.
    async fn update_episode_catalogs(
        &self,
        mp: &mut MediaPackage,
        series_id: &str,
        series: &DublinCoreCatalog,
        terms: &[String],
    ) -> Result<()> {
        for id in ids_with_flavor(mp, &episode_dublin_core()) {
            let Some(element) = mp.element_by_id(&id) else {
                continue;
            };
            let mut episode = load_dublin_core(self.workspace.as_ref(), element).await?;
            for name in terms {
                let values = series.get(&term(name));
                if !values.is_empty() {
                    episode.set_all(&term(name), values.iter().map(|v| v.to_string()));
                }
            }
            episode.set(&term(property::IS_PART_OF), series_id);

            let uri = store_dublin_core(self.workspace.as_ref(), mp.identifier(), &id, &episode).await?;
            if let Some(element) = mp.element_by_id_mut(&id) {
                element.set_uri(Some(uri));
                element.set_checksum(None);
            }
        }
        Ok(())
    }
}

fn ids_with_flavor(mp: &MediaPackage, flavor: &MediaPackageElementFlavor) -> Vec<String> {
    mp.elements_by_flavor(flavor)
        .iter()
        .filter_map(|e| e.identifier().map(str::to_string))
        .collect()
}

#[async_trait]
impl WorkflowOperationHandler for SeriesWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Apply series metadata and access control to the media package"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;
        let mut mp = workflow.media_package().clone();

        let Some(series_id) = operation
            .opt_config(SERIES)
            .map(str::to_string)
            .or_else(|| mp.series().map(str::to_string))
        else {
            info!(media_package = %mp.identifier(), "No series set, skipping");
            return Ok(WorkflowOperationResult::of(mp, Action::Skip));
        };

        let attach = operation.list_config(ATTACH);
        let attach_catalog = attach.iter().any(|value| {
            value == "*"
                || MediaPackageElementFlavor::parse(value)
                    .map(|f| f.matches(&series_dublin_core()))
                    .unwrap_or(false)
        });
        let apply_acl = operation.bool_config(APPLY_ACL);
        let copy_metadata = operation.list_config(COPY_METADATA);

        let xml = match self.series_service.get_series(&series_id).await {
            Ok(xml) => xml,
            Err(BridgeError::NotFound(_)) => {
                return Err(WorkflowOperationError::Failed(format!(
                    "Series {} not found",
                    series_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        let series = DublinCoreCatalog::from_xml(&xml)?.with_flavor(series_dublin_core());

        mp.set_series(Some(series_id.clone()));
        mp.set_series_title(series.get_first(&term(property::TITLE)).map(str::to_string));

        if attach_catalog {
            self.attach_series_catalog(&mut mp, &series_id, &series).await?;
        }
        if apply_acl {
            self.attach_series_acl(&mut mp, &series_id).await?;
        }
        self.update_episode_catalogs(&mut mp, &series_id, &series, &copy_metadata)
            .await?;

        info!(
            media_package = %mp.identifier(),
            series = %series_id,
            attach_catalog,
            apply_acl,
            "Applied series"
        );
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}
