//! Workflow operation handlers
//!
//! | Operation | Handler | Collaborators |
//! |-----------|---------|---------------|
//! | `tag` | [`TagWorkflowOperationHandler`] | Workspace |
//! | `clone` | [`CloneWorkflowOperationHandler`] | Workspace |
//! | `cleanup` | [`CleanupWorkflowOperationHandler`] | Workspace |
//! | `error-resolution` | [`ErrorResolutionWorkflowOperationHandler`] | |
//! | `series` | [`SeriesWorkflowOperationHandler`] | Workspace, SeriesService |
//! | `snapshot` | [`SnapshotWorkflowOperationHandler`] | AssetManager |
//! | `duplicate-event` | [`DuplicateEventWorkflowOperationHandler`] | Workspace, AssetManager, SeriesService |
//! | `select-version` | [`SelectVersionWorkflowOperationHandler`] | AssetManager |
//! | `publish-configure` | [`ConfigurablePublishWorkflowOperationHandler`] | DistributionService, ServiceRegistry |
//! | `retract-configure` | [`ConfigurableRetractWorkflowOperationHandler`] | DistributionService, ServiceRegistry |
//! | `tag-by-dcterm` | [`TagByDublinCoreTermWorkflowOperationHandler`] | Workspace |
//! | `defaults` | [`DefaultsWorkflowOperationHandler`] | |

pub mod cleanup;
pub mod clone;
pub mod defaults;
pub mod duplicate_event;
pub mod error_resolution;
pub mod publish_configure;
pub mod publication;
pub mod retract_configure;
pub mod select_version;
pub mod series;
pub mod snapshot;
pub mod tag;
pub mod tag_by_dcterm;

pub use cleanup::CleanupWorkflowOperationHandler;
pub use clone::CloneWorkflowOperationHandler;
pub use defaults::DefaultsWorkflowOperationHandler;
pub use duplicate_event::DuplicateEventWorkflowOperationHandler;
pub use error_resolution::ErrorResolutionWorkflowOperationHandler;
pub use publish_configure::ConfigurablePublishWorkflowOperationHandler;
pub use retract_configure::ConfigurableRetractWorkflowOperationHandler;
pub use select_version::SelectVersionWorkflowOperationHandler;
pub use series::SeriesWorkflowOperationHandler;
pub use snapshot::SnapshotWorkflowOperationHandler;
pub use tag::TagWorkflowOperationHandler;
pub use tag_by_dcterm::TagByDublinCoreTermWorkflowOperationHandler;

use bridge_traits::Workspace;
use bytes::Bytes;
use core_mediapackage::MediaPackageElement;
use core_metadata::DublinCoreCatalog;
use url::Url;

use crate::error::{Result, WorkflowOperationError};

/// Last path segment of `uri`, or `fallback` when the path has none.
pub(crate) fn file_name(uri: &Url, fallback: &str) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Copies the file of `element` into the workspace under `element_id`.
pub(crate) async fn copy_element_file(
    workspace: &dyn Workspace,
    media_package_id: &str,
    element: &MediaPackageElement,
    element_id: &str,
) -> Result<Url> {
    let source = element.uri().ok_or_else(|| {
        WorkflowOperationError::Failed(format!(
            "element {} has no location",
            element.identifier().unwrap_or_default()
        ))
    })?;
    let data = workspace.read(source).await?;
    let uri = workspace
        .put(
            media_package_id,
            element_id,
            &file_name(source, element_id),
            data,
        )
        .await?;
    Ok(uri)
}

/// Reads and parses the Dublin Core catalog behind `element`.
pub(crate) async fn load_dublin_core(
    workspace: &dyn Workspace,
    element: &MediaPackageElement,
) -> Result<DublinCoreCatalog> {
    let uri = element.uri().ok_or_else(|| {
        WorkflowOperationError::Failed(format!(
            "catalog {} has no location",
            element.identifier().unwrap_or_default()
        ))
    })?;
    let data = workspace.read(uri).await?;
    let xml = std::str::from_utf8(&data).map_err(|e| {
        WorkflowOperationError::Failed(format!("catalog {} is not valid UTF-8: {}", uri, e))
    })?;
    let mut catalog = DublinCoreCatalog::from_xml(xml)?;
    catalog.set_flavor(element.flavor().cloned());
    Ok(catalog)
}

/// Serializes `catalog` into the workspace and returns its new location.
pub(crate) async fn store_dublin_core(
    workspace: &dyn Workspace,
    media_package_id: &str,
    element_id: &str,
    catalog: &DublinCoreCatalog,
) -> Result<Url> {
    let xml = catalog.to_xml()?;
    let uri = workspace
        .put(media_package_id, element_id, DUBLINCORE_FILENAME, Bytes::from(xml))
        .await?;
    Ok(uri)
}

pub(crate) const DUBLINCORE_FILENAME: &str = "dublincore.xml";
