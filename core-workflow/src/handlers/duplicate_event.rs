//! `duplicate-event` operation

use async_trait::async_trait;
use bridge_traits::{AccessControlList, AssetManager, BridgeError, Property, SeriesService, Workspace};
use bytes::Bytes;
use core_mediapackage::flavor::{episode_dublin_core, series_dublin_core, xacml_policy_series};
use core_mediapackage::{
    ElementType, MediaPackage, MediaPackageElement, MediaPackageReference, MimeType,
};
use core_metadata::dublincore::{property, term};
use core_metadata::DublinCoreCatalog;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::series::ACL_FILENAME;
use super::snapshot::DEFAULT_OWNER;
use super::{copy_element_file, load_dublin_core, store_dublin_core};
use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::{current_operation, Configuration};
use crate::selector::SimpleElementSelector;
use crate::tags::TagDelta;

pub const OPERATION_ID: &str = "duplicate-event";
pub const NUMBER_OF_EVENTS: &str = "number-of-events";
pub const MAX_NUMBER_OF_EVENTS: &str = "max-number-of-events";
pub const DEFAULT_MAX_NUMBER_OF_EVENTS: u32 = 25;
/// Asset manager property namespaces copied to every duplicate
pub const PROPERTY_NAMESPACES: &str = "property-namespaces";
pub const COPY_NUMBER_PREFIX: &str = "copy-number-prefix";
pub const DEFAULT_COPY_NUMBER_PREFIX: &str = "copy";
pub const NO_SUFFIX: &str = "no-suffix";
/// Series the duplicates are assigned to instead of the source's series
pub const SET_SERIES_ID: &str = "set-series-id";

/// Result property carrying the id of the `number`-th duplicate.
pub fn duplicate_property(number: u32) -> String {
    format!("duplicate_media_package_{}_id", number)
}

struct TargetSeries {
    id: String,
    catalog: DublinCoreCatalog,
    acl: AccessControlList,
}

/// Creates independent copies of the media package as new events
///
/// Every copy gets a fresh identifier, its own episode catalog and copies of
/// the selected element files, and is archived in the asset manager. The
/// workflow continues with the source package; the ids of the copies are
/// returned as `duplicate_media_package_<n>_id` properties.
pub struct DuplicateEventWorkflowOperationHandler {
    workspace: Arc<dyn Workspace>,
    asset_manager: Arc<dyn AssetManager>,
    series_service: Option<Arc<dyn SeriesService>>,
    owner: String,
}

impl DuplicateEventWorkflowOperationHandler {
    pub fn new(workspace: Arc<dyn Workspace>, asset_manager: Arc<dyn AssetManager>) -> Self {
        Self {
            workspace,
            asset_manager,
            series_service: None,
            owner: DEFAULT_OWNER.to_string(),
        }
    }

    /// Needed for `set-series-id`.
    pub fn with_series_service(mut self, series_service: Arc<dyn SeriesService>) -> Self {
        self.series_service = Some(series_service);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    async fn target_series(&self, series_id: &str) -> Result<TargetSeries> {
        let series_service = self.series_service.as_ref().ok_or_else(|| {
            WorkflowOperationError::InvalidConfiguration(format!(
                "{} needs a series service",
                SET_SERIES_ID
            ))
        })?;
        let xml = match series_service.get_series(series_id).await {
            Ok(xml) => xml,
            Err(BridgeError::NotFound(_)) => {
                return Err(WorkflowOperationError::Failed(format!(
                    "Series {} not found",
                    series_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(TargetSeries {
            id: series_id.to_string(),
            catalog: DublinCoreCatalog::from_xml(&xml)?.with_flavor(series_dublin_core()),
            acl: series_service.get_series_access_control(series_id).await?,
        })
    }

    async fn attach_series(
        &self,
        copy: &mut MediaPackage,
        series: &TargetSeries,
        acl_tags: &[String],
    ) -> Result<()> {
        copy.set_series(Some(series.id.clone()));
        copy.set_series_title(
            series
                .catalog
                .get_first(&term(property::TITLE))
                .map(str::to_string),
        );

        let element_id = Uuid::new_v4().to_string();
        let uri = store_dublin_core(
            self.workspace.as_ref(),
            copy.identifier(),
            &element_id,
            &series.catalog,
        )
        .await?;
        let mut catalog = MediaPackageElement::catalog(uri);
        catalog.set_identifier(Some(element_id));
        catalog.set_flavor(Some(series_dublin_core()));
        catalog.set_mime_type(Some(MimeType::new("text", "xml")));
        catalog.set_reference(Some(MediaPackageReference::for_series(&series.id)));
        copy.add(catalog);

        if series.acl.is_empty() {
            return Ok(());
        }
        let element_id = Uuid::new_v4().to_string();
        let uri = self
            .workspace
            .put(
                copy.identifier(),
                &element_id,
                ACL_FILENAME,
                Bytes::from(series.acl.to_xml()?),
            )
            .await?;
        let mut attachment = MediaPackageElement::attachment(uri);
        attachment.set_identifier(Some(element_id));
        attachment.set_flavor(Some(xacml_policy_series()));
        attachment.set_mime_type(Some(MimeType::new("text", "xml")));
        for tag in acl_tags {
            attachment.add_tag(tag.as_str());
        }
        copy.add(attachment);
        Ok(())
    }

    async fn copy_properties(&self, source_id: &str, copy_id: &str, namespaces: &[String]) -> Result<()> {
        for namespace in namespaces {
            for property in self.asset_manager.find_properties(source_id, namespace).await? {
                self.asset_manager
                    .set_property(Property {
                        media_package_id: copy_id.to_string(),
                        ..property
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<u32> {
    value.parse().map_err(|_| {
        WorkflowOperationError::InvalidConfiguration(format!(
            "{} must be a positive number, got '{}'",
            key, value
        ))
    })
}

fn copy_title(title: &str, prefix: &str, number: u32, no_suffix: bool) -> String {
    if no_suffix {
        title.to_string()
    } else if prefix.is_empty() {
        format!("{} ({})", title, number)
    } else {
        format!("{} ({} {})", title, prefix, number)
    }
}

#[async_trait]
impl WorkflowOperationHandler for DuplicateEventWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Create copies of the event as new media packages"
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
            Configuration::None,
        )?;
        let number_of_events = parse_count(NUMBER_OF_EVENTS, operation.config(NUMBER_OF_EVENTS)?)?;
        let max_number_of_events = match operation.opt_config(MAX_NUMBER_OF_EVENTS) {
            Some(value) => parse_count(MAX_NUMBER_OF_EVENTS, value)?,
            None => DEFAULT_MAX_NUMBER_OF_EVENTS,
        };
        if number_of_events > max_number_of_events {
            return Err(WorkflowOperationError::InvalidConfiguration(format!(
                "{} copies requested, at most {} allowed",
                number_of_events, max_number_of_events
            )));
        }
        let no_suffix = operation.bool_config(NO_SUFFIX);
        let prefix = operation.config_or(COPY_NUMBER_PREFIX, DEFAULT_COPY_NUMBER_PREFIX);
        let namespaces = operation.list_config(PROPERTY_NAMESPACES);
        let delta = TagDelta::parse(&config.target_tags);
        let series = match operation.opt_config(SET_SERIES_ID) {
            Some(series_id) => Some(self.target_series(series_id).await?),
            None => None,
        };

        let mp = workflow.media_package();
        let episodes = mp.catalogs_by_flavor(&episode_dublin_core());
        let [source_episode] = episodes.as_slice() else {
            return Err(WorkflowOperationError::Failed(format!(
                "Media package {} needs exactly one episode catalog, found {}",
                mp.identifier(),
                episodes.len()
            )));
        };
        let episode = load_dublin_core(self.workspace.as_ref(), source_episode).await?;
        let title = mp
            .title()
            .or_else(|| episode.get_first(&term(property::TITLE)))
            .unwrap_or_default()
            .to_string();

        let mut acl_tags = Vec::new();
        let mut elements = Vec::new();
        let selector = SimpleElementSelector::new()
            .with_flavors(config.source_flavors.iter().cloned())
            .with_tags(&config.source_tags);
        for element in selector.select(mp, false) {
            let flavor = element.flavor();
            if element.element_type() == ElementType::Publication
                || flavor == Some(&episode_dublin_core())
            {
                continue;
            }
            if series.is_some() {
                if flavor == Some(&xacml_policy_series()) {
                    acl_tags = element.tags();
                    continue;
                }
                if flavor == Some(&series_dublin_core()) {
                    continue;
                }
            }
            elements.push(element);
        }

        let mut properties = BTreeMap::new();
        for number in 1..=number_of_events {
            let copy_id = Uuid::new_v4().to_string();
            let mut copy = MediaPackage::with_id(&copy_id);
            let copy_title = copy_title(&title, prefix, number, no_suffix);
            copy.set_title(Some(copy_title.clone()));
            copy.set_start(mp.start());
            copy.set_duration(mp.duration())?;
            copy.set_language(mp.language().map(str::to_string));
            copy.set_license(mp.license().map(str::to_string));

            match &series {
                Some(series) => self.attach_series(&mut copy, series, &acl_tags).await?,
                None => {
                    copy.set_series(mp.series().map(str::to_string));
                    copy.set_series_title(mp.series_title().map(str::to_string));
                }
            }

            let mut copy_episode = episode.clone();
            copy_episode.set(&term(property::TITLE), copy_title.as_str());
            if let Some(series) = &series {
                copy_episode.set(&term(property::IS_PART_OF), series.id.as_str());
            }
            let element_id = Uuid::new_v4().to_string();
            let uri =
                store_dublin_core(self.workspace.as_ref(), &copy_id, &element_id, &copy_episode).await?;
            let mut catalog = MediaPackageElement::catalog(uri);
            catalog.set_identifier(Some(element_id));
            catalog.set_flavor(Some(episode_dublin_core()));
            catalog.set_mime_type(Some(MimeType::new("text", "xml")));
            for tag in source_episode.tags() {
                catalog.add_tag(tag);
            }
            delta.apply(&mut catalog);
            copy.add(catalog);

            for element in &elements {
                let element_id = Uuid::new_v4().to_string();
                let uri =
                    copy_element_file(self.workspace.as_ref(), &copy_id, element, &element_id).await?;
                let mut cloned = (*element).clone();
                cloned.set_identifier(Some(element_id));
                cloned.set_uri(Some(uri));
                delta.apply(&mut cloned);
                copy.add(cloned);
            }

            self.asset_manager.take_snapshot(&self.owner, &copy).await?;
            self.copy_properties(mp.identifier(), &copy_id, &namespaces)
                .await?;
            debug!(source = %mp.identifier(), copy = %copy_id, number, "Created duplicate");
            properties.insert(duplicate_property(number), copy_id);
        }

        info!(
            media_package = %mp.identifier(),
            copies = number_of_events,
            elements = elements.len(),
            "Duplicated event"
        );
        Ok(WorkflowOperationResult::of(mp.clone(), Action::Continue).with_properties(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{add_element, workflow, workspace};
    use crate::instance::WorkflowOperationInstance;
    use bridge_local::{InMemoryAssetManager, InMemorySeriesService};
    use bridge_traits::{AccessControlEntry, SnapshotQuery};
    use core_mediapackage::MediaPackageElementFlavor;

    const EPISODE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dublincore xmlns="http://www.opencastproject.org/xsd/1.0/dublincore/"
            xmlns:dcterms="http://purl.org/dc/terms/">
  <dcterms:title>Lecture 1</dcterms:title>
</dublincore>"#;

    const SERIES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dublincore xmlns="http://www.opencastproject.org/xsd/1.0/dublincore/"
            xmlns:dcterms="http://purl.org/dc/terms/">
  <dcterms:identifier>s2</dcterms:identifier>
  <dcterms:title>Compilers</dcterms:title>
</dublincore>"#;

    async fn source(workspace: &dyn Workspace) -> MediaPackage {
        let mut mp = MediaPackage::with_id("source");
        mp.set_title(Some("Lecture 1".to_string()));
        mp.set_language(Some("en".to_string()));
        add_element(workspace, &mut mp, ElementType::Catalog, "episode", "dublincore/episode", &["engage"], EPISODE_XML).await;
        add_element(workspace, &mut mp, ElementType::Track, "track", "presenter/source", &["archive"], "video").await;
        add_element(workspace, &mut mp, ElementType::Attachment, "slides", "slides/source", &[], "slides").await;
        mp
    }

    async fn copy_of(assets: &InMemoryAssetManager, id: &str) -> MediaPackage {
        let snapshots = assets
            .find_snapshots(SnapshotQuery::for_media_package(id))
            .await
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        snapshots[0].media_package.clone()
    }

    fn flavor(value: &str) -> MediaPackageElementFlavor {
        value.parse().unwrap()
    }

    #[tokio::test]
    async fn test_creates_archived_copies() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let mp = source(workspace.as_ref()).await;

        let handler = DuplicateEventWorkflowOperationHandler::new(workspace.clone(), assets.clone());
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "2")
                .with_configuration("source-flavors", "presenter/source")
                .with_configuration("target-tags", "+copied,-archive"),
        );

        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Continue);
        assert_eq!(result.media_package.unwrap().elements().len(), 3);

        let first = result.properties.get(&duplicate_property(1)).unwrap();
        let second = result.properties.get(&duplicate_property(2)).unwrap();
        assert_ne!(first, second);
        assert!(!result.properties.contains_key(&duplicate_property(3)));

        let copy = copy_of(&assets, first).await;
        assert_eq!(copy.title(), Some("Lecture 1 (copy 1)"));
        assert_eq!(copy.language(), Some("en"));
        assert_eq!(copy.elements().len(), 2);
        assert!(copy.elements_by_flavor(&flavor("slides/source")).is_empty());

        let tracks = copy.elements_by_flavor(&flavor("presenter/source"));
        assert_eq!(tracks.len(), 1);
        assert_ne!(tracks[0].identifier(), Some("track"));
        assert_eq!(tracks[0].tags(), vec!["copied".to_string()]);
        let data = workspace.read(tracks[0].uri().unwrap()).await.unwrap();
        assert_eq!(&data[..], b"video");

        let episodes = copy.catalogs_by_flavor(&episode_dublin_core());
        assert_eq!(episodes.len(), 1);
        assert!(episodes[0].contains_tag("engage"));
        assert!(episodes[0].contains_tag("copied"));
        let catalog = load_dublin_core(workspace.as_ref(), episodes[0]).await.unwrap();
        assert_eq!(catalog.get_first(&term(property::TITLE)), Some("Lecture 1 (copy 1)"));

        let copy = copy_of(&assets, second).await;
        assert_eq!(copy.title(), Some("Lecture 1 (copy 2)"));
    }

    #[tokio::test]
    async fn test_title_suffix_options() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let mp = source(workspace.as_ref()).await;
        let handler = DuplicateEventWorkflowOperationHandler::new(workspace.clone(), assets.clone());

        let wf = workflow(
            mp.clone(),
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "1")
                .with_configuration(COPY_NUMBER_PREFIX, "Kopie"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        let copy = copy_of(&assets, &result.properties[&duplicate_property(1)]).await;
        assert_eq!(copy.title(), Some("Lecture 1 (Kopie 1)"));

        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "1")
                .with_configuration(NO_SUFFIX, "true"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        let copy = copy_of(&assets, &result.properties[&duplicate_property(1)]).await;
        assert_eq!(copy.title(), Some("Lecture 1"));
    }

    #[tokio::test]
    async fn test_copies_properties_of_listed_namespaces() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let mp = source(workspace.as_ref()).await;
        assets.take_snapshot("test", &mp).await.unwrap();
        for namespace in ["org.test", "org.other"] {
            assets
                .set_property(Property {
                    media_package_id: "source".to_string(),
                    namespace: namespace.to_string(),
                    name: "state".to_string(),
                    value: "reviewed".to_string(),
                })
                .await
                .unwrap();
        }

        let handler = DuplicateEventWorkflowOperationHandler::new(workspace, assets.clone());
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "1")
                .with_configuration(PROPERTY_NAMESPACES, "org.test"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        let copy_id = &result.properties[&duplicate_property(1)];

        let copied = assets.properties(copy_id).await;
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].namespace, "org.test");
        assert_eq!(copied[0].value, "reviewed");
        assert_eq!(assets.properties("source").await.len(), 2);
    }

    #[tokio::test]
    async fn test_assigns_copies_to_other_series() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let series_service = Arc::new(InMemorySeriesService::new());
        let acl = AccessControlList::new(vec![AccessControlEntry::new("ROLE_STUDENT", "read", true)]);
        series_service.insert_series("s2", SERIES_XML, acl).await;

        let mut mp = source(workspace.as_ref()).await;
        mp.set_series(Some("s1".to_string()));
        add_element(workspace.as_ref(), &mut mp, ElementType::Catalog, "series", "dublincore/series", &[], SERIES_XML).await;
        add_element(workspace.as_ref(), &mut mp, ElementType::Attachment, "acl", "security/xacml+series", &["archive"], "<policy/>").await;

        let handler = DuplicateEventWorkflowOperationHandler::new(workspace.clone(), assets.clone())
            .with_series_service(series_service);
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "1")
                .with_configuration("source-flavors", "*/*")
                .with_configuration(SET_SERIES_ID, "s2"),
        );
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        let copy = copy_of(&assets, &result.properties[&duplicate_property(1)]).await;

        assert_eq!(copy.series(), Some("s2"));
        assert_eq!(copy.series_title(), Some("Compilers"));
        let series_catalogs = copy.catalogs_by_flavor(&series_dublin_core());
        assert_eq!(series_catalogs.len(), 1);
        assert_ne!(series_catalogs[0].identifier(), Some("series"));
        let acls = copy.attachments_by_flavor(&xacml_policy_series());
        assert_eq!(acls.len(), 1);
        assert!(acls[0].contains_tag("archive"));

        let episode = copy.catalogs_by_flavor(&episode_dublin_core());
        let catalog = load_dublin_core(workspace.as_ref(), episode[0]).await.unwrap();
        assert_eq!(catalog.get_first(&term(property::IS_PART_OF)), Some("s2"));
    }

    #[tokio::test]
    async fn test_too_many_copies_fails() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let mp = source(workspace.as_ref()).await;
        let handler = DuplicateEventWorkflowOperationHandler::new(workspace, assets.clone());

        let wf = workflow(
            mp.clone(),
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration(NUMBER_OF_EVENTS, "26"),
        );
        assert!(matches!(
            handler.start(&wf, &JobContext::default()).await,
            Err(WorkflowOperationError::InvalidConfiguration(_))
        ));

        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "3")
                .with_configuration(MAX_NUMBER_OF_EVENTS, "2"),
        );
        assert!(handler.start(&wf, &JobContext::default()).await.is_err());
        assert!(assets
            .find_snapshots(SnapshotQuery::for_media_package("source"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_invalid_configuration() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let mp = source(workspace.as_ref()).await;
        let handler = DuplicateEventWorkflowOperationHandler::new(workspace, assets);

        let missing = workflow(mp.clone(), WorkflowOperationInstance::new(OPERATION_ID));
        assert!(handler.start(&missing, &JobContext::default()).await.is_err());

        let garbled = workflow(
            mp.clone(),
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration(NUMBER_OF_EVENTS, "two"),
        );
        assert!(handler.start(&garbled, &JobContext::default()).await.is_err());

        let no_series_service = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID)
                .with_configuration(NUMBER_OF_EVENTS, "1")
                .with_configuration(SET_SERIES_ID, "s2"),
        );
        assert!(matches!(
            handler.start(&no_series_service, &JobContext::default()).await,
            Err(WorkflowOperationError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_requires_single_episode_catalog() {
        let workspace = workspace("duplicate");
        let assets = Arc::new(InMemoryAssetManager::new());
        let mut mp = MediaPackage::with_id("source");
        add_element(workspace.as_ref(), &mut mp, ElementType::Track, "track", "presenter/source", &[], "video").await;

        let handler = DuplicateEventWorkflowOperationHandler::new(workspace, assets);
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration(NUMBER_OF_EVENTS, "1"),
        );
        assert!(matches!(
            handler.start(&wf, &JobContext::default()).await,
            Err(WorkflowOperationError::Failed(_))
        ));
    }
}
