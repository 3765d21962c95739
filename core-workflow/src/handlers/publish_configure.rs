//! `publish-configure` operation
//!
//! ## Overview
//!
//! Distributes the elements selected by `download-source-flavors` and
//! `download-source-tags` to the channel named by `channel-id` and records
//! the result as a publication of the media package.
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `channel-id` | Target channel, required |
//! | `mode` | `bulk` (default), `single` or `mixed` job layout |
//! | `strategy` | `retract` (default), `merge` or `fail` when the channel is already published |
//! | `url-pattern` | Publication URL with `${event_id}`, `${publication_id}` and `${series_id}` |
//! | `mimetype` | MIME type of the publication |
//! | `with-published-elements` | Select from existing publications instead of distributing |
//! | `check-availability` | Ask the distribution service to verify the published files |

use async_trait::async_trait;
use bridge_traits::{DistributionService, Job, ServiceRegistry};
use core_mediapackage::{
    ElementBody, ElementType, MediaPackage, MediaPackageElement, MediaPackageParser, MimeType,
    PublicationDetails,
};
use futures::future::try_join_all;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::publication::{publications_on, retract_publications, CHANNEL_ID};
use crate::error::{Result, WorkflowOperationError};
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::job_barrier::JobBarrier;
use crate::operation_config::current_operation;
use crate::selector::SimpleElementSelector;

pub const OPERATION_ID: &str = "publish-configure";
pub const DOWNLOAD_SOURCE_FLAVORS: &str = "download-source-flavors";
pub const DOWNLOAD_SOURCE_TAGS: &str = "download-source-tags";
pub const MIME_TYPE: &str = "mimetype";
pub const WITH_PUBLISHED_ELEMENTS: &str = "with-published-elements";
pub const CHECK_AVAILABILITY: &str = "check-availability";
pub const STRATEGY: &str = "strategy";
pub const MODE: &str = "mode";
pub const URL_PATTERN: &str = "url-pattern";

const EVENT_ID_VARIABLE: &str = "${event_id}";
const PUBLICATION_ID_VARIABLE: &str = "${publication_id}";
const SERIES_ID_VARIABLE: &str = "${series_id}";

/// How selected elements are split into distribution jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionMode {
    /// One job for all elements
    #[default]
    Bulk,
    /// One job per element
    Single,
    /// Tracks one per job, everything else in a single job
    Mixed,
}

impl FromStr for DistributionMode {
    type Err = WorkflowOperationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "bulk" => Ok(Self::Bulk),
            "single" => Ok(Self::Single),
            "mixed" => Ok(Self::Mixed),
            other => Err(WorkflowOperationError::InvalidConfiguration(format!(
                "Unknown value for configuration key {}: '{}'",
                MODE, other
            ))),
        }
    }
}

/// What to do when the channel already holds a publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepublishStrategy {
    #[default]
    Retract,
    Merge,
    Fail,
}

impl RepublishStrategy {
    /// Unknown values fall back to retracting.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("merge") => Self::Merge,
            Some("fail") => Self::Fail,
            _ => Self::Retract,
        }
    }
}

/// Replaces the publication variables in `pattern`.
pub fn populate_url(pattern: &str, mp: &MediaPackage, publication_id: &str) -> Result<Url> {
    let replaced = pattern
        .replace(EVENT_ID_VARIABLE, mp.identifier())
        .replace(PUBLICATION_ID_VARIABLE, publication_id)
        .replace(SERIES_ID_VARIABLE, mp.series().unwrap_or_default().trim());
    Url::parse(&replaced).map_err(|e| {
        WorkflowOperationError::InvalidConfiguration(format!(
            "Unable to create URI from template '{}', replacement was: '{}': {}",
            pattern, replaced, e
        ))
    })
}

pub struct ConfigurablePublishWorkflowOperationHandler {
    distribution: Arc<dyn DistributionService>,
    barrier: JobBarrier,
}

impl ConfigurablePublishWorkflowOperationHandler {
    pub fn new(
        distribution: Arc<dyn DistributionService>,
        registry: Arc<dyn ServiceRegistry>,
        polling_interval: Duration,
    ) -> Self {
        Self {
            distribution,
            barrier: JobBarrier::new(registry, polling_interval),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.barrier = self.barrier.with_timeout(timeout);
        self
    }

    /// Groups `elements` into the id lists of the distribution jobs.
    fn job_batches(mode: DistributionMode, elements: &[&MediaPackageElement]) -> Vec<Vec<String>> {
        let ids = |elements: &[&MediaPackageElement]| -> Vec<String> {
            elements
                .iter()
                .filter_map(|e| e.identifier().map(str::to_string))
                .collect()
        };
        let batches = match mode {
            DistributionMode::Bulk => vec![ids(elements)],
            DistributionMode::Single => ids(elements).into_iter().map(|id| vec![id]).collect(),
            DistributionMode::Mixed => {
                let (tracks, others): (Vec<&MediaPackageElement>, Vec<&MediaPackageElement>) = elements
                    .iter()
                    .copied()
                    .partition(|e| e.element_type() == ElementType::Track);
                let mut batches = vec![ids(&others)];
                batches.extend(ids(&tracks).into_iter().map(|id| vec![id]));
                batches
            }
        };
        batches.into_iter().filter(|batch| !batch.is_empty()).collect()
    }

    /// Distributes the selected elements and returns the published copies.
    async fn distribute(
        &self,
        mp: &MediaPackage,
        channel_id: &str,
        mode: DistributionMode,
        selected: &[&MediaPackageElement],
        check_availability: bool,
    ) -> Result<Vec<MediaPackageElement>> {
        let batches = Self::job_batches(mode, selected);
        debug!(
            channel = channel_id,
            mode = ?mode,
            jobs = batches.len(),
            "Starting distribution jobs"
        );
        let jobs: Vec<Job> = try_join_all(batches.iter().map(|ids| {
            self.distribution
                .distribute(channel_id, mp, ids, check_availability)
        }))
        .await?;

        let result = self.barrier.wait_for(&jobs).await?;
        if !result.is_success() {
            return Err(WorkflowOperationError::JobFailed(
                "At least one of the distribution jobs did not complete successfully".to_string(),
            ));
        }

        let mut published = Vec::new();
        for job in result.jobs() {
            let Some(payload) = job.payload.as_deref() else {
                warn!(job = job.id, "Distribution job finished without payload");
                continue;
            };
            published.extend(MediaPackageParser::elements_from_xml(payload)?);
        }
        Ok(published)
    }
}

#[async_trait]
impl WorkflowOperationHandler for ConfigurablePublishWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Publish elements to a configurable channel"
    }

    async fn start(
        &self,
        workflow: &WorkflowInstance,
        _context: &JobContext,
    ) -> Result<WorkflowOperationResult> {
        let operation = current_operation(workflow)?;
        let mut mp = workflow.media_package().clone();

        let channel_id = operation.opt_config(CHANNEL_ID).ok_or_else(|| {
            WorkflowOperationError::InvalidConfiguration(format!(
                "Unable to publish this media package as the configuration key {} is missing. \
                 Unable to determine where to publish these elements.",
                CHANNEL_ID
            ))
        })?;
        let url_pattern = operation.opt_config(URL_PATTERN);
        let mime_type = operation
            .opt_config(MIME_TYPE)
            .map(|value| {
                MimeType::from_str(value).map_err(|_| {
                    WorkflowOperationError::InvalidConfiguration(format!(
                        "Unable to parse the provided configuration for {}",
                        MIME_TYPE
                    ))
                })
            })
            .transpose()?;
        let with_published = operation.bool_config(WITH_PUBLISHED_ELEMENTS);
        let check_availability = operation.bool_config(CHECK_AVAILABILITY);

        if !publications_on(&mp, channel_id).is_empty() {
            match RepublishStrategy::parse(operation.opt_config(STRATEGY)) {
                RepublishStrategy::Fail => {
                    return Err(WorkflowOperationError::Failed(format!(
                        "There is already a publication on channel {} for media package {}",
                        channel_id,
                        mp.identifier()
                    )))
                }
                RepublishStrategy::Merge => {}
                RepublishStrategy::Retract => {
                    retract_publications(self.distribution.as_ref(), &self.barrier, &mut mp, channel_id)
                        .await?;
                }
            }
        }

        let mode: DistributionMode = operation.config_or(MODE, "").parse()?;
        let selector = SimpleElementSelector::new()
            .with_flavors(operation.flavors_config(DOWNLOAD_SOURCE_FLAVORS)?)
            .with_tags(operation.list_config(DOWNLOAD_SOURCE_TAGS));

        let publication_id = Uuid::new_v4().to_string();
        let mut details = PublicationDetails {
            channel: channel_id.to_string(),
            ..Default::default()
        };

        if with_published {
            let existing: Vec<&MediaPackageElement> = mp
                .publications()
                .into_iter()
                .filter_map(|p| p.as_publication())
                .flat_map(|p| p.elements())
                .collect();
            for element in selector.select_from(existing, false) {
                details.add(element.clone())?;
            }
        } else {
            let selected = selector.select(&mp, false);
            if !selected.is_empty() {
                for mut element in self
                    .distribute(&mp, channel_id, mode, &selected, check_availability)
                    .await?
                {
                    element.generate_identifier();
                    details.add(element)?;
                }
            }
        }

        if details.elements().next().is_none() {
            info!(
                media_package = %mp.identifier(),
                channel = channel_id,
                "No elements found for publication"
            );
            return Ok(WorkflowOperationResult::of(mp, Action::Skip));
        }

        let uri = url_pattern
            .map(|pattern| populate_url(pattern, &mp, &publication_id))
            .transpose()?;
        let mut publication = MediaPackageElement::with_body(ElementBody::Publication(details), uri);
        publication.set_identifier(Some(publication_id.clone()));
        publication.set_mime_type(mime_type);
        mp.add(publication);

        info!(
            media_package = %mp.identifier(),
            channel = channel_id,
            publication = %publication_id,
            "Published media package"
        );
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}
