//! Helpers shared by the publication handlers

use bridge_traits::DistributionService;
use core_mediapackage::{MediaPackage, MediaPackageElement};
use tracing::{debug, info};

use crate::error::{Result, WorkflowOperationError};
use crate::job_barrier::JobBarrier;

pub const CHANNEL_ID: &str = "channel-id";

/// Publications of `media_package` on `channel_id`.
pub(crate) fn publications_on<'a>(
    media_package: &'a MediaPackage,
    channel_id: &str,
) -> Vec<&'a MediaPackageElement> {
    media_package
        .publications()
        .into_iter()
        .filter(|p| {
            p.as_publication()
                .map(|details| details.channel == channel_id)
                .unwrap_or(false)
        })
        .collect()
}

/// Retracts every publication on `channel_id` and removes it from the
/// media package.
///
/// Returns the number of publications removed.
pub(crate) async fn retract_publications(
    distribution: &dyn DistributionService,
    barrier: &JobBarrier,
    media_package: &mut MediaPackage,
    channel_id: &str,
) -> Result<usize> {
    let publications: Vec<(String, Vec<String>)> = publications_on(media_package, channel_id)
        .into_iter()
        .filter_map(|p| {
            let id = p.identifier()?.to_string();
            let elements = p
                .as_publication()
                .map(|details| {
                    details
                        .elements()
                        .filter_map(|e| e.identifier().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            Some((id, elements))
        })
        .collect();

    for (publication_id, element_ids) in &publications {
        if !element_ids.is_empty() {
            let job = distribution
                .retract(channel_id, media_package, element_ids)
                .await?;
            if !barrier.wait_for(&[job]).await?.is_success() {
                return Err(WorkflowOperationError::JobFailed(format!(
                    "The retract job for publication {} did not complete successfully",
                    publication_id
                )));
            }
        }
        debug!(channel = channel_id, publication = %publication_id, "Retracted publication");
        media_package.remove_by_id(publication_id);
    }

    if !publications.is_empty() {
        info!(
            media_package = %media_package.identifier(),
            channel = channel_id,
            count = publications.len(),
            "Retracted publications"
        );
    }
    Ok(publications.len())
}
