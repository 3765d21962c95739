//! Distribution Service Abstraction

use async_trait::async_trait;
use core_mediapackage::MediaPackage;

use crate::error::Result;
use crate::registry::Job;

/// Publishes element files to a publication channel
///
/// Both operations return a job; once finished, its payload holds the
/// distributed (or retracted) elements as an element list document.
#[async_trait]
pub trait DistributionService: Send + Sync {
    async fn distribute(
        &self,
        channel_id: &str,
        media_package: &MediaPackage,
        element_ids: &[String],
        check_availability: bool,
    ) -> Result<Job>;

    async fn retract(
        &self,
        channel_id: &str,
        media_package: &MediaPackage,
        element_ids: &[String],
    ) -> Result<Job>;
}
