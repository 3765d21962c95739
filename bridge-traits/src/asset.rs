//! Asset Manager Abstraction
//!
//! The asset manager archives versioned snapshots of media packages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_mediapackage::MediaPackage;

use crate::error::Result;

/// Archived version of a media package
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub owner: String,
    pub archival_date: DateTime<Utc>,
    pub media_package: MediaPackage,
}

/// Filter for [`AssetManager::find_snapshots`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotQuery {
    pub media_package_id: String,
    pub version: Option<u64>,
    pub owner: Option<String>,
}

impl SnapshotQuery {
    /// All versions of a media package.
    pub fn for_media_package(media_package_id: impl Into<String>) -> Self {
        Self {
            media_package_id: media_package_id.into(),
            version: None,
            owner: None,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        snapshot.media_package.identifier() == self.media_package_id
            && self.version.map(|v| v == snapshot.version).unwrap_or(true)
            && self
                .owner
                .as_ref()
                .map(|o| *o == snapshot.owner)
                .unwrap_or(true)
    }
}

/// Named value attached to an archived media package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub media_package_id: String,
    pub namespace: String,
    pub name: String,
    pub value: String,
}

#[async_trait]
pub trait AssetManager: Send + Sync {
    /// Archive the current state of `media_package` as a new version.
    async fn take_snapshot(&self, owner: &str, media_package: &MediaPackage) -> Result<Snapshot>;

    /// Matching snapshots, newest version first.
    async fn find_snapshots(&self, query: SnapshotQuery) -> Result<Vec<Snapshot>>;

    /// Returns `false` when the media package has never been archived.
    async fn set_property(&self, property: Property) -> Result<bool>;

    /// Properties of a media package within one namespace.
    async fn find_properties(&self, media_package_id: &str, namespace: &str) -> Result<Vec<Property>>;
}
