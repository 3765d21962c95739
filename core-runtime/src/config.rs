//! # Core Configuration Module
//!
//! Provides configuration management for the workflow operation runtime.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the collaborator services and the workflow settings.
//! It enforces fail-fast validation so that missing required collaborators are
//! reported before any handler is created.
//!
//! ## Required Dependencies
//!
//! - `Workspace` - Required for every handler that touches element files
//!
//! ## Optional Dependencies
//!
//! - `SeriesService` - Series handler
//! - `AssetManager` - Snapshot and version selection handlers
//! - `DistributionService` - Publish and retract handlers (needs a `ServiceRegistry`)
//! - `ServiceRegistry` - Job status lookups for the job barrier
//!
//! Handlers whose collaborators are absent are simply not registered.
//!
//! When the `local-defaults` feature is enabled, a filesystem workspace below
//! the working directory is injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .workspace(Arc::new(MyWorkspace))
//!     .series_service(Arc::new(MySeriesService))
//!     .snapshot_owner("workflow")
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AssetManager, DistributionService, SeriesService, ServiceRegistry, Workspace};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between two job status lookups.
pub const DEFAULT_JOB_POLLING_INTERVAL: Duration = Duration::from_millis(500);

/// Default owner name recorded on snapshots.
pub const DEFAULT_SNAPSHOT_OWNER: &str = "workflow";

/// Core configuration of the workflow operation runtime.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Element file storage (required)
    pub workspace: Arc<dyn Workspace>,

    /// Series metadata and access control (optional)
    pub series_service: Option<Arc<dyn SeriesService>>,

    /// Snapshot storage (optional)
    pub asset_manager: Option<Arc<dyn AssetManager>>,

    /// Publication channels (optional)
    pub distribution_service: Option<Arc<dyn DistributionService>>,

    /// Job lookups (optional)
    pub service_registry: Option<Arc<dyn ServiceRegistry>>,

    /// Workflow settings
    pub settings: WorkflowSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("workspace", &"Workspace { ... }")
            .field(
                "series_service",
                &self.series_service.as_ref().map(|_| "SeriesService { ... }"),
            )
            .field(
                "asset_manager",
                &self.asset_manager.as_ref().map(|_| "AssetManager { ... }"),
            )
            .field(
                "distribution_service",
                &self
                    .distribution_service
                    .as_ref()
                    .map(|_| "DistributionService { ... }"),
            )
            .field(
                "service_registry",
                &self
                    .service_registry
                    .as_ref()
                    .map(|_| "ServiceRegistry { ... }"),
            )
            .field("settings", &self.settings)
            .finish()
    }
}

/// Settings shared by all operation handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Interval between two job status lookups
    pub job_polling_interval: Duration,
    /// Give up waiting for jobs after this long (`None` waits forever)
    pub job_timeout: Option<Duration>,
    /// Delay before external deletions of the cleanup operation
    pub cleanup_delay: Duration,
    /// Owner name recorded on snapshots
    pub snapshot_owner: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            job_polling_interval: DEFAULT_JOB_POLLING_INTERVAL,
            job_timeout: None,
            cleanup_delay: Duration::ZERO,
            snapshot_owner: DEFAULT_SNAPSHOT_OWNER.to_string(),
        }
    }
}

impl WorkflowSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_polling_interval(mut self, interval: Duration) -> Self {
        self.job_polling_interval = interval;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    pub fn with_snapshot_owner(mut self, owner: impl Into<String>) -> Self {
        self.snapshot_owner = owner.into();
        self
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.job_polling_interval.is_zero() {
            return Err(Error::invalid_setting(
                "job_polling_interval",
                "must be greater than zero",
            ));
        }
        if self.job_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::invalid_setting(
                "job_timeout",
                "must be greater than zero when set",
            ));
        }
        if self.snapshot_owner.trim().is_empty() {
            return Err(Error::invalid_setting("snapshot_owner", "must not be empty"));
        }
        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - Workflow settings are consistent
    /// - Distribution has a service registry to wait for its jobs
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        if self.distribution_service.is_some() && self.service_registry.is_none() {
            return Err(Error::Config(
                "A DistributionService requires a ServiceRegistry to track its jobs. \
                 Provide one via .service_registry()"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "local-defaults"))]
fn workspace_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Workspace".to_string(),
        message: "No workspace provided. Supply one via CoreConfig::builder().workspace(...) \
                  or enable the `local-defaults` feature."
            .to_string(),
    }
}

#[cfg(feature = "local-defaults")]
fn provide_default_workspace(working_dir: Option<PathBuf>) -> Result<Arc<dyn Workspace>> {
    let root = working_dir.unwrap_or_else(|| std::env::temp_dir().join("mediapackage-workspace"));
    tracing::debug!(root = ?root, "Using local filesystem workspace");
    Ok(Arc::new(bridge_local::FilesystemWorkspace::in_directory(&root)))
}

#[cfg(not(feature = "local-defaults"))]
fn provide_default_workspace(_working_dir: Option<PathBuf>) -> Result<Arc<dyn Workspace>> {
    Err(workspace_missing_error())
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    workspace: Option<Arc<dyn Workspace>>,
    working_dir: Option<PathBuf>,
    series_service: Option<Arc<dyn SeriesService>>,
    asset_manager: Option<Arc<dyn AssetManager>>,
    distribution_service: Option<Arc<dyn DistributionService>>,
    service_registry: Option<Arc<dyn ServiceRegistry>>,
    settings: WorkflowSettings,
}

impl CoreConfigBuilder {
    /// Sets the workspace (required unless `local-defaults` is enabled).
    pub fn workspace(mut self, workspace: Arc<dyn Workspace>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Root directory of the default local workspace.
    ///
    /// Ignored when a workspace is set explicitly.
    pub fn working_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    pub fn series_service(mut self, service: Arc<dyn SeriesService>) -> Self {
        self.series_service = Some(service);
        self
    }

    pub fn asset_manager(mut self, manager: Arc<dyn AssetManager>) -> Self {
        self.asset_manager = Some(manager);
        self
    }

    /// Sets the distribution service.
    ///
    /// Requires a `ServiceRegistry` to be provided.
    pub fn distribution_service(mut self, service: Arc<dyn DistributionService>) -> Self {
        self.distribution_service = Some(service);
        self
    }

    pub fn service_registry(mut self, registry: Arc<dyn ServiceRegistry>) -> Self {
        self.service_registry = Some(registry);
        self
    }

    pub fn job_polling_interval(mut self, interval: Duration) -> Self {
        self.settings.job_polling_interval = interval;
        self
    }

    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.settings.job_timeout = Some(timeout);
        self
    }

    pub fn cleanup_delay(mut self, delay: Duration) -> Self {
        self.settings.cleanup_delay = delay;
        self
    }

    pub fn snapshot_owner(mut self, owner: impl Into<String>) -> Self {
        self.settings.snapshot_owner = owner.into();
        self
    }

    /// Sets all workflow settings at once.
    pub fn settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - No workspace is available
    /// - Workflow settings are invalid
    /// - Collaborators are inconsistent (distribution without registry)
    pub fn build(self) -> Result<CoreConfig> {
        let workspace = match self.workspace {
            Some(workspace) => workspace,
            None => provide_default_workspace(self.working_dir)?,
        };

        let config = CoreConfig {
            workspace,
            series_service: self.series_service,
            asset_manager: self.asset_manager,
            distribution_service: self.distribution_service,
            service_registry: self.service_registry,
            settings: self.settings,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{BridgeError, Job};
    use bytes::Bytes;
    use core_mediapackage::MediaPackage;
    use mockall::mock;
    use std::path::PathBuf;
    use url::Url;

    mock! {
        pub TestWorkspace {}

        #[async_trait::async_trait]
        impl Workspace for TestWorkspace {
            async fn put(
                &self,
                media_package_id: &str,
                element_id: &str,
                filename: &str,
                data: Bytes,
            ) -> std::result::Result<Url, BridgeError>;
            async fn get(&self, uri: &Url) -> std::result::Result<PathBuf, BridgeError>;
            async fn delete(&self, uri: &Url) -> std::result::Result<(), BridgeError>;
            async fn delete_from_repository(
                &self,
                media_package_id: &str,
                element_id: &str,
            ) -> std::result::Result<(), BridgeError>;
            async fn cleanup(&self, media_package_id: &str) -> std::result::Result<(), BridgeError>;
        }
    }

    mock! {
        pub TestDistribution {}

        #[async_trait::async_trait]
        impl DistributionService for TestDistribution {
            async fn distribute(
                &self,
                channel_id: &str,
                media_package: &MediaPackage,
                element_ids: &[String],
                check_availability: bool,
            ) -> std::result::Result<Job, BridgeError>;
            async fn retract(
                &self,
                channel_id: &str,
                media_package: &MediaPackage,
                element_ids: &[String],
            ) -> std::result::Result<Job, BridgeError>;
        }
    }

    mock! {
        pub TestRegistry {}

        #[async_trait::async_trait]
        impl ServiceRegistry for TestRegistry {
            async fn get_job(&self, id: u64) -> std::result::Result<Job, BridgeError>;
            async fn update_job(&self, job: Job) -> std::result::Result<Job, BridgeError>;
        }
    }

    fn workspace() -> Arc<dyn Workspace> {
        Arc::new(MockTestWorkspace::new())
    }

    #[test]
    fn test_builder_with_required_fields() {
        let config = CoreConfig::builder().workspace(workspace()).build().unwrap();

        assert!(config.series_service.is_none());
        assert!(config.distribution_service.is_none());
        assert_eq!(config.settings, WorkflowSettings::default());
        assert_eq!(config.settings.snapshot_owner, DEFAULT_SNAPSHOT_OWNER);
    }

    #[cfg(not(feature = "local-defaults"))]
    #[test]
    fn test_builder_requires_workspace() {
        let result = CoreConfig::builder().build();
        match result {
            Err(Error::CapabilityMissing { capability, .. }) => assert_eq!(capability, "Workspace"),
            other => panic!("Expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(feature = "local-defaults")]
    #[test]
    fn test_builder_injects_local_workspace() {
        let dir = std::env::temp_dir().join("core-runtime-config-test");
        assert!(CoreConfig::builder().working_dir(dir).build().is_ok());
    }

    #[test]
    fn test_builder_with_custom_settings() {
        let config = CoreConfig::builder()
            .workspace(workspace())
            .job_polling_interval(Duration::from_millis(10))
            .job_timeout(Duration::from_secs(5))
            .cleanup_delay(Duration::from_secs(2))
            .snapshot_owner("archive")
            .build()
            .unwrap();

        assert_eq!(config.settings.job_polling_interval, Duration::from_millis(10));
        assert_eq!(config.settings.job_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.settings.cleanup_delay, Duration::from_secs(2));
        assert_eq!(config.settings.snapshot_owner, "archive");
    }

    #[test]
    fn test_validate_rejects_zero_polling_interval() {
        let result = CoreConfig::builder()
            .workspace(workspace())
            .job_polling_interval(Duration::ZERO)
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidSetting { setting: "job_polling_interval", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_blank_snapshot_owner() {
        let result = CoreConfig::builder()
            .workspace(workspace())
            .settings(WorkflowSettings::new().with_snapshot_owner("  "))
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidSetting { setting: "snapshot_owner", .. })
        ));
    }

    #[test]
    fn test_validate_distribution_requires_registry() {
        let result = CoreConfig::builder()
            .workspace(workspace())
            .distribution_service(Arc::new(MockTestDistribution::new()))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));

        let config = CoreConfig::builder()
            .workspace(workspace())
            .distribution_service(Arc::new(MockTestDistribution::new()))
            .service_registry(Arc::new(MockTestRegistry::new()))
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_debug_hides_collaborators() {
        let config = CoreConfig::builder().workspace(workspace()).build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("Workspace { ... }"));
        assert!(debug.contains("series_service: None"));
    }
}
