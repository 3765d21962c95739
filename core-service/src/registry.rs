//! Operation handler registry

use core_runtime::config::CoreConfig;
use core_workflow::handlers::{
    CleanupWorkflowOperationHandler, CloneWorkflowOperationHandler,
    ConfigurablePublishWorkflowOperationHandler, ConfigurableRetractWorkflowOperationHandler,
    DefaultsWorkflowOperationHandler, DuplicateEventWorkflowOperationHandler,
    ErrorResolutionWorkflowOperationHandler,
    SelectVersionWorkflowOperationHandler, SeriesWorkflowOperationHandler,
    SnapshotWorkflowOperationHandler, TagByDublinCoreTermWorkflowOperationHandler,
    TagWorkflowOperationHandler,
};
use core_workflow::WorkflowOperationHandler;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Handlers by operation id
#[derive(Default, Clone)]
pub struct OperationHandlerRegistry {
    handlers: HashMap<String, Arc<dyn WorkflowOperationHandler>>,
}

impl OperationHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every handler whose collaborators are present in `config`.
    pub fn from_config(config: &CoreConfig) -> Self {
        let settings = &config.settings;
        let workspace = &config.workspace;
        let mut registry = Self::new();

        registry.register(Arc::new(TagWorkflowOperationHandler::new(workspace.clone())));
        registry.register(Arc::new(CloneWorkflowOperationHandler::new(workspace.clone())));
        registry.register(Arc::new(
            CleanupWorkflowOperationHandler::new(workspace.clone())
                .with_default_delay(settings.cleanup_delay),
        ));
        registry.register(Arc::new(TagByDublinCoreTermWorkflowOperationHandler::new(
            workspace.clone(),
        )));
        registry.register(Arc::new(ErrorResolutionWorkflowOperationHandler::new()));
        registry.register(Arc::new(DefaultsWorkflowOperationHandler::new()));

        if let Some(series_service) = &config.series_service {
            registry.register(Arc::new(SeriesWorkflowOperationHandler::new(
                workspace.clone(),
                series_service.clone(),
            )));
        }

        if let Some(asset_manager) = &config.asset_manager {
            registry.register(Arc::new(
                SnapshotWorkflowOperationHandler::new(asset_manager.clone())
                    .with_owner(settings.snapshot_owner.clone()),
            ));
            registry.register(Arc::new(SelectVersionWorkflowOperationHandler::new(
                asset_manager.clone(),
            )));
            let mut duplicate =
                DuplicateEventWorkflowOperationHandler::new(workspace.clone(), asset_manager.clone())
                    .with_owner(settings.snapshot_owner.clone());
            if let Some(series_service) = &config.series_service {
                duplicate = duplicate.with_series_service(series_service.clone());
            }
            registry.register(Arc::new(duplicate));
        }

        if let (Some(distribution), Some(service_registry)) =
            (&config.distribution_service, &config.service_registry)
        {
            let mut publish = ConfigurablePublishWorkflowOperationHandler::new(
                distribution.clone(),
                service_registry.clone(),
                settings.job_polling_interval,
            );
            let mut retract = ConfigurableRetractWorkflowOperationHandler::new(
                distribution.clone(),
                service_registry.clone(),
                settings.job_polling_interval,
            );
            if let Some(timeout) = settings.job_timeout {
                publish = publish.with_timeout(timeout);
                retract = retract.with_timeout(timeout);
            }
            registry.register(Arc::new(publish));
            registry.register(Arc::new(retract));
        }

        info!(operations = ?registry.operation_ids(), "Registered operation handlers");
        registry
    }

    /// Adds `handler` under its id, replacing an earlier registration.
    pub fn register(&mut self, handler: Arc<dyn WorkflowOperationHandler>) {
        let id = handler.id().to_string();
        debug!(operation = %id, "Registering operation handler");
        self.handlers.insert(id, handler);
    }

    pub fn handler(&self, operation_id: &str) -> Option<Arc<dyn WorkflowOperationHandler>> {
        self.handlers.get(operation_id).cloned()
    }

    /// Registered operation ids, sorted.
    pub fn operation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.handlers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_local::{
        FilesystemWorkspace, InMemoryAssetManager, InMemorySeriesService, InMemoryServiceRegistry,
        LocalDistributionService,
    };

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir()
            .join("core-service-tests")
            .join(format!("registry-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_minimal_config_registers_workspace_handlers() {
        let config = CoreConfig::builder()
            .workspace(Arc::new(FilesystemWorkspace::in_directory(&temp_dir())))
            .build()
            .unwrap();
        let registry = OperationHandlerRegistry::from_config(&config);

        assert_eq!(
            registry.operation_ids(),
            vec![
                "cleanup",
                "clone",
                "defaults",
                "error-resolution",
                "tag",
                "tag-by-dcterm",
            ]
        );
        assert!(registry.handler("series").is_none());
    }

    #[test]
    fn test_full_config_registers_all_handlers() {
        let root = temp_dir();
        let workspace = Arc::new(FilesystemWorkspace::in_directory(&root));
        let jobs = Arc::new(InMemoryServiceRegistry::new());
        let config = CoreConfig::builder()
            .workspace(workspace.clone())
            .series_service(Arc::new(InMemorySeriesService::new()))
            .asset_manager(Arc::new(InMemoryAssetManager::new()))
            .distribution_service(Arc::new(LocalDistributionService::new(
                root.join("published"),
                workspace,
                jobs.clone(),
            )))
            .service_registry(jobs)
            .build()
            .unwrap();
        let registry = OperationHandlerRegistry::from_config(&config);

        assert_eq!(registry.operation_ids().len(), 12);
        for id in [
            "series",
            "snapshot",
            "select-version",
            "duplicate-event",
            "publish-configure",
            "retract-configure",
        ] {
            assert_eq!(registry.handler(id).map(|h| h.id().to_string()), Some(id.to_string()));
        }
    }
}
