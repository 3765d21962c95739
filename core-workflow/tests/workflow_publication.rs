use bridge_local::{FilesystemWorkspace, InMemoryServiceRegistry, LocalDistributionService};
use bridge_traits::Workspace;
use bytes::Bytes;
use core_mediapackage::{MediaPackage, MediaPackageElement};
use core_workflow::handlers::{
    CleanupWorkflowOperationHandler, ConfigurablePublishWorkflowOperationHandler,
    ConfigurableRetractWorkflowOperationHandler, TagWorkflowOperationHandler,
};
use core_workflow::{
    Action, JobContext, WorkflowInstance, WorkflowOperationHandler, WorkflowOperationInstance,
    WorkflowState,
};
use std::sync::Arc;
use std::time::Duration;

struct Services {
    workspace: Arc<FilesystemWorkspace>,
    registry: Arc<InMemoryServiceRegistry>,
    distribution: Arc<LocalDistributionService>,
}

fn services() -> Services {
    let root = std::env::temp_dir()
        .join("core-workflow-tests")
        .join(format!("publication-{}", uuid::Uuid::new_v4()));
    let workspace = Arc::new(FilesystemWorkspace::in_directory(&root.join("workspace")));
    let registry = Arc::new(InMemoryServiceRegistry::new());
    let distribution = Arc::new(LocalDistributionService::new(
        root.join("published"),
        workspace.clone(),
        registry.clone(),
    ));
    Services {
        workspace,
        registry,
        distribution,
    }
}

async fn media_package(workspace: &FilesystemWorkspace) -> MediaPackage {
    let mut mp = MediaPackage::with_id("event-1");
    for (id, flavor) in [("t1", "presenter/source"), ("t2", "presentation/source")] {
        let uri = workspace
            .put("event-1", id, "video.mp4", Bytes::from(format!("video {}", id)))
            .await
            .unwrap();
        let mut track = MediaPackageElement::track(uri);
        track.set_identifier(Some(id.to_string()));
        track.set_flavor(Some(flavor.parse().unwrap()));
        mp.add(track);
    }
    mp
}

async fn run(handler: &dyn WorkflowOperationHandler, workflow: &mut WorkflowInstance) -> Action {
    workflow.start_current().unwrap();
    let context = JobContext::for_workflow(workflow.id());
    let result = handler.start(workflow, &context).await.unwrap();
    let action = result.action;
    workflow.apply_result(result).unwrap();
    action
}

#[tokio::test]
async fn test_tag_publish_retract_cleanup() {
    let services = services();
    let mp = media_package(&services.workspace).await;

    let tag = TagWorkflowOperationHandler::new(services.workspace.clone());
    let publish = ConfigurablePublishWorkflowOperationHandler::new(
        services.distribution.clone(),
        services.registry.clone(),
        Duration::from_millis(5),
    )
    .with_timeout(Duration::from_secs(5));
    let retract = ConfigurableRetractWorkflowOperationHandler::new(
        services.distribution.clone(),
        services.registry.clone(),
        Duration::from_millis(5),
    );
    let cleanup = CleanupWorkflowOperationHandler::new(services.workspace.clone())
        .with_default_delay(Duration::ZERO);

    let mut workflow = WorkflowInstance::new(
        42,
        mp,
        vec![
            WorkflowOperationInstance::new("tag")
                .with_configuration("source-flavors", "*/source")
                .with_configuration("target-tags", "+engage"),
            WorkflowOperationInstance::new("publish-configure")
                .with_configuration("channel-id", "engage-player")
                .with_configuration("download-source-tags", "engage")
                .with_configuration("mode", "mixed")
                .with_configuration("url-pattern", "http://player.local/watch/${event_id}"),
            WorkflowOperationInstance::new("retract-configure")
                .with_configuration("channel-id", "engage-player"),
            WorkflowOperationInstance::new("cleanup"),
        ],
    );

    assert_eq!(run(&tag, &mut workflow).await, Action::Continue);
    assert_eq!(workflow.media_package().elements_by_tags(&["engage"]).len(), 2);

    assert_eq!(run(&publish, &mut workflow).await, Action::Continue);
    let publications = workflow.media_package().publications();
    assert_eq!(publications.len(), 1);
    assert_eq!(
        publications[0].uri().map(|u| u.as_str()),
        Some("http://player.local/watch/event-1")
    );
    let published: Vec<_> = publications[0]
        .as_publication()
        .unwrap()
        .elements()
        .map(|e| e.uri().unwrap().to_file_path().unwrap())
        .collect();
    assert_eq!(published.len(), 2);
    assert!(published.iter().all(|path| path.exists()));

    assert_eq!(run(&retract, &mut workflow).await, Action::Continue);
    assert!(workflow.media_package().publications().is_empty());
    assert!(published.iter().all(|path| !path.exists()));

    assert_eq!(run(&cleanup, &mut workflow).await, Action::Continue);
    assert!(workflow.media_package().elements().is_empty());
    assert_eq!(workflow.state(), WorkflowState::Succeeded);
}
