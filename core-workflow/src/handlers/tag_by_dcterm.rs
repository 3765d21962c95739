//! `tag-by-dcterm` operation

use async_trait::async_trait;
use bridge_traits::Workspace;
use core_mediapackage::flavor::episode_dublin_core;
use core_mediapackage::EName;
use core_metadata::dublincore::TERMS_NS_URI;
use std::sync::Arc;
use tracing::{debug, info};

use super::load_dublin_core;
use super::tag::{tag_elements, COPY};
use crate::error::Result;
use crate::handler::WorkflowOperationHandler;
use crate::instance::{Action, JobContext, WorkflowInstance, WorkflowOperationResult};
use crate::operation_config::{current_operation, Configuration};
use crate::selector::SimpleElementSelector;
use crate::tags::TagDelta;

pub const OPERATION_ID: &str = "tag-by-dcterm";
pub const DCTERM: &str = "dcterm";
pub const MATCH_VALUE: &str = "match-value";
/// Value assumed when the episode catalog lacks the term
pub const DEFAULT_VALUE: &str = "default-value";
pub const NAMESPACE: &str = "namespace";

/// Tags elements depending on a value in the episode Dublin Core catalog
///
/// The selected elements are retagged like the `tag` operation does when
/// `dcterm` carries `match-value`, or when the term is absent and
/// `default-value` equals `match-value`.
pub struct TagByDublinCoreTermWorkflowOperationHandler {
    workspace: Arc<dyn Workspace>,
}

impl TagByDublinCoreTermWorkflowOperationHandler {
    pub fn new(workspace: Arc<dyn Workspace>) -> Self {
        Self { workspace }
    }

    /// Values of `term` across all episode catalogs.
    async fn term_values(&self, workflow: &WorkflowInstance, term: &EName) -> Result<Vec<String>> {
        let mp = workflow.media_package();
        let mut values = Vec::new();
        for catalog in mp.catalogs_by_flavor(&episode_dublin_core()) {
            let dc = load_dublin_core(self.workspace.as_ref(), catalog).await?;
            values.extend(dc.get(term).into_iter().map(str::to_string));
        }
        Ok(values)
    }
}

#[async_trait]
impl WorkflowOperationHandler for TagByDublinCoreTermWorkflowOperationHandler {
    fn id(&self) -> &str {
        OPERATION_ID
    }

    fn description(&self) -> &str {
        "Modify tags and flavors depending on a Dublin Core term"
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
            Configuration::One,
        )?;
        let dcterm = operation.config(DCTERM)?;
        let match_value = operation.config(MATCH_VALUE)?;
        let default_value = operation.opt_config(DEFAULT_VALUE);
        let namespace = operation.config_or(NAMESPACE, TERMS_NS_URI);
        let copy = operation.bool_config(COPY);

        let mut mp = workflow.media_package().clone();
        if config.has_no_source() {
            info!(media_package = %mp.identifier(), "No source tags or flavors configured, skipping");
            return Ok(WorkflowOperationResult::of(mp, Action::Skip));
        }

        let term = EName::new(namespace, dcterm);
        let values = self.term_values(workflow, &term).await?;
        let matched = if values.is_empty() {
            default_value == Some(match_value)
        } else {
            values.iter().any(|v| v == match_value)
        };
        debug!(term = %term, values = ?values, matched, "Evaluated Dublin Core term");

        if !matched {
            info!(
                media_package = %mp.identifier(),
                term = %term,
                "Term does not carry the match value, nothing to tag"
            );
            return Ok(WorkflowOperationResult::of(mp, Action::Continue));
        }

        let selected: Vec<String> = SimpleElementSelector::new()
            .with_flavors(config.source_flavors.iter().cloned())
            .with_tags(&config.source_tags)
            .select(&mp, false)
            .iter()
            .filter_map(|e| e.identifier().map(str::to_string))
            .collect();

        tag_elements(
            self.workspace.as_ref(),
            &mut mp,
            &selected,
            config.single_target_flavor(),
            &TagDelta::parse(&config.target_tags),
            copy,
        )
        .await?;

        info!(
            media_package = %mp.identifier(),
            term = %term,
            count = selected.len(),
            "Tagged elements by Dublin Core term"
        );
        Ok(WorkflowOperationResult::of(mp, Action::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{add_element, workflow, workspace};
    use crate::instance::WorkflowOperationInstance;
    use core_mediapackage::{ElementType, MediaPackage};

    const EPISODE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<dublincore xmlns="http://www.opencastproject.org/xsd/1.0/dublincore/"
            xmlns:dcterms="http://purl.org/dc/terms/">
  <dcterms:title>Lecture 1</dcterms:title>
  <dcterms:license>CC-BY</dcterms:license>
</dublincore>"#;

    async fn setup() -> (TagByDublinCoreTermWorkflowOperationHandler, MediaPackage) {
        let workspace = workspace("tag-by-dcterm");
        let mut mp = MediaPackage::with_id("mp");
        add_element(workspace.as_ref(), &mut mp, ElementType::Catalog, "dc", "dublincore/episode", &[], EPISODE_XML).await;
        add_element(workspace.as_ref(), &mut mp, ElementType::Track, "t1", "presenter/source", &["archive"], "video").await;
        (TagByDublinCoreTermWorkflowOperationHandler::new(workspace), mp)
    }

    fn operation(term: &str, value: &str) -> WorkflowOperationInstance {
        WorkflowOperationInstance::new(OPERATION_ID)
            .with_configuration("source-flavors", "presenter/source")
            .with_configuration("target-tags", "+licensed,-archive")
            .with_configuration("target-flavor", "presenter/licensed")
            .with_configuration(DCTERM, term)
            .with_configuration(MATCH_VALUE, value)
    }

    #[tokio::test]
    async fn test_tags_on_match() {
        let (handler, mp) = setup().await;
        let wf = workflow(mp, operation("license", "CC-BY"));
        let mp = handler
            .start(&wf, &JobContext::default())
            .await
            .unwrap()
            .media_package
            .unwrap();

        let track = mp.element_by_id("t1").unwrap();
        assert_eq!(track.tags(), vec!["licensed".to_string()]);
        assert_eq!(track.flavor().map(ToString::to_string), Some("presenter/licensed".to_string()));
    }

    #[tokio::test]
    async fn test_no_match_leaves_elements() {
        let (handler, mp) = setup().await;
        let wf = workflow(mp, operation("license", "ALL-RIGHTS-RESERVED"));
        let result = handler.start(&wf, &JobContext::default()).await.unwrap();
        assert_eq!(result.action, Action::Continue);
        let track = result.media_package.unwrap();
        assert!(track.element_by_id("t1").unwrap().contains_tag("archive"));
    }

    #[tokio::test]
    async fn test_default_value_for_missing_term() {
        let (handler, mp) = setup().await;
        let wf = workflow(
            mp,
            operation("rightsHolder", "unknown")
                .with_configuration(DEFAULT_VALUE, "unknown")
                .with_configuration(COPY, "true"),
        );
        let mp = handler
            .start(&wf, &JobContext::default())
            .await
            .unwrap()
            .media_package
            .unwrap();

        assert!(mp.element_by_id("t1").unwrap().contains_tag("archive"));
        let copies = mp.elements_by_flavor(&"presenter/licensed".parse().unwrap());
        assert_eq!(copies.len(), 1);
        assert!(copies[0].contains_tag("licensed"));
    }

    #[tokio::test]
    async fn test_requires_term_and_value() {
        let (handler, mp) = setup().await;
        let wf = workflow(
            mp,
            WorkflowOperationInstance::new(OPERATION_ID).with_configuration("source-flavors", "presenter/source"),
        );
        assert!(handler.start(&wf, &JobContext::default()).await.is_err());
    }
}
