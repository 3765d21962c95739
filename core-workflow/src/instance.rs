//! # Workflow Model
//!
//! A [`WorkflowInstance`] runs an ordered list of operations against one
//! media package. Each step is executed by a handler that returns a
//! [`WorkflowOperationResult`]; [`WorkflowInstance::apply_result`] folds that
//! result back into the instance.
//!
//! ## Operation lifecycle
//!
//! ```text
//! Instantiated → Running → Succeeded | Skipped
//!                   ↓   ↘
//!                Paused  Failed → (retry) Retry → Running
//!                          ↓
//!                (hold) error-resolution inserted and paused
//! ```

use core_mediapackage::MediaPackage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{Result, WorkflowOperationError};

/// Operation inserted after a failed operation whose retry strategy is `hold`
pub const ERROR_RESOLUTION_OPERATION: &str = "error-resolution";

/// Property carrying the retry decision when an error resolution resumes
pub const RETRY_STRATEGY_PROPERTY: &str = "retryStrategy";

// ============================================================================
// Outcome types
// ============================================================================

/// What the engine does after an operation returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Continue,
    Skip,
    Pause,
}

/// How a failing operation is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Fail the workflow
    #[default]
    None,
    /// Run the operation once more
    Retry,
    /// Pause and let a user decide
    Hold,
}

impl RetryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryStrategy::None => "none",
            RetryStrategy::Retry => "retry",
            RetryStrategy::Hold => "hold",
        }
    }
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryStrategy {
    type Err = WorkflowOperationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RetryStrategy::None),
            "retry" => Ok(RetryStrategy::Retry),
            "hold" => Ok(RetryStrategy::Hold),
            other => Err(WorkflowOperationError::InvalidConfiguration(format!(
                "Unknown retry strategy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Instantiated,
    Running,
    Paused,
    Succeeded,
    Skipped,
    Failed,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Instantiated,
    Running,
    Paused,
    Succeeded,
    Failed,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Succeeded | WorkflowState::Failed)
    }
}

/// Result returned by a handler for one step
#[derive(Debug, Clone)]
pub struct WorkflowOperationResult {
    /// Updated media package, `None` keeps the current one
    pub media_package: Option<MediaPackage>,
    /// Merged into the workflow configuration
    pub properties: BTreeMap<String, String>,
    pub action: Action,
    /// Milliseconds the step's jobs spent waiting
    pub time_in_queue: u64,
}

impl WorkflowOperationResult {
    pub fn new(action: Action) -> Self {
        Self {
            media_package: None,
            properties: BTreeMap::new(),
            action,
            time_in_queue: 0,
        }
    }

    /// Result carrying `media_package`.
    pub fn of(media_package: MediaPackage, action: Action) -> Self {
        Self::new(action).with_media_package(media_package)
    }

    pub fn with_media_package(mut self, media_package: MediaPackage) -> Self {
        self.media_package = Some(media_package);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_time_in_queue(mut self, time_in_queue: u64) -> Self {
        self.time_in_queue = time_in_queue;
        self
    }
}

/// Context of the job executing an operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: Option<u64>,
    pub workflow_id: Option<u64>,
    pub properties: BTreeMap<String, String>,
}

impl JobContext {
    pub fn for_workflow(workflow_id: u64) -> Self {
        Self {
            workflow_id: Some(workflow_id),
            ..Default::default()
        }
    }

    pub fn with_job_id(mut self, job_id: u64) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

// ============================================================================
// Operation instance
// ============================================================================

/// One configured step of a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOperationInstance {
    template: String,
    description: Option<String>,
    configuration: BTreeMap<String, String>,
    state: OperationState,
    retry_strategy: RetryStrategy,
    time_in_queue: u64,
}

impl WorkflowOperationInstance {
    /// Creates an operation that is executed by the handler registered for
    /// `template`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            description: None,
            configuration: BTreeMap::new(),
            state: OperationState::Instantiated,
            retry_strategy: RetryStrategy::None,
            time_in_queue: 0,
        }
    }

    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_retry_strategy(mut self, retry_strategy: RetryStrategy) -> Self {
        self.retry_strategy = retry_strategy;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Raw configuration value; see the helpers in
    /// [`operation_config`](crate::operation_config) for trimmed lookups.
    pub fn configuration(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }

    pub fn set_configuration(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.configuration.insert(key.into(), value.into());
    }

    pub fn remove_configuration(&mut self, key: &str) -> Option<String> {
        self.configuration.remove(key)
    }

    pub fn configuration_keys(&self) -> impl Iterator<Item = &str> {
        self.configuration.keys().map(String::as_str)
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn set_state(&mut self, state: OperationState) {
        self.state = state;
    }

    pub fn retry_strategy(&self) -> RetryStrategy {
        self.retry_strategy
    }

    pub fn set_retry_strategy(&mut self, retry_strategy: RetryStrategy) {
        self.retry_strategy = retry_strategy;
    }

    pub fn time_in_queue(&self) -> u64 {
        self.time_in_queue
    }
}

// ============================================================================
// Workflow instance
// ============================================================================

/// What happened to a workflow after its current operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The workflow failed
    Failed,
    /// The operation will run again
    Retry,
    /// An error resolution operation waits for a decision
    Hold,
}

#[derive(Debug, Clone)]
pub struct WorkflowInstance {
    id: u64,
    title: Option<String>,
    state: WorkflowState,
    media_package: MediaPackage,
    configuration: BTreeMap<String, String>,
    operations: Vec<WorkflowOperationInstance>,
    current: usize,
}

impl WorkflowInstance {
    pub fn new(
        id: u64,
        media_package: MediaPackage,
        operations: Vec<WorkflowOperationInstance>,
    ) -> Self {
        Self {
            id,
            title: None,
            state: WorkflowState::Instantiated,
            media_package,
            configuration: BTreeMap::new(),
            operations,
            current: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn media_package(&self) -> &MediaPackage {
        &self.media_package
    }

    pub fn set_media_package(&mut self, media_package: MediaPackage) {
        self.media_package = media_package;
    }

    /// Workflow-level configuration, shared by all operations
    pub fn configuration(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }

    pub fn set_configuration(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.configuration.insert(key.into(), value.into());
    }

    pub fn remove_configuration(&mut self, key: &str) -> Option<String> {
        self.configuration.remove(key)
    }

    pub fn configuration_keys(&self) -> impl Iterator<Item = &str> {
        self.configuration.keys().map(String::as_str)
    }

    pub fn operations(&self) -> &[WorkflowOperationInstance] {
        &self.operations
    }

    pub fn current_index(&self) -> Option<usize> {
        (self.current < self.operations.len() && !self.state.is_terminal()).then_some(self.current)
    }

    pub fn current_operation(&self) -> Option<&WorkflowOperationInstance> {
        self.current_index().map(|i| &self.operations[i])
    }

    pub fn current_operation_mut(&mut self) -> Option<&mut WorkflowOperationInstance> {
        self.current_index().map(move |i| &mut self.operations[i])
    }

    /// Marks the current operation as running.
    pub fn start_current(&mut self) -> Result<&WorkflowOperationInstance> {
        let index = self.require_current()?;
        self.state = WorkflowState::Running;
        self.operations[index].state = OperationState::Running;
        Ok(&self.operations[index])
    }

    /// Folds the result of the current operation into this workflow.
    ///
    /// The media package is replaced when the result carries one and the
    /// result properties are merged into the workflow configuration. `Pause`
    /// keeps the operation current; `Continue` and `Skip` advance to the next
    /// one and finish the workflow after the last.
    pub fn apply_result(&mut self, result: WorkflowOperationResult) -> Result<()> {
        let index = self.require_current()?;
        let resolves_failure = self.operations[index].template == ERROR_RESOLUTION_OPERATION;
        // nothing is touched until the decision is known to be usable
        let decision = match result.properties.get(RETRY_STRATEGY_PROPERTY) {
            Some(value) if resolves_failure && result.action == Action::Continue => {
                Some(resolution_strategy(value)?)
            }
            _ => None,
        };

        if let Some(media_package) = result.media_package {
            self.media_package = media_package;
        }
        self.configuration.extend(result.properties);

        let operation = &mut self.operations[index];
        operation.time_in_queue += result.time_in_queue;

        match result.action {
            Action::Pause => {
                operation.state = OperationState::Paused;
                self.state = WorkflowState::Paused;
                info!(workflow = self.id, operation = %operation.template, "Workflow paused");
                return Ok(());
            }
            Action::Continue => operation.state = OperationState::Succeeded,
            Action::Skip => operation.state = OperationState::Skipped,
        }
        debug!(
            workflow = self.id,
            operation = %operation.template,
            state = ?operation.state,
            "Operation completed"
        );

        match decision {
            Some(strategy) => self.resolve_failure(index, strategy),
            None => self.advance(index + 1),
        }
        Ok(())
    }

    /// Applies the retry strategy of the current operation after it failed.
    pub fn fail_current(&mut self, reason: &str) -> Result<FailureOutcome> {
        let index = self.require_current()?;
        let operation = &mut self.operations[index];
        warn!(
            workflow = self.id,
            operation = %operation.template,
            retry_strategy = %operation.retry_strategy,
            reason,
            "Operation failed"
        );

        match operation.retry_strategy {
            RetryStrategy::None => {
                operation.state = OperationState::Failed;
                self.state = WorkflowState::Failed;
                Ok(FailureOutcome::Failed)
            }
            RetryStrategy::Retry => {
                // one more attempt, then the failure is final
                operation.state = OperationState::Retry;
                operation.retry_strategy = RetryStrategy::None;
                Ok(FailureOutcome::Retry)
            }
            RetryStrategy::Hold => {
                operation.state = OperationState::Failed;
                let resolution = WorkflowOperationInstance::new(ERROR_RESOLUTION_OPERATION)
                    .with_description(format!("Resolve failure of {}", operation.template));
                self.operations.insert(index + 1, resolution);
                self.current = index + 1;
                self.state = WorkflowState::Running;
                Ok(FailureOutcome::Hold)
            }
        }
    }

    fn resolve_failure(&mut self, resolution_index: usize, strategy: RetryStrategy) {
        info!(workflow = self.id, retry_strategy = %strategy, "Resolving failed operation");
        match (strategy, resolution_index.checked_sub(1)) {
            (RetryStrategy::Retry, Some(failed)) => {
                // the failed operation runs again in place of the resolution
                self.operations.remove(resolution_index);
                self.operations[failed].state = OperationState::Retry;
                self.current = failed;
                self.state = WorkflowState::Running;
            }
            _ => self.state = WorkflowState::Failed,
        }
    }

    fn advance(&mut self, next: usize) {
        self.current = next;
        if next >= self.operations.len() {
            self.state = WorkflowState::Succeeded;
            info!(workflow = self.id, "Workflow succeeded");
        } else {
            self.state = WorkflowState::Running;
        }
    }

    fn require_current(&self) -> Result<usize> {
        self.current_index().ok_or_else(|| {
            WorkflowOperationError::IllegalState(format!(
                "workflow {} has no current operation",
                self.id
            ))
        })
    }
}

/// Parses the decision of an error resolution; holding again is not one.
fn resolution_strategy(value: &str) -> Result<RetryStrategy> {
    match value.parse()? {
        RetryStrategy::Hold => Err(WorkflowOperationError::InvalidConfiguration(
            "an error resolution cannot be resolved by holding again".to_string(),
        )),
        strategy => Ok(strategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow() -> WorkflowInstance {
        WorkflowInstance::new(
            1,
            MediaPackage::with_id("mp-1"),
            vec![
                WorkflowOperationInstance::new("tag"),
                WorkflowOperationInstance::new("publish-configure")
                    .with_retry_strategy(RetryStrategy::Hold),
            ],
        )
    }

    #[test]
    fn test_continue_and_skip_advance() {
        let mut wf = workflow();
        wf.start_current().unwrap();
        wf.apply_result(
            WorkflowOperationResult::of(MediaPackage::with_id("mp-2"), Action::Continue)
                .with_property("key", "value"),
        )
        .unwrap();

        assert_eq!(wf.media_package().identifier(), "mp-2");
        assert_eq!(wf.configuration("key"), Some("value"));
        assert_eq!(wf.operations()[0].state(), OperationState::Succeeded);
        assert_eq!(wf.current_index(), Some(1));

        wf.apply_result(WorkflowOperationResult::new(Action::Skip)).unwrap();
        assert_eq!(wf.operations()[1].state(), OperationState::Skipped);
        assert_eq!(wf.state(), WorkflowState::Succeeded);
        assert!(wf.current_operation().is_none());
        assert!(wf.apply_result(WorkflowOperationResult::new(Action::Continue)).is_err());
    }

    #[test]
    fn test_pause_keeps_operation_current() {
        let mut wf = workflow();
        wf.apply_result(WorkflowOperationResult::new(Action::Pause).with_time_in_queue(40))
            .unwrap();
        assert_eq!(wf.state(), WorkflowState::Paused);
        assert_eq!(wf.current_index(), Some(0));
        assert_eq!(wf.operations()[0].state(), OperationState::Paused);
        assert_eq!(wf.operations()[0].time_in_queue(), 40);
    }

    #[test]
    fn test_failure_without_retry_fails_workflow() {
        let mut wf = workflow();
        assert_eq!(wf.fail_current("boom").unwrap(), FailureOutcome::Failed);
        assert_eq!(wf.state(), WorkflowState::Failed);
        assert!(wf.current_operation().is_none());
    }

    #[test]
    fn test_retry_runs_operation_once_more() {
        let mut wf = WorkflowInstance::new(
            1,
            MediaPackage::with_id("mp-1"),
            vec![WorkflowOperationInstance::new("tag").with_retry_strategy(RetryStrategy::Retry)],
        );
        assert_eq!(wf.fail_current("boom").unwrap(), FailureOutcome::Retry);
        assert_eq!(wf.current_operation().unwrap().state(), OperationState::Retry);
        assert_eq!(wf.fail_current("boom").unwrap(), FailureOutcome::Failed);
    }

    #[test]
    fn test_hold_inserts_error_resolution() {
        let mut wf = workflow();
        wf.apply_result(WorkflowOperationResult::new(Action::Continue)).unwrap();
        assert_eq!(wf.fail_current("boom").unwrap(), FailureOutcome::Hold);
        assert_eq!(
            wf.current_operation().unwrap().template(),
            ERROR_RESOLUTION_OPERATION
        );

        wf.apply_result(WorkflowOperationResult::new(Action::Pause)).unwrap();
        wf.apply_result(
            WorkflowOperationResult::new(Action::Continue)
                .with_property(RETRY_STRATEGY_PROPERTY, "retry"),
        )
        .unwrap();
        assert_eq!(wf.current_operation().unwrap().template(), "publish-configure");
        assert_eq!(wf.current_operation().unwrap().state(), OperationState::Retry);
        assert_eq!(wf.operations().len(), 2);

        wf.start_current().unwrap();
        wf.apply_result(WorkflowOperationResult::new(Action::Continue)).unwrap();
        assert_eq!(wf.state(), WorkflowState::Succeeded);
    }

    #[test]
    fn test_hold_resolved_with_none_fails() {
        let mut wf = workflow();
        wf.apply_result(WorkflowOperationResult::new(Action::Continue)).unwrap();
        wf.fail_current("boom").unwrap();
        wf.apply_result(
            WorkflowOperationResult::new(Action::Continue)
                .with_property(RETRY_STRATEGY_PROPERTY, "none"),
        )
        .unwrap();
        assert_eq!(wf.state(), WorkflowState::Failed);
    }

    #[test]
    fn test_rejected_resolution_leaves_workflow_untouched() {
        let mut wf = workflow();
        wf.apply_result(WorkflowOperationResult::new(Action::Continue)).unwrap();
        wf.fail_current("boom").unwrap();
        let operations = wf.operations().len();

        for decision in ["hold", "later"] {
            let result = wf.apply_result(
                WorkflowOperationResult::of(MediaPackage::with_id("replacement"), Action::Continue)
                    .with_property(RETRY_STRATEGY_PROPERTY, decision)
                    .with_property("resolvedBy", "admin"),
            );
            assert!(result.is_err());
            assert_eq!(wf.state(), WorkflowState::Running);
            assert_eq!(wf.operations().len(), operations);
            assert_eq!(
                wf.current_operation().unwrap().template(),
                ERROR_RESOLUTION_OPERATION
            );
            assert_ne!(wf.current_operation().unwrap().state(), OperationState::Succeeded);
            assert_eq!(wf.configuration(RETRY_STRATEGY_PROPERTY), None);
            assert_eq!(wf.configuration("resolvedBy"), None);
            assert_ne!(wf.media_package().identifier(), "replacement");
        }

        wf.apply_result(
            WorkflowOperationResult::new(Action::Continue)
                .with_property(RETRY_STRATEGY_PROPERTY, "retry"),
        )
        .unwrap();
        assert_eq!(wf.current_operation().unwrap().template(), "publish-configure");
    }

    #[test]
    fn test_retry_strategy_parse() {
        assert_eq!("HOLD".parse::<RetryStrategy>().unwrap(), RetryStrategy::Hold);
        assert_eq!(RetryStrategy::Retry.to_string(), "retry");
        assert!("later".parse::<RetryStrategy>().is_err());
    }
}
