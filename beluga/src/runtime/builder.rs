use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use crate::config::BatchConfig;
use crate::events::BatchEventBus;
use crate::invoker::WorkerInvoker;

use super::cancel::CancelToken;
use super::driver::BatchOrchestrator;

/// Builder for constructing a [`BatchOrchestrator`] with explicit
/// dependencies.
///
/// The worker invoker is required; the event bus and cancellation token
/// fall back to fresh instances sized from the configuration.
///
/// # Example
///
/// ```ignore
/// use beluga::runtime::BatchOrchestratorBuilder;
/// use beluga::{BatchConfig, ProcessInvokerConfig, ProcessWorkerInvoker};
///
/// let invoker = ProcessWorkerInvoker::new(ProcessInvokerConfig::new(
///     "python3",
///     "transcribe_video.py",
/// ));
/// let orchestrator = BatchOrchestratorBuilder::new(BatchConfig::new(2))
///     .with_invoker(std::sync::Arc::new(invoker))
///     .build()?;
/// ```
pub struct BatchOrchestratorBuilder<I>
where
    I: WorkerInvoker + 'static,
{
    config: BatchConfig,
    invoker: Option<Arc<I>>,
    events: Option<Arc<BatchEventBus>>,
    cancel: Option<CancelToken>,
}

impl<I> fmt::Debug for BatchOrchestratorBuilder<I>
where
    I: WorkerInvoker + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("BatchOrchestratorBuilder");
        debug.field("config", &self.config);
        debug.field("invoker_set", &self.invoker.is_some());
        debug.field("events_set", &self.events.is_some());
        debug.field("cancel_set", &self.cancel.is_some());
        if self.invoker.is_some() {
            debug.field("invoker_type", &type_name::<I>());
        }
        debug.finish()
    }
}

impl<I> BatchOrchestratorBuilder<I>
where
    I: WorkerInvoker + 'static,
{
    /// Create a new builder with the given batch configuration.
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            invoker: None,
            events: None,
            cancel: None,
        }
    }

    /// Set the worker invoker.
    pub fn with_invoker(mut self, invoker: Arc<I>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Set the event bus. Defaults to a fresh bus with the configured
    /// event capacity.
    pub fn with_events(mut self, events: Arc<BatchEventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the cancellation token. Defaults to a fresh token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoker dependency is missing. Note that
    /// the concurrency limit is validated by [`BatchOrchestrator::run`],
    /// not here, so an orchestrator can be constructed before the limit is
    /// known to be sane.
    pub fn build(self) -> anyhow::Result<BatchOrchestrator<I>> {
        let invoker = self
            .invoker
            .ok_or_else(|| anyhow::anyhow!("invoker dependency missing"))?;
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(BatchEventBus::new(self.config.event_capacity)));
        let cancel = self.cancel.unwrap_or_default();

        Ok(BatchOrchestrator::new(self.config, invoker, events, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::OutputRelay;
    use crate::job::{JobDescriptor, JobOutcome};
    use async_trait::async_trait;

    struct NoopInvoker;

    #[async_trait]
    impl WorkerInvoker for NoopInvoker {
        async fn invoke(
            &self,
            _descriptor: &JobDescriptor,
            _relay: &OutputRelay,
            _cancel: &CancelToken,
        ) -> JobOutcome {
            JobOutcome::Failed {
                reason: "noop".to_string(),
            }
        }
    }

    #[test]
    fn test_build_requires_invoker() {
        let err = BatchOrchestratorBuilder::<NoopInvoker>::new(BatchConfig::new(1))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invoker"));
    }

    #[test]
    fn test_build_defaults_events_and_cancel() {
        let orchestrator = BatchOrchestratorBuilder::new(BatchConfig::new(2))
            .with_invoker(Arc::new(NoopInvoker))
            .build()
            .expect("builder should succeed with invoker set");

        assert_eq!(orchestrator.events().capacity(), 256);
        assert!(!orchestrator.cancel_token().is_cancelled());
    }
}
