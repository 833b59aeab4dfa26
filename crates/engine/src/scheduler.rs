//! Concurrent evaluation of instances.
//!
//! Surviving instances fan out into one task each on a [`JoinSet`]; the
//! CPU-bound evaluation runs on the blocking pool. [`Scheduler::process`]
//! returns once every task has reached a terminal state.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::evaluator::Evaluator;
use crate::filter::ExcludeFilter;
use crate::handler::InstanceHandler;
use crate::instance::Instance;
use crate::state::InstanceState;

/// How many evaluations may run at once.
///
/// `Unbounded` spawns one task per instance up front, so memory grows with
/// the number of instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    /// One task per instance, all scheduled immediately.
    #[default]
    Unbounded,
    /// At most `n` evaluations in flight.
    Bounded(NonZeroUsize),
}

impl Concurrency {
    /// `None` and `Some(0)` mean unbounded.
    pub fn from_limit(limit: Option<usize>) -> Self {
        limit
            .and_then(NonZeroUsize::new)
            .map_or(Self::Unbounded, Self::Bounded)
    }
}

/// Runs the evaluate-and-handle pipeline.
pub struct Scheduler {
    evaluator: Arc<dyn Evaluator>,
    sink: Arc<dyn DiagnosticSink>,
    concurrency: Concurrency,
}

impl Scheduler {
    /// Create a scheduler reporting failures to `sink`.
    pub fn new(evaluator: Arc<dyn Evaluator>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            evaluator,
            sink,
            concurrency: Concurrency::default(),
        }
    }

    /// Limit simultaneous evaluations.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Configured concurrency.
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Evaluate every instance the filter keeps and hand each success to
    /// `handler`.
    ///
    /// Failures are reported to the sink, one diagnostic each; they never
    /// affect other instances. A panicking task is logged and recorded as
    /// [`InstanceState::Aborted`].
    pub async fn process<H>(
        &self,
        instances: Vec<Instance>,
        filter: &ExcludeFilter,
        handler: H,
    ) -> ProcessReport
    where
        H: InstanceHandler + 'static,
    {
        let started = Instant::now();
        let handler: Arc<dyn InstanceHandler> = Arc::new(handler);
        let semaphore = match self.concurrency {
            Concurrency::Unbounded => None,
            Concurrency::Bounded(limit) => Some(Arc::new(Semaphore::new(limit.get()))),
        };

        let mut entries = Vec::with_capacity(instances.len());
        let mut join_set = JoinSet::new();
        for (index, instance) in instances.into_iter().enumerate() {
            let mut entry = ReportEntry::new(instance.display_path());
            if filter.is_excluded(&entry.display_path) {
                tracing::debug!(display_path = %entry.display_path, "instance excluded");
                entry.advance(InstanceState::Excluded);
                entries.push(entry);
                continue;
            }
            entry.advance(InstanceState::Evaluating);
            entries.push(entry);

            let task = EvalTask {
                index,
                instance,
                evaluator: Arc::clone(&self.evaluator),
                sink: Arc::clone(&self.sink),
                handler: Arc::clone(&handler),
                semaphore: semaphore.clone(),
            };
            join_set.spawn(task.run());
        }

        while let Some(join_result) = join_set.join_next().await {
            match join_result {
                Ok((index, state)) => {
                    if let Some(entry) = entries.get_mut(index) {
                        entry.advance(state);
                    }
                }
                Err(join_err) => {
                    tracing::error!(?join_err, "evaluation task panicked");
                }
            }
        }

        // Tasks lost to a panic outside the blocking section never reported back.
        for entry in entries.iter_mut().filter(|e| e.state == InstanceState::Evaluating) {
            entry.advance(InstanceState::Aborted);
        }

        let report = ProcessReport { entries };
        tracing::info!(
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            excluded = report.excluded(),
            aborted = report.aborted(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed instances"
        );
        report
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Everything one evaluation task needs.
struct EvalTask {
    index: usize,
    instance: Instance,
    evaluator: Arc<dyn Evaluator>,
    sink: Arc<dyn DiagnosticSink>,
    handler: Arc<dyn InstanceHandler>,
    semaphore: Option<Arc<Semaphore>>,
}

impl EvalTask {
    /// Wait for a permit if bounded, then evaluate on the blocking pool.
    async fn run(self) -> (usize, InstanceState) {
        let index = self.index;
        let _permit = match &self.semaphore {
            Some(semaphore) => match Arc::clone(semaphore).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(err) => {
                    tracing::error!(error = %err, "evaluation permit unavailable");
                    return (index, InstanceState::Aborted);
                }
            },
            None => None,
        };

        let display_path = self.instance.display_path().to_string();
        match tokio::task::spawn_blocking(move || self.evaluate_and_handle()).await {
            Ok(state) => (index, state),
            Err(join_err) => {
                tracing::error!(?join_err, %display_path, "evaluation task panicked");
                (index, InstanceState::Aborted)
            }
        }
    }

    fn evaluate_and_handle(self) -> InstanceState {
        let started = Instant::now();
        let display_path = self.instance.display_path();
        match self.evaluator.evaluate(&self.instance) {
            Ok(value) => {
                tracing::debug!(
                    %display_path,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "instance evaluated"
                );
                self.handler.handle(&self.instance, &value);
                InstanceState::Succeeded
            }
            Err(error) => {
                tracing::debug!(%display_path, code = error.code(), "instance failed");
                self.sink.report(Diagnostic::EvaluationFailed {
                    display_path: display_path.to_string(),
                    error,
                });
                InstanceState::Failed
            }
        }
    }
}

/// Final state of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// Instance display path.
    pub display_path: String,
    /// Terminal state.
    pub state: InstanceState,
}

impl ReportEntry {
    fn new(display_path: &str) -> Self {
        Self {
            display_path: display_path.to_string(),
            state: InstanceState::Loaded,
        }
    }

    fn advance(&mut self, to: InstanceState) {
        if let Err(err) = self.state.transition(&self.display_path, to) {
            tracing::error!(error = %err, "state change rejected");
        }
    }
}

/// Outcome of one [`Scheduler::process`] call, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    entries: Vec<ReportEntry>,
}

impl ProcessReport {
    /// Per-instance outcomes.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// State of the first instance with `display_path`.
    pub fn state_of(&self, display_path: &str) -> Option<InstanceState> {
        self.entries
            .iter()
            .find(|e| e.display_path == display_path)
            .map(|e| e.state)
    }

    /// Number of instances that ended in `state`.
    pub fn count(&self, state: InstanceState) -> usize {
        self.entries.iter().filter(|e| e.state == state).count()
    }

    /// Instances handed to the handler.
    pub fn succeeded(&self) -> usize {
        self.count(InstanceState::Succeeded)
    }

    /// Instances that failed to evaluate.
    pub fn failed(&self) -> usize {
        self.count(InstanceState::Failed)
    }

    /// Instances skipped by the filter.
    pub fn excluded(&self) -> usize {
        self.count(InstanceState::Excluded)
    }

    /// Instances whose task panicked.
    pub fn aborted(&self) -> usize {
        self.count(InstanceState::Aborted)
    }

    /// Number of instances processed.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Whether no instance failed or aborted.
    pub fn is_success(&self) -> bool {
        !self.entries.iter().any(|e| e.state.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::CollectingSink;
    use parking_lot::Mutex;
    use serde_json::{Value, json};
    use stx_eval::EvalError;

    fn echo(instance: &Instance) -> Result<Value, EvalError> {
        match instance.display_path() {
            "./bad" => Err(EvalError::conflict("x: conflicting values 1 and 2", None)),
            path => Ok(json!({ "path": path })),
        }
    }

    #[test]
    fn concurrency_from_limit() {
        assert_eq!(Concurrency::from_limit(None), Concurrency::Unbounded);
        assert_eq!(Concurrency::from_limit(Some(0)), Concurrency::Unbounded);
        assert_eq!(
            Concurrency::from_limit(Some(4)),
            Concurrency::Bounded(NonZeroUsize::new(4).unwrap())
        );
    }

    #[tokio::test]
    async fn report_follows_input_order() {
        let sink = Arc::new(CollectingSink::new());
        let scheduler = Scheduler::new(Arc::new(echo), sink.clone());
        let filter = ExcludeFilter::compile(Some("skip"), &*sink);
        let instances = ["./a", "./skip", "./bad", "./b"]
            .into_iter()
            .map(|path| Instance::new(path, "cfn"))
            .collect();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let collector = Arc::clone(&seen);
        let report = scheduler
            .process(instances, &filter, move |_: &Instance, value: &Value| {
                collector.lock().push(value["path"].clone());
            })
            .await;

        let states: Vec<_> = report.entries().iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                InstanceState::Succeeded,
                InstanceState::Excluded,
                InstanceState::Failed,
                InstanceState::Succeeded,
            ]
        );
        assert!(!report.is_success());
        assert_eq!(sink.len(), 1);
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn empty_input_is_success() {
        let scheduler = Scheduler::new(Arc::new(echo), Arc::new(CollectingSink::new()));
        let report = scheduler
            .process(Vec::new(), &ExcludeFilter::none(), |_: &Instance, _: &Value| {})
            .await;
        assert_eq!(report.total(), 0);
        assert!(report.is_success());
    }
}
