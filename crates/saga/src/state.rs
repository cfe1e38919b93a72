//! Saga run state machine.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The state of a saga run in its lifecycle.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► Failed
///           └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Saga steps are being executed.
    #[default]
    Running,

    /// A step failed and its compensating action is in progress.
    Compensating,

    /// All steps completed successfully (terminal state).
    Completed,

    /// The saga stopped on a failure (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if the saga can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks one saga run and records its metrics.
///
/// Runs live for a single invocation; nothing is persisted.
#[derive(Debug)]
pub(crate) struct SagaRun {
    saga_type: &'static str,
    state: SagaState,
    started: Instant,
}

impl SagaRun {
    pub(crate) fn start(saga_type: &'static str) -> Self {
        metrics::counter!("saga_executions_total", "saga" => saga_type).increment(1);
        Self {
            saga_type,
            state: SagaState::Running,
            started: Instant::now(),
        }
    }

    pub(crate) fn step(&self, step: &'static str) {
        tracing::info!(saga = self.saga_type, step, "saga step started");
    }

    pub(crate) fn compensate(&mut self, from_step: &'static str) {
        debug_assert!(self.state.can_compensate());
        self.state = SagaState::Compensating;
        metrics::counter!("saga_compensations_total", "saga" => self.saga_type).increment(1);
        tracing::warn!(saga = self.saga_type, from_step, "compensation started");
    }

    pub(crate) fn finish<T, E: std::fmt::Display>(
        mut self,
        result: Result<T, E>,
    ) -> Result<T, E> {
        let duration = self.started.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds", "saga" => self.saga_type).record(duration);
        match &result {
            Ok(_) => {
                self.state = SagaState::Completed;
                metrics::counter!("saga_completed", "saga" => self.saga_type).increment(1);
                tracing::info!(saga = self.saga_type, duration, "saga completed");
            }
            Err(err) => {
                let compensated = self.state == SagaState::Compensating;
                self.state = SagaState::Failed;
                metrics::counter!("saga_failed", "saga" => self.saga_type).increment(1);
                tracing::warn!(saga = self.saga_type, compensated, error = %err, "saga failed");
            }
        }
        debug_assert!(self.state.is_terminal());
        result
    }
}
