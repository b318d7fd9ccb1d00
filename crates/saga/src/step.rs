//! The contract every saga step implements.

use async_trait::async_trait;

use crate::context::{SagaContext, StepOutput};
use crate::state::SagaState;

/// Result of a step's forward action.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The action succeeded; the engine merges `output` and records the step.
    Advance { next: SagaState, output: StepOutput },
    /// The action failed; `next` is where compensation begins.
    Fail { next: SagaState, reason: String },
}

impl StepOutcome {
    pub fn advance(next: SagaState, output: StepOutput) -> Self {
        StepOutcome::Advance { next, output }
    }

    pub fn fail(next: SagaState, reason: impl Into<String>) -> Self {
        StepOutcome::Fail {
            next,
            reason: reason.into(),
        }
    }

    /// The state the step asks the saga to move to.
    pub fn next(&self) -> SagaState {
        match self {
            StepOutcome::Advance { next, .. } | StepOutcome::Fail { next, .. } => *next,
        }
    }
}

/// Result of a step's compensating action.
///
/// A failed compensation still names the next state: the walk goes on.
#[derive(Debug, Clone, PartialEq)]
pub struct CompensationOutcome {
    pub next: SagaState,
    pub error: Option<String>,
}

impl CompensationOutcome {
    pub fn done(next: SagaState) -> Self {
        Self { next, error: None }
    }

    pub fn failed(next: SagaState, error: impl Into<String>) -> Self {
        Self {
            next,
            error: Some(error.into()),
        }
    }
}

/// One step of the order saga: a forward action and its inverse.
///
/// Implementations hold only their service clients and are shared by every
/// saga run. Expected downstream failures are reported through the returned
/// outcome; neither method panics for control flow.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Short step name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// State in which the engine calls [`StepHandler::execute`].
    fn forward_state(&self) -> SagaState;

    /// State in which the engine calls [`StepHandler::compensate`], if the
    /// step can be undone.
    fn compensation_state(&self) -> Option<SagaState>;

    /// Performs the forward action.
    async fn execute(&self, ctx: &SagaContext) -> StepOutcome;

    /// Undoes a forward action that previously succeeded.
    async fn compensate(&self, ctx: &SagaContext) -> CompensationOutcome;
}
