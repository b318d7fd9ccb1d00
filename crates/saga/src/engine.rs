//! Saga engine: drives the state machine and owns the compensation protocol.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;

use crate::context::SagaContext;
use crate::error::SagaError;
use crate::registry::StepRegistry;
use crate::state::{SagaState, StateKind};
use crate::step::{StepHandler, StepOutcome};

/// A forward step that succeeded, kept until the saga ends.
struct CompletedStep {
    state: SagaState,
    handler: Arc<dyn StepHandler>,
}

/// How a saga run ended.
#[derive(Debug, Clone)]
pub struct SagaOutcome {
    /// Terminal state of the run.
    pub state: SagaState,
    /// Every state the run went through, starting with the initial one.
    pub trajectory: Vec<SagaState>,
    /// Context as it stood when the run ended.
    pub context: SagaContext,
    /// Number of compensating actions invoked.
    pub compensations: usize,
    /// Number of compensating actions that reported a failure.
    pub compensation_failures: usize,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl SagaOutcome {
    /// Returns true if the saga completed.
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }
}

#[derive(Debug)]
struct CompensationWalk {
    state: SagaState,
    compensated: usize,
    failed: usize,
    defect: Option<SagaError>,
}

/// Runs order sagas against a validated [`StepRegistry`].
///
/// The engine holds no per-run state; one instance serves every request.
/// Each run executes its steps one after another on the calling task.
#[derive(Debug, Clone)]
pub struct SagaEngine {
    registry: Arc<StepRegistry>,
}

impl SagaEngine {
    /// Creates an engine over the given registry.
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Runs one saga to a terminal state.
    ///
    /// Forward steps run until one fails or the saga completes. After the
    /// first failure the engine only compensates: every step that succeeded
    /// is undone, most recent first, even if an earlier compensation failed.
    /// Defects (an unregistered state, an illegal transition or a panicking
    /// handler) end the run in [`SagaState::Failed`] once completed steps are
    /// compensated.
    #[tracing::instrument(
        skip(self, ctx),
        fields(saga_id = %ctx.saga_id(), order_id = %ctx.order_id())
    )]
    pub async fn run(&self, mut ctx: SagaContext) -> SagaOutcome {
        metrics::counter!("saga_executions_total").increment(1);
        let started_at = Utc::now();
        let clock = Instant::now();

        let mut state = SagaState::INITIAL;
        let mut trajectory = vec![state];
        let mut history: Vec<CompletedStep> = Vec::new();
        let mut fault: Option<SagaError> = None;

        while state.kind() == StateKind::Forward {
            let handler = match self.registry.resolve(state) {
                Ok(handler) => Arc::clone(handler),
                Err(e) => {
                    fault = Some(e);
                    break;
                }
            };
            let step = handler.name();
            tracing::info!(step, %state, "saga step started");

            let outcome = match AssertUnwindSafe(handler.execute(&ctx)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => {
                    fault = Some(SagaError::HandlerPanicked { step });
                    break;
                }
            };
            let next = outcome.next();
            let checked = check_forward(state, &outcome);

            match outcome {
                StepOutcome::Advance { output, .. } => {
                    ctx.merge(output);
                    history.push(CompletedStep { state, handler });
                    tracing::info!(step, %next, "saga step completed");
                }
                StepOutcome::Fail { reason, .. } => {
                    tracing::warn!(step, %next, %reason, "saga step failed");
                    ctx.record_error(reason);
                }
            }

            if let Err(e) = checked {
                fault = Some(e);
                break;
            }
            state = next;
            trajectory.push(state);
        }

        if let Some(e) = &fault {
            tracing::error!(error = %e, %state, "saga aborted");
            ctx.record_error(e.to_string());
        }

        let mut compensations = 0;
        let mut compensation_failures = 0;
        if fault.is_some() || state != SagaState::Completed {
            let walk = self
                .compensate(&ctx, state, history, &mut trajectory)
                .await;
            compensations = walk.compensated;
            compensation_failures = walk.failed;
            state = walk.state;

            if let Some(defect) = walk.defect {
                tracing::error!(error = %defect, "compensation hit a defect");
                if fault.is_none() {
                    ctx.record_error(defect.to_string());
                }
                fault = Some(defect);
            }
        }

        if fault.is_some() {
            state = SagaState::Failed;
            trajectory.push(state);
        }

        let duration = clock.elapsed();
        metrics::histogram!("saga_duration_seconds").record(duration.as_secs_f64());
        if state.is_success() {
            metrics::counter!("saga_completed").increment(1);
            tracing::info!(
                payment_id = ctx.payment_id().unwrap_or("-"),
                duration = duration.as_secs_f64(),
                "saga completed successfully"
            );
        } else {
            metrics::counter!("saga_failed").increment(1);
            tracing::warn!(
                %state,
                reason = ctx.last_error().unwrap_or("unknown"),
                compensations,
                compensation_failures,
                "saga failed"
            );
        }

        SagaOutcome {
            state,
            trajectory,
            context: ctx,
            compensations,
            compensation_failures,
            started_at,
            duration,
        }
    }

    /// Runs compensating actions in reverse order of completed steps.
    async fn compensate(
        &self,
        ctx: &SagaContext,
        state: SagaState,
        mut history: Vec<CompletedStep>,
        trajectory: &mut Vec<SagaState>,
    ) -> CompensationWalk {
        let mut walk = CompensationWalk {
            state,
            compensated: 0,
            failed: 0,
            defect: None,
        };

        if !history.is_empty() {
            tracing::warn!(steps = history.len(), from = %state, "compensation started");
        }

        while let Some(done) = history.pop() {
            let step = done.handler.name();
            let from = walk.state;

            if from.kind() == StateKind::Compensation {
                let owner = self.registry.resolve(from).map(|h| h.name());
                if owner.ok() != Some(step) {
                    walk.defect.get_or_insert(SagaError::CompensationMismatch {
                        state: from,
                        step,
                    });
                }
            }

            let result = AssertUnwindSafe(done.handler.compensate(ctx))
                .catch_unwind()
                .await;
            metrics::counter!("saga_compensations_total").increment(1);
            walk.compensated += 1;

            // The walk stays in its current state when a compensation panics.
            let Ok(outcome) = result else {
                metrics::counter!("saga_compensation_failures_total").increment(1);
                walk.failed += 1;
                tracing::error!(
                    step,
                    completed_in = %done.state,
                    "compensation panicked, continuing with remaining steps"
                );
                walk.defect
                    .get_or_insert(SagaError::HandlerPanicked { step });
                continue;
            };

            match &outcome.error {
                None => {
                    tracing::info!(step, completed_in = %done.state, "step compensated");
                }
                Some(error) => {
                    metrics::counter!("saga_compensation_failures_total").increment(1);
                    walk.failed += 1;
                    tracing::error!(
                        step,
                        completed_in = %done.state,
                        %error,
                        "compensation failed, continuing with remaining steps"
                    );
                }
            }

            if from.kind() == StateKind::Compensation && !from.can_transition_to(outcome.next) {
                walk.defect.get_or_insert(SagaError::IllegalTransition {
                    from,
                    to: outcome.next,
                });
            }

            walk.state = outcome.next;
            trajectory.push(walk.state);
        }

        if !walk.state.is_terminal() {
            walk.defect
                .get_or_insert(SagaError::StalledCompensation(walk.state));
        }

        walk
    }
}

/// Checks a forward outcome against the transition table.
///
/// Success may only lead to another forward step or completion; failure
/// may only lead to compensation or cancellation.
fn check_forward(from: SagaState, outcome: &StepOutcome) -> Result<(), SagaError> {
    let next = outcome.next();
    let direction_ok = match outcome {
        StepOutcome::Advance { .. } => {
            next.kind() == StateKind::Forward || next == SagaState::Completed
        }
        StepOutcome::Fail { .. } => {
            next.kind() == StateKind::Compensation || next == SagaState::Cancelled
        }
    };

    if direction_ok && from.can_transition_to(next) {
        Ok(())
    } else {
        Err(SagaError::IllegalTransition { from, to: next })
    }
}
